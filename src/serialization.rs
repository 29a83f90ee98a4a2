//! JWE compact and flattened JSON renderers.

use std::borrow::Cow;

use crate::context::JweContext;
use crate::error::*;
use crate::map::Slot;
use crate::scratch::SliceWriter;

const COMPACT_SLOTS: [Slot; 5] = [
    Slot::Jose,
    Slot::EncryptedKey,
    Slot::Iv,
    Slot::Ciphertext,
    Slot::Tag,
];

const FLATTENED_FIELDS: [(&str, Slot); 5] = [
    ("encrypted_key", Slot::EncryptedKey),
    ("aad", Slot::Aad),
    ("iv", Slot::Iv),
    ("ciphertext", Slot::Ciphertext),
    ("tag", Slot::Tag),
];

// Length of unpadded base64 for `bin_len` bytes.
fn b64_len(bin_len: usize) -> usize {
    (bin_len * 4 + 2) / 3
}

impl<'a> JweContext<'a> {
    /// Render `B64(header).B64(ekey).B64(iv).B64(ciphertext).B64(tag)`.
    ///
    /// A NUL is written after the envelope. The returned length excludes it,
    /// so `out` needs one more byte than the envelope itself. Envelopes with
    /// additional authenticated data need the flattened form.
    pub fn render_compact(&self, out: &mut [u8]) -> Result<usize, Error> {
        if self.header.recipients > 1 {
            tracing::warn!(
                recipients = self.header.recipients,
                "compact serialization supports a single recipient"
            );
            bail!(JWEError::MultiRecipientNotSupported);
        }
        ensure!(self.map.is_set(Slot::Jose), JWEError::InvalidState);
        if self.map.is_set(Slot::Aad) {
            tracing::warn!("compact serialization can't carry additional authenticated data");
            bail!(JWEError::InvalidState);
        }

        let mut w = SliceWriter::new(out);
        for (i, slot) in COMPACT_SLOTS.iter().enumerate() {
            if i > 0 {
                w.push(b".")?;
            }
            w.push_b64(self.map.get(*slot)).map_err(|err| {
                tracing::debug!(slot = ?slot, "compact segment does not fit");
                err
            })?;
        }
        w.terminate()
    }

    /// The compact serialization as a string.
    pub fn to_compact_string(&self) -> Result<String, Error> {
        let len = COMPACT_SLOTS
            .iter()
            .map(|slot| b64_len(self.map.get(*slot).len()))
            .sum::<usize>()
            + COMPACT_SLOTS.len()
            - 1;
        let mut out = vec![0u8; len + 1];
        let len = self.render_compact(&mut out)?;
        out.truncate(len);
        Ok(String::from_utf8(out).map_err(|_| JWEError::InvalidJWEFormat)?)
    }

    /// Render the flattened JSON serialization.
    ///
    /// The header JSON is rendered once and used for both `"protected"`
    /// (base64url) and `"header"` (raw). The remaining members are emitted
    /// in a fixed order, skipping empty slots. Nothing is written after the
    /// closing brace.
    pub fn render_flattened(&self, out: &mut [u8]) -> Result<usize, Error> {
        let header: Cow<'_, [u8]> = if self.map.is_set(Slot::Jose) {
            Cow::Borrowed(self.map.get(Slot::Jose))
        } else {
            Cow::Owned(self.header.render(self.key)?)
        };

        let mut w = SliceWriter::new(out);
        w.push_str("{\"protected\":\"")?;
        w.push_b64(&header).map_err(|err| {
            tracing::debug!("protected header does not fit");
            err
        })?;
        w.push_str("\",\"header\":")?;
        w.push(&header)?;
        for (name, slot) in FLATTENED_FIELDS.iter() {
            let bytes = self.map.get(*slot);
            if bytes.is_empty() {
                continue;
            }
            w.push_str(",\"")?;
            w.push_str(name)?;
            w.push_str("\":\"")?;
            w.push_b64(bytes).map_err(|err| {
                tracing::debug!(field = *name, "flattened member does not fit");
                err
            })?;
            w.push_str("\"")?;
        }
        w.push_str("}")?;

        Ok(w.position())
    }
}
