use ct_codecs::{Base64UrlSafeNoPadding, Decoder};
use serde_json::Value;

use crate::algorithms::content::ContentEncryption;
use crate::common::*;
use crate::error::*;
use crate::jose::{JoseHeader, KeyManagementAlgorithm};
use crate::jwe_header::JWEHeader;
use crate::key::JweKey;
use crate::map::{ByteRangeMap, Slot};
use crate::scratch::Scratch;

/// State of one JWE operation.
///
/// A context borrows its key and every byte range it points to; it owns no
/// buffers. It is populated by one of `encrypt`, `decrypt_and_verify`,
/// `parse_compact` or `parse_flattened`, then read by a renderer.
#[derive(Debug, Clone)]
pub struct JweContext<'a> {
    pub(crate) header: JoseHeader<'a>,
    pub(crate) key: &'a JweKey,
    pub(crate) map: ByteRangeMap<'a>,
}

impl<'a> JweContext<'a> {
    pub fn new(key: &'a JweKey) -> Self {
        JweContext {
            header: JoseHeader::default(),
            key,
            map: ByteRangeMap::new(),
        }
    }

    /// Use `json` verbatim as the protected header.
    pub fn with_header(mut self, json: &'a [u8]) -> Self {
        self.map.set(Slot::Jose, json);
        self
    }

    /// Set the algorithms. The protected header is rendered from them if no
    /// header JSON was given.
    pub fn with_algorithms(mut self, alg: KeyManagementAlgorithm, enc: ContentEncryption) -> Self {
        self.header = JoseHeader::new(alg, enc);
        self
    }

    /// Additional authenticated data, bound to the envelope but not encrypted.
    pub fn with_aad(mut self, aad: &'a [u8]) -> Self {
        self.map.set(Slot::Aad, aad);
        self
    }

    pub fn header(&self) -> &JoseHeader<'a> {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut JoseHeader<'a> {
        &mut self.header
    }

    pub fn map(&self) -> &ByteRangeMap<'a> {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut ByteRangeMap<'a> {
        &mut self.map
    }

    pub fn key(&self) -> &'a JweKey {
        self.key
    }

    /// Split a compact envelope into the byte-range map.
    ///
    /// Every segment is decoded into `scratch`; the rest of the arena is
    /// returned.
    pub fn parse_compact(
        &mut self,
        token: &str,
        scratch: Scratch<'a>,
        options: &DecryptionOptions,
    ) -> Result<Scratch<'a>, Error> {
        if let Some(max_len) = options.max_token_length {
            ensure!(token.len() <= max_len, JWEError::TokenTooLong);
        }
        let parts: Vec<&str> = token.split('.').collect();
        ensure!(parts.len() == 5, JWEError::InvalidJWEFormat);
        check_header_length(parts[0], options)?;

        let slots = [
            Slot::Jose,
            Slot::EncryptedKey,
            Slot::Iv,
            Slot::Ciphertext,
            Slot::Tag,
        ];
        let mut map = ByteRangeMap::new();
        let mut scratch = scratch;
        for (slot, part) in slots.iter().zip(parts.iter()) {
            let (decoded, rest) = scratch.store_b64_decoded(part)?;
            map.set(*slot, decoded);
            scratch = rest;
        }
        check_key_id(map.get(Slot::Jose), options)?;

        self.map = map;
        Ok(scratch)
    }

    /// Split a flattened JSON envelope into the byte-range map.
    ///
    /// The unprotected `"header"` member is ignored. A `"recipients"` array
    /// is the general serialization and is rejected.
    pub fn parse_flattened(
        &mut self,
        json: &str,
        scratch: Scratch<'a>,
        options: &DecryptionOptions,
    ) -> Result<Scratch<'a>, Error> {
        if let Some(max_len) = options.max_token_length {
            ensure!(json.len() <= max_len, JWEError::TokenTooLong);
        }
        let envelope: Value = serde_json::from_str(json).map_err(|_| JWEError::InvalidJWEFormat)?;
        let envelope = envelope.as_object().ok_or(JWEError::InvalidJWEFormat)?;
        if envelope.contains_key("recipients") {
            tracing::debug!("general JSON serialization with recipients array is not supported");
            bail!(JWEError::MultiRecipientNotSupported);
        }
        let member = |name: &str| -> Result<Option<&str>, Error> {
            match envelope.get(name) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.as_str())),
                Some(_) => bail!(JWEError::InvalidJWEFormat),
            }
        };

        let protected = member("protected")?.ok_or(JWEError::InvalidJWEFormat)?;
        check_header_length(protected, options)?;
        ensure!(
            member("ciphertext")?.is_some(),
            JWEError::InvalidJWEFormat
        );

        let fields = [
            ("protected", Slot::Jose),
            ("encrypted_key", Slot::EncryptedKey),
            ("aad", Slot::Aad),
            ("iv", Slot::Iv),
            ("ciphertext", Slot::Ciphertext),
            ("tag", Slot::Tag),
        ];
        let mut map = ByteRangeMap::new();
        let mut scratch = scratch;
        for (name, slot) in fields.iter() {
            if let Some(b64) = member(*name)? {
                let (decoded, rest) = scratch.store_b64_decoded(b64)?;
                map.set(*slot, decoded);
                scratch = rest;
            }
        }
        check_key_id(map.get(Slot::Jose), options)?;

        self.map = map;
        Ok(scratch)
    }

    /// Read the protected header of a compact envelope without decrypting,
    /// to pick a key.
    pub fn decode_metadata(token: &str) -> Result<JWEHeader, Error> {
        let header_b64 = token.split('.').next().ok_or(JWEError::InvalidJWEFormat)?;
        ensure!(
            header_b64.len() <= MAX_JWE_HEADER_LENGTH,
            JWEError::HeaderTooLarge
        );
        let json = Base64UrlSafeNoPadding::decode_to_vec(header_b64, None)
            .map_err(|_| JWEError::InvalidJWEFormat)?;
        Ok(serde_json::from_slice(&json).map_err(|_| JWEError::InvalidJWEFormat)?)
    }
}

fn check_header_length(header_b64: &str, options: &DecryptionOptions) -> Result<(), Error> {
    let max_header_len = options.max_header_length.unwrap_or(MAX_JWE_HEADER_LENGTH);
    ensure!(header_b64.len() <= max_header_len, JWEError::HeaderTooLarge);
    Ok(())
}

fn check_key_id(json: &[u8], options: &DecryptionOptions) -> Result<(), Error> {
    let required_key_id = match &options.required_key_id {
        Some(required_key_id) => required_key_id,
        None => return Ok(()),
    };
    let header: JWEHeader = serde_json::from_slice(json).map_err(|_| JWEError::InvalidJWEFormat)?;
    match &header.kid {
        Some(key_id) => ensure!(key_id == required_key_id, JWEError::KeyIdentifierMismatch),
        None => bail!(JWEError::MissingJWTKeyIdentifier),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7516 appendix A.3
    const A3_TOKEN: &str = "eyJhbGciOiJBMTI4S1ciLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0.6KB707dM9YTIgHtLvtgWQ8mKwboJW3of9locizkDTHzBC2IlrT1oOQ.AxY8DCtDaGlsbGljb3RoZQ.KDlTtXchhZTGufMYmOYGS4HffxPSUrfmqCHXaI9wOGY.U0m_YmjN04DJvceFICbCVQ";

    #[test]
    fn compact_split() {
        let key = JweKey::symmetric(&[0u8; 16]);
        let mut buf = [0u8; 256];
        let mut ctx = JweContext::new(&key);
        let scratch = ctx
            .parse_compact(A3_TOKEN, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap();
        let map = ctx.map();
        assert_eq!(
            map.get(Slot::Jose),
            br#"{"alg":"A128KW","enc":"A128CBC-HS256"}"#
        );
        assert_eq!(map.get(Slot::EncryptedKey).len(), 40);
        assert_eq!(map.get(Slot::Iv).len(), 16);
        assert_eq!(map.get(Slot::Ciphertext).len(), 32);
        assert_eq!(map.get(Slot::Tag).len(), 16);
        assert!(!map.is_set(Slot::Aad));
        assert_eq!(scratch.used(), 38 + 40 + 16 + 32 + 16);
    }

    #[test]
    fn compact_split_limits() {
        let key = JweKey::symmetric(&[0u8; 16]);
        let mut ctx = JweContext::new(&key);

        let mut buf = [0u8; 256];
        let options = DecryptionOptions {
            max_token_length: Some(100),
            ..Default::default()
        };
        let err = ctx
            .parse_compact(A3_TOKEN, Scratch::new(&mut buf), &options)
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::TokenTooLong));

        let mut buf = [0u8; 256];
        let options = DecryptionOptions {
            max_header_length: Some(10),
            ..Default::default()
        };
        let err = ctx
            .parse_compact(A3_TOKEN, Scratch::new(&mut buf), &options)
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::HeaderTooLarge));

        let mut buf = [0u8; 256];
        let err = ctx
            .parse_compact("a.b.c.d", Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidJWEFormat));

        let mut buf = [0u8; 64];
        let err = ctx
            .parse_compact(A3_TOKEN, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::BufferTooSmall));
        assert!(!ctx.map().is_set(Slot::Jose));
    }

    #[test]
    fn required_key_id() {
        let key = JweKey::symmetric(&[0u8; 16]);
        let mut ctx = JweContext::new(&key);
        let mut buf = [0u8; 256];
        let options = DecryptionOptions {
            required_key_id: Some("k1".to_string()),
            ..Default::default()
        };
        let err = ctx
            .parse_compact(A3_TOKEN, Scratch::new(&mut buf), &options)
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::MissingJWTKeyIdentifier));
    }

    #[test]
    fn flattened_split() {
        let key = JweKey::symmetric(&[0u8; 16]);
        let mut ctx = JweContext::new(&key);
        let mut buf = [0u8; 128];
        let json = r#"{"protected":"eyJhbGciOiJBMTI4S1ciLCJlbmMiOiJBMTI4Q0JDLUhTMjU2Iiwia2lkIjoiazEifQ","header":{"alg":"A128KW"},"aad":"QWxpY2U","iv":"AAAA","ciphertext":"AQID","tag":"BAUG"}"#;
        let options = DecryptionOptions {
            required_key_id: Some("k1".to_string()),
            ..Default::default()
        };
        ctx.parse_flattened(json, Scratch::new(&mut buf), &options)
            .unwrap();
        assert_eq!(
            ctx.map().get(Slot::Jose),
            br#"{"alg":"A128KW","enc":"A128CBC-HS256","kid":"k1"}"#
        );
        assert_eq!(ctx.map().get(Slot::Aad), b"Alice");
        assert_eq!(ctx.map().get(Slot::Ciphertext), &[1, 2, 3]);
        assert!(!ctx.map().is_set(Slot::EncryptedKey));

        let mut buf = [0u8; 128];
        let options = DecryptionOptions {
            required_key_id: Some("k2".to_string()),
            ..Default::default()
        };
        let err = ctx
            .parse_flattened(json, Scratch::new(&mut buf), &options)
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::KeyIdentifierMismatch));
    }

    #[test]
    fn flattened_split_rejects_recipients() {
        let key = JweKey::symmetric(&[0u8; 16]);
        let mut ctx = JweContext::new(&key);
        let mut buf = [0u8; 128];
        let json = r#"{"protected":"e30","recipients":[{},{}],"ciphertext":"AQID"}"#;
        let err = ctx
            .parse_flattened(json, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::MultiRecipientNotSupported));

        let mut buf = [0u8; 128];
        let err = ctx
            .parse_flattened(r#"{"protected":"e30"}"#, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidJWEFormat));
    }

    #[test]
    fn metadata() {
        let header = JweContext::decode_metadata(A3_TOKEN).unwrap();
        assert_eq!(header.alg.as_deref(), Some("A128KW"));
        assert_eq!(header.enc.as_deref(), Some("A128CBC-HS256"));
        assert!(header.kid.is_none());
    }
}
