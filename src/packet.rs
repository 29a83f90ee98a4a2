//! JWS-signed packets carrying the signer's public key and a nonce in the
//! protected header, as used by ACME-style clients.

use crate::algorithms::jws::JwsSigner;
use crate::context::JweContext;
use crate::error::*;
use crate::jose::Algorithm;
use crate::map::{ByteRangeMap, Slot};
use crate::scratch::SliceWriter;

const SIGNED_HEADER_CAPACITY: usize = 2048;

impl<'a> JweContext<'a> {
    /// Build `{"protected":…,"payload":…,"header":…,"signature":…}` into
    /// `out` and return its length.
    ///
    /// The protected header is `{"alg":…,"jwk":<public key>,"nonce":…}` with
    /// `alg` taken from the context header. `"header"` carries the payload
    /// encoding again. On error the contents of `out` are undefined.
    pub fn build_signed_packet(&self, payload: &[u8], nonce: &str, out: &mut [u8]) -> Result<usize, Error> {
        let alg = match self.header.alg {
            Some(Algorithm::Signature(alg)) => alg,
            Some(Algorithm::KeyManagement(alg)) => {
                bail!(JWEError::UnsupportedAlgorithm(alg.alg_name().to_string()))
            }
            None => bail!(JWEError::InvalidState),
        };
        let jwk = self.key.export(false).map_err(|err| {
            tracing::warn!(%err, "unable to export the signing key");
            JWEError::KeyExportFailed
        })?;
        let nonce = serde_json::to_string(nonce)?;

        let mut header_buf = [0u8; SIGNED_HEADER_CAPACITY];
        let mut h = SliceWriter::new(&mut header_buf);
        h.push_str("{\"alg\":\"")?;
        h.push_str(alg.alg_name())?;
        h.push_str("\",\"jwk\":")?;
        h.push_str(&jwk)?;
        h.push_str(",\"nonce\":")?;
        h.push_str(&nonce)?;
        h.push_str("}")?;

        let mut w = SliceWriter::new(out);
        w.push_str("{\"protected\":\"")?;
        let protected = w.push_b64(h.written())?;
        w.push_str("\",\"payload\":\"")?;
        let encoded_payload = w.push_b64(payload)?;
        w.push_str("\",\"header\":\"")?;
        w.push_b64(payload)?;
        w.push_str("\",\"signature\":\"")?;

        let signature = {
            let written = w.written();
            let mut segments = ByteRangeMap::new();
            segments.set(Slot::Jose, &written[protected]);
            segments.set(Slot::Payload, &written[encoded_payload]);
            self.key
                .sign(alg, segments.get(Slot::Jose), segments.get(Slot::Payload))
                .map_err(|err| {
                    tracing::warn!(alg = alg.alg_name(), %err, "signing failed");
                    err
                })?
        };
        w.push_b64(&signature)?;
        w.push_str("\"}")?;

        Ok(w.position())
    }
}
