//! ECDH-ES key agreement (RFC 7518 section 4.6) on P-256 and P-384.
//!
//! The shared secret is fed to the Concat KDF (NIST SP 800-56A section
//! 5.8.1) with SHA-256. The result is either the CEK itself (`ECDH-ES`) or a
//! key-encryption key for AES Key Wrap (`ECDH-ES+AxxxKW`).

use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::thread_rng;
use serde_json::{json, Value};
use zeroize::Zeroizing;

use crate::algorithms::content::CEK;
use crate::common::be32;
use crate::error::*;
use crate::jose::JoseHeader;
use crate::key::{EcCurve, JweKey, KeyMaterial};

/// Derive `keydatalen` bits from the shared secret `z`.
///
/// With `direct`, the algorithm ID is the `enc` name and the output length is
/// the CEK length of `enc`. Otherwise the algorithm ID is the `alg` name and
/// the output length is the key-wrap key length of `alg`.
pub(crate) fn concat_kdf(header: &JoseHeader<'_>, direct: bool, z: &[u8]) -> Result<CEK, Error> {
    let (alg, enc) = match (header.key_management(), header.enc) {
        (Some(alg), Some(enc)) => (alg, enc),
        _ => bail!(JWEError::InvalidState),
    };
    let (algorithm_id, key_bits) = if direct {
        (enc.alg_name(), enc.key_bits())
    } else {
        (alg.alg_name(), alg.key_bits())
    };
    ensure!(key_bits > 0, JWEError::InvalidState);
    let key_len = (key_bits / 8) as usize;

    let mut derived = Vec::with_capacity(key_len + 32);
    let mut counter: u32 = 1;
    while derived.len() < key_len {
        let mut h = hmac_sha256::Hash::new();
        h.update(be32(counter));
        h.update(z);
        h.update(be32(algorithm_id.len() as u32));
        h.update(algorithm_id.as_bytes());
        h.update(be32(header.apu.len() as u32));
        h.update(header.apu);
        h.update(be32(header.apv.len() as u32));
        h.update(header.apv);
        h.update(be32(key_bits));
        derived.extend_from_slice(&h.finalize());
        counter += 1;
    }
    derived.truncate(key_len);

    Ok(CEK::new(derived))
}

/// Generate an ephemeral key on the recipient's curve and agree on a shared
/// secret. Returns the secret and the `epk` JWK to put in the header.
pub(crate) fn agree_ephemeral(recipient: &JweKey) -> Result<(Zeroizing<Vec<u8>>, Value), Error> {
    match &recipient.material {
        KeyMaterial::P256 { pk, .. } => {
            let ephemeral = p256::ecdh::EphemeralSecret::random(&mut thread_rng());
            let shared = ephemeral.diffie_hellman(pk);
            let point = ephemeral.public_key().to_encoded_point(false);
            let epk = epk_jwk(EcCurve::P256, point.x(), point.y())?;
            Ok((Zeroizing::new(shared.raw_secret_bytes().to_vec()), epk))
        }
        KeyMaterial::P384 { pk, .. } => {
            let ephemeral = p384::ecdh::EphemeralSecret::random(&mut thread_rng());
            let shared = ephemeral.diffie_hellman(pk);
            let point = ephemeral.public_key().to_encoded_point(false);
            let epk = epk_jwk(EcCurve::P384, point.x(), point.y())?;
            Ok((Zeroizing::new(shared.raw_secret_bytes().to_vec()), epk))
        }
        _ => bail!(JWEError::InvalidKey),
    }
}

/// Agree on the shared secret from the recipient's private key and the
/// sender's `epk`.
pub(crate) fn agree_static(recipient: &JweKey, epk: &Value) -> Result<Zeroizing<Vec<u8>>, Error> {
    let (curve, sec1) = parse_epk(epk)?;
    match &recipient.material {
        KeyMaterial::P256 { sk: Some(sk), .. } => {
            ensure!(curve == EcCurve::P256, JWEError::InvalidEphemeralKey);
            let epk = p256::PublicKey::from_sec1_bytes(&sec1)
                .map_err(|_| JWEError::InvalidEphemeralKey)?;
            let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), epk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        KeyMaterial::P384 { sk: Some(sk), .. } => {
            ensure!(curve == EcCurve::P384, JWEError::InvalidEphemeralKey);
            let epk = p384::PublicKey::from_sec1_bytes(&sec1)
                .map_err(|_| JWEError::InvalidEphemeralKey)?;
            let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), epk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        _ => bail!(JWEError::InvalidKey),
    }
}

fn epk_jwk<X: AsRef<[u8]>>(curve: EcCurve, x: Option<X>, y: Option<X>) -> Result<Value, Error> {
    let x = x.ok_or(JWEError::CryptoFailure)?;
    let y = y.ok_or(JWEError::CryptoFailure)?;
    let x = Base64UrlSafeNoPadding::encode_to_string(x.as_ref())?;
    let y = Base64UrlSafeNoPadding::encode_to_string(y.as_ref())?;
    Ok(json!({
        "kty": "EC",
        "crv": curve.name(),
        "x": x,
        "y": y
    }))
}

// Returns the curve and the uncompressed SEC1 encoding of the point.
fn parse_epk(epk: &Value) -> Result<(EcCurve, Vec<u8>), Error> {
    let kty = epk.get("kty").and_then(|v| v.as_str());
    ensure!(kty == Some("EC"), JWEError::InvalidEphemeralKey);

    let curve = epk
        .get("crv")
        .and_then(|v| v.as_str())
        .and_then(EcCurve::from_name)
        .ok_or(JWEError::InvalidEphemeralKey)?;
    let coordinate_len = match curve {
        EcCurve::P256 => 32,
        EcCurve::P384 => 48,
    };

    let mut sec1 = vec![0x04];
    for name in ["x", "y"].iter() {
        let b64 = epk
            .get(*name)
            .and_then(|v| v.as_str())
            .ok_or(JWEError::InvalidEphemeralKey)?;
        let bytes = Base64UrlSafeNoPadding::decode_to_vec(b64, None)
            .map_err(|_| JWEError::InvalidEphemeralKey)?;
        ensure!(bytes.len() == coordinate_len, JWEError::InvalidEphemeralKey);
        sec1.extend_from_slice(&bytes);
    }

    Ok((curve, sec1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::content::ContentEncryption;
    use crate::jose::KeyManagementAlgorithm;

    // RFC 7518 appendix C
    const Z: [u8; 32] = [
        158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49, 110,
        163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
    ];
    const ALICE_D: &str = "0_NxaRPUMQoAJt50Gz8YiTr8gRTwyEaCumd-MToTmIo";
    const BOB_D: &str = "VEmDZpDXXK8p8N0Cndsxs924q6nS1RXFASRl6BfUqdw";

    fn rfc_header() -> JoseHeader<'static> {
        let mut header = JoseHeader::new(KeyManagementAlgorithm::ECDH_ES, ContentEncryption::A128GCM);
        header.apu = b"Alice";
        header.apv = b"Bob";
        header
    }

    fn p256_key(d: &str) -> JweKey {
        let d = Base64UrlSafeNoPadding::decode_to_vec(d, None).unwrap();
        JweKey::ec_from_secret_bytes(EcCurve::P256, &d).unwrap()
    }

    #[test]
    fn rfc7518_appendix_c() {
        let cek = concat_kdf(&rfc_header(), true, &Z).unwrap();
        assert_eq!(
            Base64UrlSafeNoPadding::encode_to_string(cek.as_bytes()).unwrap(),
            "VqqN6vgjbSBcIijNcacQGg"
        );
    }

    #[test]
    fn cbc_hs256_uses_enc_as_algorithm_id() {
        let mut header = JoseHeader::new(KeyManagementAlgorithm::ECDH_ES, ContentEncryption::A128CBCHS256);
        header.apu = b"Alice";
        header.apv = b"Bob";
        let cek = concat_kdf(&header, true, &Z).unwrap();
        assert_eq!(
            Base64UrlSafeNoPadding::encode_to_string(cek.as_bytes()).unwrap(),
            "pFbcswReTQoJg4PpP0Jaue8uwkpyajoYE7Pb-cbRzcM"
        );
    }

    #[test]
    fn rfc7518_appendix_c_agreement() {
        let alice = p256_key(ALICE_D);
        let bob = p256_key(BOB_D);
        let alice_jwk: Value = serde_json::from_str(&alice.export(false).unwrap()).unwrap();
        let epk = json!({
            "kty": "EC",
            "crv": "P-256",
            "x": alice_jwk["x"],
            "y": alice_jwk["y"],
        });
        let z = agree_static(&bob, &epk).unwrap();
        assert_eq!(&z[..], &Z[..]);
    }

    #[test]
    fn ephemeral_and_static_agree() {
        for curve in [EcCurve::P256, EcCurve::P384].iter() {
            let recipient = JweKey::generate_ec(*curve);
            let public = recipient.public_key().unwrap();
            let (z1, epk) = agree_ephemeral(&public).unwrap();
            assert_eq!(epk["crv"], curve.name());
            let z2 = agree_static(&recipient, &epk).unwrap();
            assert_eq!(&z1[..], &z2[..]);
            // a public key alone can't recover the secret
            assert!(agree_static(&public, &epk).is_err());
        }
    }

    #[test]
    fn epk_curve_must_match_key() {
        let recipient = JweKey::generate_ec(EcCurve::P384);
        let (_, epk) = agree_ephemeral(&JweKey::generate_ec(EcCurve::P256)).unwrap();
        let err = agree_static(&recipient, &epk).unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidEphemeralKey));

        let err = agree_static(&recipient, &json!({"kty": "EC", "crv": "P-521"})).unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidEphemeralKey));
    }

    #[test]
    fn output_length_follows_alg_or_enc() {
        let mut header = rfc_header();
        header.enc = Some(ContentEncryption::A256CBCHS512);
        assert_eq!(concat_kdf(&header, true, &Z).unwrap().as_bytes().len(), 64);

        header.alg = Some(KeyManagementAlgorithm::ECDH_ES_A192KW.into());
        assert_eq!(concat_kdf(&header, false, &Z).unwrap().as_bytes().len(), 24);
    }

    #[test]
    fn two_blocks_are_truncated() {
        let mut header = rfc_header();
        header.enc = Some(ContentEncryption::A192CBCHS384);
        let cek = concat_kdf(&header, true, &Z).unwrap();
        assert_eq!(cek.as_bytes().len(), 48);

        let block = |counter: u32| {
            let mut h = hmac_sha256::Hash::new();
            h.update(counter.to_be_bytes());
            h.update(Z);
            h.update(13u32.to_be_bytes());
            h.update(b"A192CBC-HS384");
            h.update(5u32.to_be_bytes());
            h.update(b"Alice");
            h.update(3u32.to_be_bytes());
            h.update(b"Bob");
            h.update(384u32.to_be_bytes());
            h.finalize()
        };
        assert_eq!(&cek.as_bytes()[..32], &block(1)[..]);
        assert_eq!(&cek.as_bytes()[32..], &block(2)[..16]);
    }

    #[test]
    fn every_input_matters() {
        let base = concat_kdf(&rfc_header(), true, &Z).unwrap();
        assert_eq!(
            concat_kdf(&rfc_header(), true, &Z).unwrap().as_bytes(),
            base.as_bytes()
        );

        let mut z = Z;
        z[31] ^= 1;
        assert_ne!(concat_kdf(&rfc_header(), true, &z).unwrap().as_bytes(), base.as_bytes());

        let mut header = rfc_header();
        header.apu = b"Alicf";
        assert_ne!(concat_kdf(&header, true, &Z).unwrap().as_bytes(), base.as_bytes());

        let mut header = rfc_header();
        header.apv = b"";
        assert_ne!(concat_kdf(&header, true, &Z).unwrap().as_bytes(), base.as_bytes());
    }

    #[test]
    fn missing_algorithms_are_invalid_state() {
        let mut header = rfc_header();
        header.enc = None;
        let err = concat_kdf(&header, true, &Z).unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidState));

        let mut header = rfc_header();
        header.alg = None;
        let err = concat_kdf(&header, true, &Z).unwrap_err();
        assert!(is_jwe_error(&err, &JWEError::InvalidState));
    }
}
