use boring::hash::MessageDigest;
use boring::pkey::PKey;
use boring::rsa::Padding;
use boring::sign::Signer;
use p256::ecdsa::signature::RandomizedDigestSigner as _;

use crate::error::*;
use crate::jose::SignatureAlgorithm;
use crate::key::{JweKey, KeyMaterial};

/// Computes a JWS signature over two already-encoded segments.
///
/// The signing input is `protected_b64 || '.' || payload_b64`.
pub trait JwsSigner {
    fn sign(
        &self,
        alg: SignatureAlgorithm,
        protected_b64: &[u8],
        payload_b64: &[u8],
    ) -> Result<Vec<u8>, Error>;
}

impl JwsSigner for JweKey {
    fn sign(
        &self,
        alg: SignatureAlgorithm,
        protected_b64: &[u8],
        payload_b64: &[u8],
    ) -> Result<Vec<u8>, Error> {
        match (alg, &self.material) {
            (SignatureAlgorithm::RS256, KeyMaterial::RsaPrivate(sk)) => {
                let pkey = PKey::from_rsa(sk.clone())?;
                let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
                signer.set_rsa_padding(Padding::PKCS1)?;
                signer.update(protected_b64)?;
                signer.update(b".")?;
                signer.update(payload_b64)?;
                Ok(signer.sign_to_vec()?)
            }
            (SignatureAlgorithm::ES256, KeyMaterial::P256 { sk: Some(sk), .. }) => {
                let signing_key = p256::ecdsa::SigningKey::from_bytes(&sk.to_bytes())
                    .map_err(|_| JWEError::InvalidKey)?;
                let mut digest = hmac_sha256::Hash::new();
                digest.update(protected_b64);
                digest.update(b".");
                digest.update(payload_b64);
                let signature: p256::ecdsa::Signature =
                    signing_key.sign_digest_with_rng(&mut rand::thread_rng(), digest);
                Ok(signature.to_bytes().to_vec())
            }
            (SignatureAlgorithm::ES384, KeyMaterial::P384 { sk: Some(sk), .. }) => {
                let signing_key = p384::ecdsa::SigningKey::from_bytes(&sk.to_bytes())
                    .map_err(|_| JWEError::InvalidKey)?;
                let mut digest = hmac_sha512::sha384::Hash::new();
                digest.update(protected_b64);
                digest.update(b".");
                digest.update(payload_b64);
                let signature: p384::ecdsa::Signature =
                    signing_key.sign_digest_with_rng(&mut rand::thread_rng(), digest);
                Ok(signature.to_bytes().to_vec())
            }
            _ => bail!(JWEError::InvalidKey),
        }
    }
}
