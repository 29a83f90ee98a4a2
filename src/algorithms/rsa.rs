//! RSA key transport for JWE: RSA1_5 and RSA-OAEP (SHA-1).
//!
//! Note: RSA-OAEP-256 (with SHA-256) is not supported because the underlying
//! OAEP digest cannot be selected through the boring RSA API.

use boring::pkey::{HasPublic, Private};
use boring::rsa::{Padding, Rsa};
use rand::RngCore;
use zeroize::Zeroize;

use crate::algorithms::content::CEK;
use crate::error::*;

pub(crate) const MIN_RSA_MODULUS_BITS: u32 = 2048;

/// RSA encryption padding used for key transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    Pkcs1v15,
    Oaep,
}

impl RsaPadding {
    fn padding(self) -> Padding {
        match self {
            RsaPadding::Pkcs1v15 => Padding::PKCS1,
            RsaPadding::Oaep => Padding::PKCS1_OAEP,
        }
    }
}

pub(crate) fn validate_key_size(bits: u32) -> Result<(), Error> {
    ensure!(bits >= MIN_RSA_MODULUS_BITS, JWEError::WeakKey);
    Ok(())
}

/// Encrypt the CEK to the recipient's public key.
pub(crate) fn wrap_key<T: HasPublic>(
    pk: &Rsa<T>,
    padding: RsaPadding,
    cek: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut encrypted = vec![0u8; pk.size() as usize];
    let encrypted_len = pk
        .public_encrypt(cek, &mut encrypted, padding.padding())
        .map_err(|_| JWEError::CryptoFailure)?;
    encrypted.truncate(encrypted_len);

    Ok(encrypted)
}

/// Recover the CEK with the private key.
///
/// With PKCS#1 v1.5 a padding failure yields a random CEK of the expected
/// length, so the failure only shows up when the tag is checked (RFC 7516
/// section 11.5).
pub(crate) fn unwrap_key(
    sk: &Rsa<Private>,
    padding: RsaPadding,
    encrypted_key: &[u8],
    cek_len: usize,
) -> Result<CEK, Error> {
    let mut cek = vec![0u8; sk.size() as usize];
    let res = sk.private_decrypt(encrypted_key, &mut cek, padding.padding());
    match (res, padding) {
        (Ok(n), _) if n == cek_len => {
            cek.truncate(n);
            Ok(CEK::new(cek))
        }
        (_, RsaPadding::Pkcs1v15) => {
            cek.zeroize();
            let mut random = vec![0u8; cek_len];
            rand::thread_rng().fill_bytes(&mut random);
            Ok(CEK::new(random))
        }
        _ => {
            cek.zeroize();
            bail!(JWEError::DecryptionFailed)
        }
    }
}
