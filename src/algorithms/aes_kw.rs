//! AES Key Wrap (RFC 3394) as used by A128KW, A192KW, A256KW and the
//! ECDH-ES+AxxxKW variants.

use boring::aes::{unwrap_key, wrap_key, AesKey};
use zeroize::Zeroize;

use crate::algorithms::content::CEK;
use crate::error::*;

/// A key-encryption key for AES Key Wrap.
#[derive(Clone)]
pub struct AesKwKey {
    key: Vec<u8>,
}

impl std::fmt::Debug for AesKwKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesKwKey")
            .field("bits", &(self.key.len() * 8))
            .finish_non_exhaustive()
    }
}

impl Drop for AesKwKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AesKwKey {
    /// Create a key from raw bytes.
    ///
    /// The key must be 16, 24 or 32 bytes.
    pub fn from_bytes(key: &[u8]) -> Result<Self, Error> {
        ensure!(
            matches!(key.len(), 16 | 24 | 32),
            JWEError::InvalidKey
        );
        Ok(AesKwKey { key: key.to_vec() })
    }

    pub(crate) fn wrap_key(&self, cek: &[u8]) -> Result<Vec<u8>, Error> {
        let aes_key = AesKey::new_encrypt(&self.key).map_err(|_| JWEError::InvalidKey)?;

        // Output is 8 bytes larger than input (for IV)
        let mut wrapped = vec![0u8; cek.len() + 8];
        wrap_key(&aes_key, None, &mut wrapped, cek).map_err(|_| JWEError::CryptoFailure)?;

        Ok(wrapped)
    }

    pub(crate) fn unwrap_key(&self, wrapped: &[u8]) -> Result<CEK, Error> {
        ensure!(
            wrapped.len() >= 24 && wrapped.len() % 8 == 0,
            JWEError::DecryptionFailed
        );

        let aes_key = AesKey::new_decrypt(&self.key).map_err(|_| JWEError::DecryptionFailed)?;

        // Output is 8 bytes smaller than input
        let mut cek = vec![0u8; wrapped.len() - 8];
        if unwrap_key(&aes_key, None, &mut cek, wrapped).is_err() {
            cek.zeroize();
            bail!(JWEError::DecryptionFailed);
        }

        Ok(CEK::new(cek))
    }
}
