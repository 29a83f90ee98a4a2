//! Content encryption algorithms for JWE.
//!
//! AES-CBC with HMAC-SHA2 (RFC 7518 section 5.2) and AES-GCM (section 5.3).

use boring::symm::{Cipher, Crypter, Mode};
use rand::RngCore;
use zeroize::Zeroize;

use crate::common::be64;
use crate::error::*;

const AES_BLOCK_SIZE: usize = 16;

/// Family of a content encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryptionKind {
    AesCbcHmac,
    AesGcm,
}

/// HMAC variant paired with AES-CBC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacType {
    Sha256,
    Sha384,
    Sha512,
}

/// Content encryption algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncryption {
    /// AES-128-CBC with HMAC-SHA-256
    #[default]
    A128CBCHS256,
    /// AES-192-CBC with HMAC-SHA-384
    A192CBCHS384,
    /// AES-256-CBC with HMAC-SHA-512
    A256CBCHS512,
    /// AES-128-GCM
    A128GCM,
    /// AES-256-GCM
    A256GCM,
}

impl ContentEncryption {
    /// Value of the `enc` header parameter.
    pub fn alg_name(&self) -> &'static str {
        match self {
            ContentEncryption::A128CBCHS256 => "A128CBC-HS256",
            ContentEncryption::A192CBCHS384 => "A192CBC-HS384",
            ContentEncryption::A256CBCHS512 => "A256CBC-HS512",
            ContentEncryption::A128GCM => "A128GCM",
            ContentEncryption::A256GCM => "A256GCM",
        }
    }

    /// Look up an algorithm by its `enc` value.
    pub fn from_alg_name(name: &str) -> Result<Self, Error> {
        match name {
            "A128CBC-HS256" => Ok(ContentEncryption::A128CBCHS256),
            "A192CBC-HS384" => Ok(ContentEncryption::A192CBCHS384),
            "A256CBC-HS512" => Ok(ContentEncryption::A256CBCHS512),
            "A128GCM" => Ok(ContentEncryption::A128GCM),
            "A256GCM" => Ok(ContentEncryption::A256GCM),
            _ => bail!(JWEError::UnsupportedContentEncryption(name.to_string())),
        }
    }

    pub fn kind(&self) -> ContentEncryptionKind {
        match self {
            ContentEncryption::A128CBCHS256
            | ContentEncryption::A192CBCHS384
            | ContentEncryption::A256CBCHS512 => ContentEncryptionKind::AesCbcHmac,
            ContentEncryption::A128GCM | ContentEncryption::A256GCM => {
                ContentEncryptionKind::AesGcm
            }
        }
    }

    /// The HMAC paired with AES-CBC, `None` for GCM.
    pub fn hmac(&self) -> Option<HmacType> {
        match self {
            ContentEncryption::A128CBCHS256 => Some(HmacType::Sha256),
            ContentEncryption::A192CBCHS384 => Some(HmacType::Sha384),
            ContentEncryption::A256CBCHS512 => Some(HmacType::Sha512),
            _ => None,
        }
    }

    /// CEK length in bytes. CBC-HMAC keys hold the MAC key followed by the
    /// AES key.
    pub fn key_size(&self) -> usize {
        match self {
            ContentEncryption::A128CBCHS256 => 32,
            ContentEncryption::A192CBCHS384 => 48,
            ContentEncryption::A256CBCHS512 => 64,
            ContentEncryption::A128GCM => 16,
            ContentEncryption::A256GCM => 32,
        }
    }

    pub fn key_bits(&self) -> u32 {
        (self.key_size() * 8) as u32
    }

    pub fn iv_size(&self) -> usize {
        match self.kind() {
            ContentEncryptionKind::AesCbcHmac => 16,
            ContentEncryptionKind::AesGcm => 12,
        }
    }

    /// Tag length in bytes. CBC-HMAC tags are half of the HMAC output.
    pub fn tag_size(&self) -> usize {
        match self.kind() {
            ContentEncryptionKind::AesCbcHmac => self.key_size() / 2,
            ContentEncryptionKind::AesGcm => 16,
        }
    }

    /// A fresh random CEK of the right length.
    pub fn generate_cek(&self) -> CEK {
        let mut cek = vec![0u8; self.key_size()];
        rand::thread_rng().fill_bytes(&mut cek);
        CEK::new(cek)
    }

    pub fn generate_iv(&self) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_size()];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    fn cipher(&self) -> Cipher {
        match self {
            ContentEncryption::A128CBCHS256 => Cipher::aes_128_cbc(),
            ContentEncryption::A192CBCHS384 => Cipher::aes_192_cbc(),
            ContentEncryption::A256CBCHS512 => Cipher::aes_256_cbc(),
            ContentEncryption::A128GCM => Cipher::aes_128_gcm(),
            ContentEncryption::A256GCM => Cipher::aes_256_gcm(),
        }
    }

    /// Encrypt and authenticate `plaintext`, returning `(ciphertext, tag)`.
    pub fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(cek.len() == self.key_size(), JWEError::InvalidKey);
        ensure!(iv.len() == self.iv_size(), JWEError::CryptoFailure);

        match self.hmac() {
            Some(hmac) => {
                let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
                let ciphertext = self
                    .cbc_crypt(Mode::Encrypt, enc_key, iv, plaintext)
                    .map_err(|_| JWEError::CryptoFailure)?;
                let tag = self.cbc_tag(hmac, mac_key, aad, iv, &ciphertext);
                Ok((ciphertext, tag))
            }
            None => self
                .gcm_encrypt(cek, iv, aad, plaintext)
                .map_err(|_| JWEError::CryptoFailure.into()),
        }
    }

    /// Verify and decrypt ciphertext.
    ///
    /// Every failure is reported as [`JWEError::DecryptionFailed`].
    pub fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        ensure!(cek.len() == self.key_size(), JWEError::DecryptionFailed);
        ensure!(iv.len() == self.iv_size(), JWEError::DecryptionFailed);
        ensure!(tag.len() == self.tag_size(), JWEError::DecryptionFailed);

        match self.hmac() {
            Some(hmac) => {
                let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
                let expected = self.cbc_tag(hmac, mac_key, aad, iv, ciphertext);
                ensure!(
                    ct_codecs::verify(&expected, tag),
                    JWEError::DecryptionFailed
                );
                self.cbc_crypt(Mode::Decrypt, enc_key, iv, ciphertext)
                    .map_err(|_| JWEError::DecryptionFailed.into())
            }
            None => self
                .gcm_decrypt(cek, iv, aad, ciphertext, tag)
                .map_err(|_| JWEError::DecryptionFailed.into()),
        }
    }

    // M = HMAC(MAC_KEY, A || IV || E || AL), T = first half of M
    fn cbc_tag(
        &self,
        hmac: HmacType,
        mac_key: &[u8],
        aad: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Vec<u8> {
        let al = be64((aad.len() as u64) * 8);
        let mut tag = match hmac {
            HmacType::Sha256 => {
                let mut h = hmac_sha256::HMAC::new(mac_key);
                h.update(aad);
                h.update(iv);
                h.update(ciphertext);
                h.update(al);
                h.finalize().to_vec()
            }
            HmacType::Sha384 => {
                let mut h = hmac_sha512::sha384::HMAC::new(mac_key);
                h.update(aad);
                h.update(iv);
                h.update(ciphertext);
                h.update(al);
                h.finalize().to_vec()
            }
            HmacType::Sha512 => {
                let mut h = hmac_sha512::HMAC::new(mac_key);
                h.update(aad);
                h.update(iv);
                h.update(ciphertext);
                h.update(al);
                h.finalize().to_vec()
            }
        };
        tag.truncate(self.tag_size());
        tag
    }

    fn cbc_crypt(&self, mode: Mode, key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut crypter = Crypter::new(self.cipher(), mode, key, Some(iv))?;
        drain(&mut crypter, input)
    }

    fn gcm_encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let mut sealer = Crypter::new(self.cipher(), Mode::Encrypt, cek, Some(iv))?;
        sealer.aad_update(aad)?;
        let sealed = drain(&mut sealer, plaintext)?;
        let mut tag = [0u8; AES_BLOCK_SIZE];
        sealer.get_tag(&mut tag)?;
        Ok((sealed, tag.to_vec()))
    }

    fn gcm_decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let mut opener = Crypter::new(self.cipher(), Mode::Decrypt, cek, Some(iv))?;
        opener.aad_update(aad)?;
        opener.set_tag(tag)?;
        drain(&mut opener, ciphertext)
    }
}

// Push all of `input` through `crypter` and finalize it.
fn drain(crypter: &mut Crypter, input: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; input.len() + AES_BLOCK_SIZE];
    let head = crypter.update(input, &mut out)?;
    let tail = crypter.finalize(&mut out[head..])?;
    out.truncate(head + tail);
    Ok(out)
}

/// Content encryption key, wiped when dropped.
#[derive(Clone)]
pub struct CEK {
    key: Vec<u8>,
}

impl CEK {
    pub fn new(key: Vec<u8>) -> Self {
        CEK { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for CEK {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AsRef<[u8]> for CEK {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for CEK {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CEK")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}
