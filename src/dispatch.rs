//! Selection and execution of the encrypt/decrypt pipelines.

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};

use crate::algorithms::aes_kw::AesKwKey;
use crate::algorithms::content::{ContentEncryption, ContentEncryptionKind};
use crate::algorithms::ecdh_es::{agree_ephemeral, agree_static, concat_kdf};
use crate::algorithms::rsa::{self, RsaPadding};
use crate::context::JweContext;
use crate::error::*;
use crate::jose::{Algorithm, JoseHeader, KeyManagementAlgorithm, KeyManagementKind};
use crate::key::KeyMaterial;
use crate::map::Slot;
use crate::scratch::Scratch;

/// The supported `alg`/`enc` shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// RSA1_5 or RSA-OAEP key transport, AES-CBC + HMAC content
    RsaCbcHmac,
    /// RSA1_5 or RSA-OAEP key transport, AES-GCM content
    RsaGcm,
    /// AES Key Wrap, AES-CBC + HMAC content
    AesKwCbcHmac,
    /// ECDH-ES, direct or with AES Key Wrap, AES-CBC + HMAC content
    EcdhEsCbcHmac,
}

impl Pipeline {
    /// Pick the pipeline for an `alg`/`enc` pair, along with the key
    /// management algorithm it runs.
    ///
    /// Rows are tried in a fixed priority order and the first match wins.
    pub fn select(
        alg: Algorithm,
        enc: ContentEncryption,
    ) -> Result<(KeyManagementAlgorithm, Self), Error> {
        let km = match alg {
            Algorithm::KeyManagement(km) => km,
            Algorithm::Signature(_) => return unsupported(alg.alg_name(), enc.alg_name()),
        };
        let pipeline = match (km.kind(), enc.kind()) {
            (KeyManagementKind::RsaPkcs1v15, ContentEncryptionKind::AesCbcHmac)
            | (KeyManagementKind::RsaOaep, ContentEncryptionKind::AesCbcHmac) => Pipeline::RsaCbcHmac,
            (KeyManagementKind::RsaPkcs1v15, ContentEncryptionKind::AesGcm)
            | (KeyManagementKind::RsaOaep, ContentEncryptionKind::AesGcm) => Pipeline::RsaGcm,
            (KeyManagementKind::AesKeyWrap, ContentEncryptionKind::AesCbcHmac) => {
                Pipeline::AesKwCbcHmac
            }
            (KeyManagementKind::EcdhEs, ContentEncryptionKind::AesCbcHmac) => {
                Pipeline::EcdhEsCbcHmac
            }
            _ => return unsupported(alg.alg_name(), enc.alg_name()),
        };
        Ok((km, pipeline))
    }
}

fn unsupported<T>(alg: &str, enc: &str) -> Result<T, Error> {
    tracing::warn!(alg, enc, "unsupported algorithm combination");
    bail!(JWEError::UnsupportedAlgorithmCombination {
        alg: alg.to_string(),
        enc: enc.to_string(),
    })
}

fn rsa_padding(alg: KeyManagementAlgorithm) -> RsaPadding {
    match alg.kind() {
        KeyManagementKind::RsaPkcs1v15 => RsaPadding::Pkcs1v15,
        _ => RsaPadding::Oaep,
    }
}

impl<'a> JweContext<'a> {
    /// Encrypt `plaintext` into the context.
    ///
    /// The protected header is the JOSE slot if set, otherwise it is rendered
    /// from the context header. The encrypted key, IV, ciphertext and tag are
    /// stored in `scratch` and the matching slots point at them. Returns the
    /// unused part of the arena.
    pub fn encrypt(&mut self, plaintext: &[u8], scratch: Scratch<'a>) -> Result<Scratch<'a>, Error> {
        let scratch = self.load_header(scratch)?;
        let (km, enc, pipeline) = self.pipeline()?;
        let mut scratch = scratch;

        let cek;
        let encrypted_key;
        match pipeline {
            Pipeline::RsaCbcHmac | Pipeline::RsaGcm => {
                let padding = rsa_padding(km);
                cek = enc.generate_cek();
                encrypted_key = match &self.key.material {
                    KeyMaterial::RsaPrivate(sk) => rsa::wrap_key(sk, padding, cek.as_bytes())?,
                    KeyMaterial::RsaPublic(pk) => rsa::wrap_key(pk, padding, cek.as_bytes())?,
                    _ => bail!(JWEError::InvalidKey),
                };
            }
            Pipeline::AesKwCbcHmac => {
                let kek = self.wrapping_key(km)?;
                cek = enc.generate_cek();
                encrypted_key = kek.wrap_key(cek.as_bytes())?;
            }
            Pipeline::EcdhEsCbcHmac => {
                let (z, epk) = agree_ephemeral(self.key)?;
                self.header.wire.epk = Some(epk);
                let json = self.header.render(self.key)?;
                let (json, rest) = scratch.store(&json)?;
                self.map.set(Slot::Jose, json);
                scratch = rest;

                if km.is_direct() {
                    cek = concat_kdf(&self.header, true, &z)?;
                    encrypted_key = vec![];
                } else {
                    let kek = AesKwKey::from_bytes(concat_kdf(&self.header, false, &z)?.as_bytes())?;
                    cek = enc.generate_cek();
                    encrypted_key = kek.wrap_key(cek.as_bytes())?;
                }
            }
        }

        let iv = enc.generate_iv();
        let aad = self.authenticated_data()?;
        let (ciphertext, tag) = enc.encrypt(cek.as_bytes(), &iv, &aad, plaintext)?;
        drop(cek);

        let (encrypted_key, scratch) = scratch.store(&encrypted_key)?;
        let (iv, scratch) = scratch.store(&iv)?;
        let (ciphertext, scratch) = scratch.store(&ciphertext)?;
        let (tag, scratch) = scratch.store(&tag)?;
        self.map.set(Slot::EncryptedKey, encrypted_key);
        self.map.set(Slot::Iv, iv);
        self.map.set(Slot::Ciphertext, ciphertext);
        self.map.set(Slot::Tag, tag);

        Ok(scratch)
    }

    /// Verify and decrypt the envelope held by the context.
    ///
    /// The plaintext is written to `scratch`. Any authentication failure is
    /// reported as [`JWEError::DecryptionFailed`].
    pub fn decrypt_and_verify(&mut self, scratch: Scratch<'a>) -> Result<(&'a [u8], Scratch<'a>), Error> {
        ensure!(self.map.is_set(Slot::Jose), JWEError::InvalidState);
        let scratch = self.load_header(scratch)?;
        let (km, enc, pipeline) = self.pipeline()?;
        let encrypted_key = self.map.get(Slot::EncryptedKey);

        let cek = match pipeline {
            Pipeline::RsaCbcHmac | Pipeline::RsaGcm => match &self.key.material {
                KeyMaterial::RsaPrivate(sk) => {
                    rsa::unwrap_key(sk, rsa_padding(km), encrypted_key, enc.key_size())?
                }
                _ => bail!(JWEError::InvalidKey),
            },
            Pipeline::AesKwCbcHmac => self.wrapping_key(km)?.unwrap_key(encrypted_key)?,
            Pipeline::EcdhEsCbcHmac => {
                let epk = self
                    .header
                    .wire
                    .epk
                    .as_ref()
                    .ok_or(JWEError::MissingEphemeralKey)?;
                let z = agree_static(self.key, epk)?;
                if km.is_direct() {
                    ensure!(encrypted_key.is_empty(), JWEError::InvalidJWEFormat);
                    concat_kdf(&self.header, true, &z)?
                } else {
                    let kek = AesKwKey::from_bytes(concat_kdf(&self.header, false, &z)?.as_bytes())?;
                    kek.unwrap_key(encrypted_key)?
                }
            }
        };
        ensure!(
            cek.as_bytes().len() == enc.key_size(),
            JWEError::DecryptionFailed
        );

        let aad = self.authenticated_data()?;
        let plaintext = enc
            .decrypt(
                cek.as_bytes(),
                self.map.get(Slot::Iv),
                &aad,
                self.map.get(Slot::Ciphertext),
                self.map.get(Slot::Tag),
            )
            .map_err(|err| {
                tracing::debug!(alg = km.alg_name(), enc = enc.alg_name(), "decryption failed");
                err
            })?;
        drop(cek);

        scratch.store(&plaintext)
    }

    // Parse the JOSE slot into the header, or render the header into the
    // JOSE slot when it is empty.
    fn load_header(&mut self, scratch: Scratch<'a>) -> Result<Scratch<'a>, Error> {
        if !self.map.is_set(Slot::Jose) {
            let json = self.header.render(self.key)?;
            let (json, scratch) = scratch.store(&json)?;
            self.map.set(Slot::Jose, json);
            return Ok(scratch);
        }
        let (header, scratch) = JoseHeader::parse(self.map.get(Slot::Jose), scratch).map_err(|err| {
            tracing::debug!(%err, "unable to parse JOSE header");
            err
        })?;
        self.header = header;
        Ok(scratch)
    }

    fn pipeline(&self) -> Result<(KeyManagementAlgorithm, ContentEncryption, Pipeline), Error> {
        let (alg, enc) = match (self.header.alg, self.header.enc) {
            (Some(alg), Some(enc)) => (alg, enc),
            _ => {
                tracing::debug!(
                    alg = self.header.alg_name(),
                    enc = self.header.enc_name(),
                    "JOSE header is missing alg or enc"
                );
                bail!(JWEError::InvalidState)
            }
        };
        let (km, pipeline) = Pipeline::select(alg, enc)?;
        Ok((km, enc, pipeline))
    }

    fn wrapping_key(&self, km: KeyManagementAlgorithm) -> Result<AesKwKey, Error> {
        match &self.key.material {
            KeyMaterial::Oct(k) if k.len() * 8 == km.key_bits() as usize => AesKwKey::from_bytes(k),
            _ => bail!(JWEError::InvalidKey),
        }
    }

    // ASCII(BASE64URL(protected)), followed by '.' || BASE64URL(aad) when
    // additional authenticated data is present.
    fn authenticated_data(&self) -> Result<Vec<u8>, Error> {
        let mut aad = Base64UrlSafeNoPadding::encode_to_string(self.map.get(Slot::Jose))?.into_bytes();
        if self.map.is_set(Slot::Aad) {
            aad.push(b'.');
            aad.extend_from_slice(
                Base64UrlSafeNoPadding::encode_to_string(self.map.get(Slot::Aad))?.as_bytes(),
            );
        }
        Ok(aad)
    }
}
