//! Algorithm descriptors and the typed JOSE header.

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};

use crate::algorithms::content::ContentEncryption;
use crate::error::*;
use crate::jwe_header::JWEHeader;
use crate::key::JweKey;
use crate::scratch::Scratch;

/// How a key management algorithm protects the CEK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagementKind {
    RsaPkcs1v15,
    RsaOaep,
    AesKeyWrap,
    EcdhEs,
}

/// JWE key management algorithm (the `alg` of an encrypted envelope).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagementAlgorithm {
    RSA1_5,
    RSA_OAEP,
    A128KW,
    A192KW,
    A256KW,
    ECDH_ES,
    ECDH_ES_A128KW,
    ECDH_ES_A192KW,
    ECDH_ES_A256KW,
}

impl KeyManagementAlgorithm {
    pub fn alg_name(&self) -> &'static str {
        match self {
            KeyManagementAlgorithm::RSA1_5 => "RSA1_5",
            KeyManagementAlgorithm::RSA_OAEP => "RSA-OAEP",
            KeyManagementAlgorithm::A128KW => "A128KW",
            KeyManagementAlgorithm::A192KW => "A192KW",
            KeyManagementAlgorithm::A256KW => "A256KW",
            KeyManagementAlgorithm::ECDH_ES => "ECDH-ES",
            KeyManagementAlgorithm::ECDH_ES_A128KW => "ECDH-ES+A128KW",
            KeyManagementAlgorithm::ECDH_ES_A192KW => "ECDH-ES+A192KW",
            KeyManagementAlgorithm::ECDH_ES_A256KW => "ECDH-ES+A256KW",
        }
    }

    pub fn from_alg_name(name: &str) -> Option<Self> {
        let alg = match name {
            "RSA1_5" => KeyManagementAlgorithm::RSA1_5,
            "RSA-OAEP" => KeyManagementAlgorithm::RSA_OAEP,
            "A128KW" => KeyManagementAlgorithm::A128KW,
            "A192KW" => KeyManagementAlgorithm::A192KW,
            "A256KW" => KeyManagementAlgorithm::A256KW,
            "ECDH-ES" => KeyManagementAlgorithm::ECDH_ES,
            "ECDH-ES+A128KW" => KeyManagementAlgorithm::ECDH_ES_A128KW,
            "ECDH-ES+A192KW" => KeyManagementAlgorithm::ECDH_ES_A192KW,
            "ECDH-ES+A256KW" => KeyManagementAlgorithm::ECDH_ES_A256KW,
            _ => return None,
        };
        Some(alg)
    }

    pub fn kind(&self) -> KeyManagementKind {
        match self {
            KeyManagementAlgorithm::RSA1_5 => KeyManagementKind::RsaPkcs1v15,
            KeyManagementAlgorithm::RSA_OAEP => KeyManagementKind::RsaOaep,
            KeyManagementAlgorithm::A128KW
            | KeyManagementAlgorithm::A192KW
            | KeyManagementAlgorithm::A256KW => KeyManagementKind::AesKeyWrap,
            KeyManagementAlgorithm::ECDH_ES
            | KeyManagementAlgorithm::ECDH_ES_A128KW
            | KeyManagementAlgorithm::ECDH_ES_A192KW
            | KeyManagementAlgorithm::ECDH_ES_A256KW => KeyManagementKind::EcdhEs,
        }
    }

    /// Length of the key-encryption key, in bits.
    ///
    /// 0 for RSA (given by the modulus) and for direct ECDH-ES (given by `enc`).
    pub fn key_bits(&self) -> u32 {
        match self {
            KeyManagementAlgorithm::A128KW | KeyManagementAlgorithm::ECDH_ES_A128KW => 128,
            KeyManagementAlgorithm::A192KW | KeyManagementAlgorithm::ECDH_ES_A192KW => 192,
            KeyManagementAlgorithm::A256KW | KeyManagementAlgorithm::ECDH_ES_A256KW => 256,
            KeyManagementAlgorithm::RSA1_5
            | KeyManagementAlgorithm::RSA_OAEP
            | KeyManagementAlgorithm::ECDH_ES => 0,
        }
    }

    /// Key agreement output is used as the CEK, with no encrypted key.
    pub fn is_direct(&self) -> bool {
        *self == KeyManagementAlgorithm::ECDH_ES
    }
}

/// JWS algorithms usable for signed packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    RS256,
    ES256,
    ES384,
}

impl SignatureAlgorithm {
    pub fn alg_name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RS256 => "RS256",
            SignatureAlgorithm::ES256 => "ES256",
            SignatureAlgorithm::ES384 => "ES384",
        }
    }

    pub fn from_alg_name(name: &str) -> Option<Self> {
        match name {
            "RS256" => Some(SignatureAlgorithm::RS256),
            "ES256" => Some(SignatureAlgorithm::ES256),
            "ES384" => Some(SignatureAlgorithm::ES384),
            _ => None,
        }
    }
}

/// Value of the `alg` header parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    KeyManagement(KeyManagementAlgorithm),
    Signature(SignatureAlgorithm),
}

impl Algorithm {
    pub fn alg_name(&self) -> &'static str {
        match self {
            Algorithm::KeyManagement(alg) => alg.alg_name(),
            Algorithm::Signature(alg) => alg.alg_name(),
        }
    }

    pub fn from_alg_name(name: &str) -> Result<Self, Error> {
        if let Some(alg) = KeyManagementAlgorithm::from_alg_name(name) {
            return Ok(Algorithm::KeyManagement(alg));
        }
        if let Some(alg) = SignatureAlgorithm::from_alg_name(name) {
            return Ok(Algorithm::Signature(alg));
        }
        bail!(JWEError::UnsupportedAlgorithm(name.to_string()))
    }
}

impl From<KeyManagementAlgorithm> for Algorithm {
    fn from(alg: KeyManagementAlgorithm) -> Self {
        Algorithm::KeyManagement(alg)
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Algorithm::Signature(alg)
    }
}

/// Typed view of a JOSE header.
///
/// `apu` and `apv` borrow the decoded bytes from the scratch arena the header
/// was parsed with.
#[derive(Debug, Clone)]
pub struct JoseHeader<'a> {
    pub alg: Option<Algorithm>,
    pub enc: Option<ContentEncryption>,
    pub apu: &'a [u8],
    pub apv: &'a [u8],
    pub recipients: usize,
    pub wire: JWEHeader,
}

impl Default for JoseHeader<'_> {
    fn default() -> Self {
        JoseHeader {
            alg: None,
            enc: None,
            apu: &[],
            apv: &[],
            recipients: 1,
            wire: JWEHeader::default(),
        }
    }
}

impl<'a> JoseHeader<'a> {
    /// A header for an encrypted envelope.
    pub fn new(alg: KeyManagementAlgorithm, enc: ContentEncryption) -> Self {
        JoseHeader {
            alg: Some(alg.into()),
            enc: Some(enc),
            wire: JWEHeader::new(alg.alg_name(), enc.alg_name()),
            ..Default::default()
        }
    }

    /// A header for a signed packet.
    pub fn for_signature(alg: SignatureAlgorithm) -> Self {
        JoseHeader {
            alg: Some(alg.into()),
            ..Default::default()
        }
    }

    /// Parse header JSON. Decoded `apu`/`apv` are stored in `scratch`, and
    /// the rest of the arena is returned.
    pub fn parse(json: &[u8], scratch: Scratch<'a>) -> Result<(Self, Scratch<'a>), Error> {
        let wire: JWEHeader = serde_json::from_slice(json).map_err(|err| {
            tracing::debug!(%err, "JOSE header is not valid JSON");
            JWEError::InvalidJWEFormat
        })?;
        if let Some(crit) = &wire.crit {
            if !crit.is_empty() {
                tracing::debug!(?crit, "JOSE header declares critical extensions");
                bail!(JWEError::UnknownCriticalExtension);
            }
        }
        let alg = wire
            .alg
            .as_deref()
            .map(Algorithm::from_alg_name)
            .transpose()?;
        let enc = wire
            .enc
            .as_deref()
            .map(ContentEncryption::from_alg_name)
            .transpose()?;
        let (apu, scratch) = match wire.apu.as_deref() {
            Some(b64) => scratch.store_b64_decoded(b64)?,
            None => (&[][..], scratch),
        };
        let (apv, scratch) = match wire.apv.as_deref() {
            Some(b64) => scratch.store_b64_decoded(b64)?,
            None => (&[][..], scratch),
        };
        let header = JoseHeader {
            alg,
            enc,
            apu,
            apv,
            recipients: 1,
            wire,
        };
        Ok((header, scratch))
    }

    /// Render the header JSON, taking `kid` from the key if the header has
    /// none.
    pub fn render(&self, key: &JweKey) -> Result<Vec<u8>, Error> {
        let mut wire = self.wire.clone();
        if let Some(alg) = self.alg {
            wire.alg = Some(alg.alg_name().to_string());
        }
        if let Some(enc) = self.enc {
            wire.enc = Some(enc.alg_name().to_string());
        }
        if !self.apu.is_empty() {
            wire.apu = Some(Base64UrlSafeNoPadding::encode_to_string(self.apu)?);
        }
        if !self.apv.is_empty() {
            wire.apv = Some(Base64UrlSafeNoPadding::encode_to_string(self.apv)?);
        }
        if wire.kid.is_none() {
            wire.kid = key.key_id().map(str::to_string);
        }
        wire.to_json()
    }

    /// The key management algorithm, if `alg` names one.
    pub fn key_management(&self) -> Option<KeyManagementAlgorithm> {
        match self.alg {
            Some(Algorithm::KeyManagement(alg)) => Some(alg),
            _ => None,
        }
    }

    /// The signature algorithm, if `alg` names one.
    pub fn signature(&self) -> Option<SignatureAlgorithm> {
        match self.alg {
            Some(Algorithm::Signature(alg)) => Some(alg),
            _ => None,
        }
    }

    /// Name of `alg` for diagnostics.
    pub(crate) fn alg_name(&self) -> &str {
        self.alg
            .map(|alg| alg.alg_name())
            .or_else(|| self.wire.alg.as_deref())
            .unwrap_or("none")
    }

    /// Name of `enc` for diagnostics.
    pub(crate) fn enc_name(&self) -> &str {
        self.enc
            .map(|enc| enc.alg_name())
            .or_else(|| self.wire.enc.as_deref())
            .unwrap_or("none")
    }
}
