//! Keys handed to a [`JweContext`](crate::context::JweContext).
//!
//! A [`JweKey`] is owned by the caller and borrowed by the context for the
//! duration of one operation. The engine only needs two things from it: the
//! raw material for the selected pipeline, and a JWK export.

use boring::bn::BigNumRef;
use boring::pkey::{Private, Public};
use boring::rsa::Rsa;
use ct_codecs::{Base64UrlSafeNoPadding, Encoder};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{thread_rng, RngCore};
use serde_json::{json, Map, Value};
use zeroize::Zeroize;

use crate::algorithms::rsa::validate_key_size;
use crate::error::*;

/// Supported elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
}

impl EcCurve {
    /// The JWK "crv" value.
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(EcCurve::P256),
            "P-384" => Some(EcCurve::P384),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub(crate) enum KeyMaterial {
    RsaPrivate(Rsa<Private>),
    RsaPublic(Rsa<Public>),
    P256 {
        sk: Option<p256::SecretKey>,
        pk: p256::PublicKey,
    },
    P384 {
        sk: Option<p384::SecretKey>,
        pk: p384::PublicKey,
    },
    Oct(Vec<u8>),
}

/// An RSA, EC or symmetric key, with an optional key identifier.
#[derive(Clone)]
pub struct JweKey {
    pub(crate) material: KeyMaterial,
    key_id: Option<String>,
}

impl std::fmt::Debug for JweKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JweKey")
            .field("kty", &self.key_type())
            .field("key_id", &self.key_id)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

impl Drop for JweKey {
    fn drop(&mut self) {
        if let KeyMaterial::Oct(k) = &mut self.material {
            k.zeroize();
        }
    }
}

impl JweKey {
    fn from_material(material: KeyMaterial) -> Self {
        JweKey {
            material,
            key_id: None,
        }
    }

    /// Load an RSA key from PEM. Private keys are tried first, then SPKI and
    /// PKCS#1 public keys.
    pub fn rsa_from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        if let Ok(sk) = Rsa::<Private>::private_key_from_pem(pem.as_bytes()) {
            return Self::rsa_private(sk);
        }
        let pk = Rsa::<Public>::public_key_from_pem(pem.as_bytes())
            .or_else(|_| Rsa::<Public>::public_key_from_pem_pkcs1(pem.as_bytes()))
            .map_err(|_| JWEError::InvalidKey)?;
        validate_key_size(pk.size() * 8)?;
        Ok(Self::from_material(KeyMaterial::RsaPublic(pk)))
    }

    /// Load an RSA key from DER.
    pub fn rsa_from_der(der: &[u8]) -> Result<Self, Error> {
        if let Ok(sk) = Rsa::<Private>::private_key_from_der(der) {
            return Self::rsa_private(sk);
        }
        let pk = Rsa::<Public>::public_key_from_der(der)
            .or_else(|_| Rsa::<Public>::public_key_from_der_pkcs1(der))
            .map_err(|_| JWEError::InvalidKey)?;
        validate_key_size(pk.size() * 8)?;
        Ok(Self::from_material(KeyMaterial::RsaPublic(pk)))
    }

    fn rsa_private(sk: Rsa<Private>) -> Result<Self, Error> {
        if !sk.check_key()? {
            bail!(JWEError::InvalidKey);
        }
        validate_key_size(sk.size() * 8)?;
        Ok(Self::from_material(KeyMaterial::RsaPrivate(sk)))
    }

    /// Generate a new RSA key pair.
    pub fn generate_rsa(modulus_bits: usize) -> Result<Self, Error> {
        match modulus_bits {
            2048 | 3072 | 4096 => {}
            _ => bail!(JWEError::UnsupportedRSAModulus),
        };
        let sk = Rsa::<Private>::generate(modulus_bits as u32)?;
        Ok(Self::from_material(KeyMaterial::RsaPrivate(sk)))
    }

    /// Create an EC key pair from a raw private scalar.
    pub fn ec_from_secret_bytes(curve: EcCurve, d: &[u8]) -> Result<Self, Error> {
        let material = match curve {
            EcCurve::P256 => {
                let sk = p256::SecretKey::from_slice(d).map_err(|_| JWEError::InvalidKey)?;
                KeyMaterial::P256 {
                    pk: sk.public_key(),
                    sk: Some(sk),
                }
            }
            EcCurve::P384 => {
                let sk = p384::SecretKey::from_slice(d).map_err(|_| JWEError::InvalidKey)?;
                KeyMaterial::P384 {
                    pk: sk.public_key(),
                    sk: Some(sk),
                }
            }
        };
        Ok(Self::from_material(material))
    }

    /// Create an EC public key from SEC1 bytes (compressed or uncompressed).
    pub fn ec_from_public_bytes(curve: EcCurve, sec1: &[u8]) -> Result<Self, Error> {
        let material = match curve {
            EcCurve::P256 => KeyMaterial::P256 {
                sk: None,
                pk: p256::PublicKey::from_sec1_bytes(sec1).map_err(|_| JWEError::InvalidKey)?,
            },
            EcCurve::P384 => KeyMaterial::P384 {
                sk: None,
                pk: p384::PublicKey::from_sec1_bytes(sec1).map_err(|_| JWEError::InvalidKey)?,
            },
        };
        Ok(Self::from_material(material))
    }

    /// Generate a new EC key pair.
    pub fn generate_ec(curve: EcCurve) -> Self {
        let material = match curve {
            EcCurve::P256 => {
                let sk = p256::SecretKey::random(&mut thread_rng());
                KeyMaterial::P256 {
                    pk: sk.public_key(),
                    sk: Some(sk),
                }
            }
            EcCurve::P384 => {
                let sk = p384::SecretKey::random(&mut thread_rng());
                KeyMaterial::P384 {
                    pk: sk.public_key(),
                    sk: Some(sk),
                }
            }
        };
        Self::from_material(material)
    }

    /// Create a symmetric key from raw bytes.
    pub fn symmetric(key: &[u8]) -> Self {
        Self::from_material(KeyMaterial::Oct(key.to_vec()))
    }

    /// Generate a random symmetric key of `len` bytes.
    pub fn generate_symmetric(len: usize) -> Self {
        let mut key = vec![0u8; len];
        thread_rng().fill_bytes(&mut key);
        Self::from_material(KeyMaterial::Oct(key))
    }

    /// Set the key ID.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Get the key ID.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// The JWK "kty" value.
    pub fn key_type(&self) -> &'static str {
        match &self.material {
            KeyMaterial::RsaPrivate(_) | KeyMaterial::RsaPublic(_) => "RSA",
            KeyMaterial::P256 { .. } | KeyMaterial::P384 { .. } => "EC",
            KeyMaterial::Oct(_) => "oct",
        }
    }

    /// Whether private (or secret) material is present.
    pub fn is_private(&self) -> bool {
        match &self.material {
            KeyMaterial::RsaPrivate(_) | KeyMaterial::Oct(_) => true,
            KeyMaterial::RsaPublic(_) => false,
            KeyMaterial::P256 { sk, .. } => sk.is_some(),
            KeyMaterial::P384 { sk, .. } => sk.is_some(),
        }
    }

    /// The public half of an asymmetric key.
    pub fn public_key(&self) -> Result<JweKey, Error> {
        let material = match &self.material {
            KeyMaterial::RsaPrivate(sk) => KeyMaterial::RsaPublic(Rsa::<Public>::from_public_components(
                sk.n().to_owned()?,
                sk.e().to_owned()?,
            )?),
            KeyMaterial::RsaPublic(pk) => KeyMaterial::RsaPublic(pk.clone()),
            KeyMaterial::P256 { pk, .. } => KeyMaterial::P256 { sk: None, pk: *pk },
            KeyMaterial::P384 { pk, .. } => KeyMaterial::P384 { sk: None, pk: *pk },
            KeyMaterial::Oct(_) => bail!(JWEError::InvalidKey),
        };
        Ok(JweKey {
            material,
            key_id: self.key_id.clone(),
        })
    }

    /// Export the key as a JWK JSON object.
    ///
    /// With `private` set, the private parameters are included, which fails
    /// for public-only keys. Symmetric keys can only be exported privately.
    pub fn export(&self, private: bool) -> Result<String, Error> {
        let mut jwk = match &self.material {
            KeyMaterial::RsaPrivate(sk) => {
                let mut jwk = rsa_public_jwk(sk.n(), sk.e());
                if private {
                    jwk.insert("d".to_string(), b64_value(&sk.d().to_vec())?);
                    let crt = [
                        ("p", sk.p()),
                        ("q", sk.q()),
                        ("dp", sk.dmp1()),
                        ("dq", sk.dmq1()),
                        ("qi", sk.iqmp()),
                    ];
                    for (name, value) in crt.iter() {
                        let value = value.ok_or(JWEError::KeyExportFailed)?;
                        jwk.insert(name.to_string(), b64_value(&value.to_vec())?);
                    }
                }
                jwk
            }
            KeyMaterial::RsaPublic(pk) => {
                ensure!(!private, JWEError::KeyExportFailed);
                rsa_public_jwk(pk.n(), pk.e())
            }
            KeyMaterial::P256 { sk, pk } => {
                let point = pk.to_encoded_point(false);
                let d = match (private, sk) {
                    (false, _) => None,
                    (true, Some(sk)) => Some(sk.to_bytes().to_vec()),
                    (true, None) => bail!(JWEError::KeyExportFailed),
                };
                ec_jwk(EcCurve::P256, point.x(), point.y(), d)?
            }
            KeyMaterial::P384 { sk, pk } => {
                let point = pk.to_encoded_point(false);
                let d = match (private, sk) {
                    (false, _) => None,
                    (true, Some(sk)) => Some(sk.to_bytes().to_vec()),
                    (true, None) => bail!(JWEError::KeyExportFailed),
                };
                ec_jwk(EcCurve::P384, point.x(), point.y(), d)?
            }
            KeyMaterial::Oct(k) => {
                ensure!(private, JWEError::KeyExportFailed);
                let mut jwk = Map::new();
                jwk.insert("kty".to_string(), json!("oct"));
                jwk.insert("k".to_string(), b64_value(k)?);
                jwk
            }
        };
        if let Some(kid) = &self.key_id {
            jwk.insert("kid".to_string(), json!(kid));
        }
        Ok(serde_json::to_string(&Value::Object(jwk)).map_err(|_| JWEError::KeyExportFailed)?)
    }
}

fn b64_value(bytes: &[u8]) -> Result<Value, Error> {
    Ok(Value::String(
        Base64UrlSafeNoPadding::encode_to_string(bytes).map_err(|_| JWEError::KeyExportFailed)?,
    ))
}

fn rsa_public_jwk(n: &BigNumRef, e: &BigNumRef) -> Map<String, Value> {
    let mut jwk = Map::new();
    jwk.insert("kty".to_string(), json!("RSA"));
    jwk.insert(
        "n".to_string(),
        json!(Base64UrlSafeNoPadding::encode_to_string(n.to_vec()).unwrap_or_default()),
    );
    jwk.insert(
        "e".to_string(),
        json!(Base64UrlSafeNoPadding::encode_to_string(e.to_vec()).unwrap_or_default()),
    );
    jwk
}

fn ec_jwk<X: AsRef<[u8]>>(
    curve: EcCurve,
    x: Option<X>,
    y: Option<X>,
    mut d: Option<Vec<u8>>,
) -> Result<Map<String, Value>, Error> {
    let x = x.ok_or(JWEError::KeyExportFailed)?;
    let y = y.ok_or(JWEError::KeyExportFailed)?;
    let mut jwk = Map::new();
    jwk.insert("kty".to_string(), json!("EC"));
    jwk.insert("crv".to_string(), json!(curve.name()));
    jwk.insert("x".to_string(), b64_value(x.as_ref())?);
    jwk.insert("y".to_string(), b64_value(y.as_ref())?);
    if let Some(d) = d.as_mut() {
        jwk.insert("d".to_string(), b64_value(d)?);
        d.zeroize();
    }
    Ok(jwk)
}
