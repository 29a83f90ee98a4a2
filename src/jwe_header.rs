use serde::{Deserialize, Serialize};

/// JOSE header as it appears on the wire.
///
/// Field order is the rendering order. Values are kept as strings here; the
/// typed view is [`JoseHeader`](crate::jose::JoseHeader).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JWEHeader {
    /// Key management algorithm, or the JWS algorithm of a signed packet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
    /// Sender's ephemeral EC key as a public JWK
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<serde_json::Value>,
    /// Agreement PartyUInfo, base64url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,
    /// Agreement PartyVInfo, base64url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl JWEHeader {
    pub fn new(alg: impl Into<String>, enc: impl Into<String>) -> Self {
        JWEHeader {
            alg: Some(alg.into()),
            enc: Some(enc.into()),
            ..Default::default()
        }
    }

    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// `apu`/`apv` from raw party info.
    pub fn with_agreement_info(mut self, apu: &[u8], apv: &[u8]) -> Self {
        use ct_codecs::{Base64UrlSafeNoPadding, Encoder};

        self.apu = Base64UrlSafeNoPadding::encode_to_string(apu).ok();
        self.apv = Base64UrlSafeNoPadding::encode_to_string(apv).ok();
        self
    }

    pub fn to_json(&self) -> Result<Vec<u8>, crate::error::Error> {
        Ok(serde_json::to_vec(self)?)
    }
}
