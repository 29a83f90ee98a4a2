#[allow(unused)]
pub use anyhow::{anyhow, bail, ensure, Error};

#[derive(Debug, thiserror::Error)]
pub enum JWEError {
    #[error("Required header fields are missing")]
    InvalidState,
    #[error("Unsupported algorithm combination: {alg} / {enc}")]
    UnsupportedAlgorithmCombination { alg: String, enc: String },
    #[error("Unsupported key management algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Unsupported content encryption algorithm: {0}")]
    UnsupportedContentEncryption(String),
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Cryptographic primitive failure")]
    CryptoFailure,
    #[error("Output buffer too small")]
    BufferTooSmall,
    #[error("Compact serialization can't represent multiple recipients")]
    MultiRecipientNotSupported,
    #[error("Key export failed")]
    KeyExportFailed,
    #[error("Invalid JWE format")]
    InvalidJWEFormat,
    #[error("JWE header too large")]
    HeaderTooLarge,
    #[error("Token is too long")]
    TokenTooLong,
    #[error("Unknown critical header extension")]
    UnknownCriticalExtension,
    #[error("JWE key identifier mismatch")]
    KeyIdentifierMismatch,
    #[error("Missing JWE key identifier")]
    MissingJWTKeyIdentifier,
    #[error("Key doesn't match the algorithm")]
    InvalidKey,
    #[error("Missing ephemeral public key")]
    MissingEphemeralKey,
    #[error("Invalid ephemeral public key")]
    InvalidEphemeralKey,
    #[error("Unsupported RSA modulus")]
    UnsupportedRSAModulus,
    #[error("Key is too weak")]
    WeakKey,
}

/// Returns `true` if `err` carries the given `JWEError` variant.
pub fn is_jwe_error(err: &Error, expected: &JWEError) -> bool {
    matches!(err.downcast_ref::<JWEError>(), Some(e) if std::mem::discriminant(e) == std::mem::discriminant(expected))
}
