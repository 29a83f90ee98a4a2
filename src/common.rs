/// Default upper bound on the size of an encoded protected header.
pub const MAX_JWE_HEADER_LENGTH: usize = 8192;

/// Options applied when splitting a received envelope.
#[derive(Clone, Debug, Default)]
pub struct DecryptionOptions {
    /// Maximum serialized envelope length to accept
    pub max_token_length: Option<usize>,

    /// Maximum length of the base64url-encoded protected header
    pub max_header_length: Option<usize>,

    /// Require a specific key identifier to be present
    pub required_key_id: Option<String>,
}

/// 32-bit big-endian encoding.
#[inline]
pub fn be32(i: u32) -> [u8; 4] {
    [(i >> 24) as u8, (i >> 16) as u8, (i >> 8) as u8, i as u8]
}

/// 64-bit big-endian encoding.
#[inline]
pub fn be64(c: u64) -> [u8; 8] {
    let mut p8 = [0u8; 8];
    for (n, b) in p8.iter_mut().enumerate() {
        *b = (c >> (56 - 8 * n)) as u8;
    }
    p8
}
