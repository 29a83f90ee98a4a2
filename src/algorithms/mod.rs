pub mod aes_kw;
pub mod content;
pub mod ecdh_es;
pub mod jws;
pub mod rsa;

pub use self::aes_kw::AesKwKey;
pub use self::content::*;
pub use self::jws::JwsSigner;
pub use self::rsa::RsaPadding;
