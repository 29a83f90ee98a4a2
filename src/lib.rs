#![forbid(unsafe_code)]

pub mod algorithms;
pub mod common;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod jose;
pub mod jwe_header;
pub mod key;
pub mod map;
pub mod packet;
pub mod scratch;
pub mod serialization;

pub use serde_json;

pub mod prelude {
    pub use crate::algorithms::{AesKwKey, ContentEncryption, JwsSigner, RsaPadding};
    pub use crate::common::*;
    pub use crate::context::JweContext;
    pub use crate::dispatch::Pipeline;
    pub use crate::error::{Error, JWEError};
    pub use crate::jose::*;
    pub use crate::jwe_header::JWEHeader;
    pub use crate::key::{EcCurve, JweKey};
    pub use crate::map::{ByteRangeMap, Slot};
    pub use crate::scratch::Scratch;
}
