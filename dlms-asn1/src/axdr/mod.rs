//! A-XDR encoding/decoding module

pub mod compact;
pub mod decoder;
pub mod encoder;
pub mod types;

pub use compact::{decode_compact, encode_compact, pack_compact_array, unpack_compact_array};
pub use decoder::{decode, AxdrDecoder};
pub use encoder::{encode, AxdrEncoder};
pub use types::LengthEncoding;
