//! A-XDR codec for DLMS/COSEM values
//!
//! Tagged encode/decode of [`DataObject`](dlms_core::DataObject) values,
//! payload-only encode/decode keyed by a known tag, the type-description
//! wire format and the compact (tag-free) row encoding used by compact data.

pub mod axdr;

pub use axdr::{
    decode, decode_compact, encode, encode_compact, pack_compact_array, unpack_compact_array,
    AxdrDecoder, AxdrEncoder, LengthEncoding,
};
pub use dlms_core::{DlmsError, DlmsResult};
