//! Core types for the DLMS/COSEM object model
//!
//! This crate provides the error taxonomy, OBIS logical names and the
//! tagged value union shared by the codec and the interface classes.

pub mod datatypes;
pub mod error;
pub mod obis_code;

pub use datatypes::*;
pub use error::{DlmsError, DlmsResult};
pub use obis_code::ObisCode;
