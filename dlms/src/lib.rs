//! DLMS/COSEM object model and compact data capture
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `dlms-core`: error taxonomy, OBIS codes and the `DataObject` value model
//! - `dlms-asn1`: A-XDR encoding/decoding, including the compact row codec
//! - `dlms-interface`: COSEM interface classes, access control, dispatch
//!   and the compact data capture engine
//!
//! # Usage
//!
//! ```no_run
//! use dlms::interface::{CaptureObjectRef, CompactData, Register, ScalerUnit};
//! use dlms::{DataObject, ObisCode};
//! use std::sync::Arc;
//!
//! # async fn example() -> dlms::DlmsResult<()> {
//! let energy = Arc::new(Register::new(
//!     ObisCode::new(1, 0, 1, 8, 0, 255),
//!     DataObject::Unsigned32(1000),
//!     ScalerUnit::none(),
//! ));
//! let compact = CompactData::with_default_obis();
//! compact.set_capture_objects(vec![CaptureObjectRef::new(energy, 2)]).await?;
//! compact.capture().await?;
//! if let Some(record) = compact.record().await? {
//!     assert_eq!(record.decode_values()?, vec![DataObject::Unsigned32(1000)]);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use dlms_core::{DlmsError, DlmsResult, ObisCode};
pub use dlms_core::datatypes::*;

// Re-export the A-XDR codec
pub mod axdr {
    pub use dlms_asn1::*;
}

// Re-export interface classes
pub mod interface {
    pub use dlms_interface::*;
}
