//! COSEM object model for DLMS/COSEM
//!
//! This crate provides the object side of a metering device:
//!
//! - [`CosemObject`]: the dispatcher contract every interface class implements
//! - [`ObjectDescriptor`]: identity plus the per-attribute access controller
//! - [`dispatch`]: access- and version-gated get/set/action, single and bulk
//! - [`ObjectRegistry`]: lookup and default instantiation by logical name
//! - [`capture`]: template derivation, live capture and reconstruction
//! - interface classes: [`Data`], [`Register`], [`Clock`], [`CompactData`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::{CaptureObjectRef, CompactData, CosemObject, Register, ScalerUnit};
//! use dlms_core::{DataObject, ObisCode};
//! use std::sync::Arc;
//!
//! # async fn example() -> dlms_core::DlmsResult<()> {
//! let energy = Arc::new(Register::new(
//!     ObisCode::new(1, 0, 1, 8, 0, 255),
//!     DataObject::Unsigned32(1000),
//!     ScalerUnit::none(),
//! ));
//! let compact = CompactData::with_default_obis();
//! compact
//!     .set_capture_objects(vec![CaptureObjectRef::new(energy, 2)])
//!     .await?;
//! compact.capture().await?;
//! let values = compact.decode_buffer().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use dlms_core::{DataObject, DataObjectType, DlmsResult, ObisCode};
use std::fmt::Debug;

pub mod access;
pub mod capture;
pub mod clock;
pub mod compact_data;
pub mod data;
pub mod descriptor;
pub mod dispatch;
pub mod register;
pub mod registry;
pub mod scaler_unit;

pub use access::{AccessMode, AttributeDescriptor, MethodAccessMode, MethodDescriptor};
pub use capture::{
    capture_snapshot, decode_values, derive_template, CaptureObjectRef, SubIndex,
    TemplateDescription,
};
pub use clock::Clock;
pub use compact_data::{CaptureMethod, CapturePhase, CompactData, CompactDataConfig, CompactRecord};
pub use data::Data;
pub use descriptor::{CaptureObjectDefinition, ObjectDescriptor, ObjectType};
pub use dispatch::{ActionResult, AttributeContext, DataAccessResult, MethodContext};
pub use register::Register;
pub use registry::ObjectRegistry;
pub use scaler_unit::ScalerUnit;

/// Version argument that selects the newest version a kind knows
pub const LATEST_VERSION: u8 = u8::MAX;

/// Dispatcher contract of a COSEM interface class
///
/// Implementations return `AccessDenied` for attribute and method indices
/// they do not define and never panic on them, so that bulk operations can
/// continue past a single failed index. Access modes and version gating are
/// applied by [`dispatch`]; the methods here perform the raw operation.
///
/// Attribute 1 is the logical name for every class and is handled by the
/// [`ObjectDescriptor`].
#[async_trait]
pub trait CosemObject: Send + Sync + Debug {
    /// Identity and access table of this instance
    fn descriptor(&self) -> &ObjectDescriptor;

    /// Number of attributes defined at `version`
    ///
    /// [`LATEST_VERSION`] returns the count of the newest known version.
    fn attribute_count(&self, version: u8) -> u8;

    /// Number of methods defined at `version`
    fn method_count(&self, version: u8) -> u8;

    /// Wire type of attribute `attribute_id`
    async fn data_type(&self, attribute_id: u8) -> DlmsResult<DataObjectType>;

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject>;

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()>;

    /// Execute method `method_id`, returning its optional result data
    async fn invoke_method(
        &self,
        method_id: u8,
        parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>>;

    fn object_type(&self) -> ObjectType {
        self.descriptor().object_type()
    }

    fn class_id(&self) -> u16 {
        self.descriptor().class_id()
    }

    fn logical_name(&self) -> Option<ObisCode> {
        self.descriptor().logical_name()
    }

    fn version(&self) -> u8 {
        self.descriptor().version()
    }
}

/// Error for an index a kind does not define
pub(crate) fn no_such_attribute(object: &dyn CosemObject, attribute_id: u8) -> dlms_core::DlmsError {
    dlms_core::DlmsError::AccessDenied(format!(
        "{} has no attribute {}",
        object.object_type(),
        attribute_id
    ))
}

pub(crate) fn no_such_method(object: &dyn CosemObject, method_id: u8) -> dlms_core::DlmsError {
    dlms_core::DlmsError::AccessDenied(format!(
        "{} has no method {}",
        object.object_type(),
        method_id
    ))
}
