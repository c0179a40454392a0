//! Compact data capture engine
//!
//! A list of [`CaptureObjectRef`]s is turned into a [`TemplateDescription`]
//! by [`derive_template`], captured into a tag-free row by
//! [`capture_snapshot`] and read back by [`decode_values`]. All three walk
//! the references in list order and each value's leaves depth-first; the
//! template and the row are only meaningful together.

mod reconstruct;
mod snapshot;
mod template;

pub use reconstruct::decode_values;
pub use snapshot::capture_snapshot;
pub use template::{derive_template, describe, TemplateDescription, MAX_NESTING};

use crate::descriptor::CaptureObjectDefinition;
use crate::dispatch::ensure_readable;
use crate::CosemObject;
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult};
use std::sync::Arc;

/// Part of an attribute value a capture object selects
///
/// `Leaf(n)` is the n-th leaf (0-based) in depth-first order. On the wire
/// `data_index` 0 means the whole value and `n >= 1` means `Leaf(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubIndex {
    #[default]
    Whole,
    Leaf(u16),
}

impl SubIndex {
    pub fn from_data_index(data_index: u16) -> Self {
        match data_index {
            0 => SubIndex::Whole,
            n => SubIndex::Leaf(n - 1),
        }
    }

    pub fn data_index(&self) -> u16 {
        match self {
            SubIndex::Whole => 0,
            SubIndex::Leaf(n) => n.saturating_add(1),
        }
    }

    /// Narrow `value` to the selected part
    pub fn select(&self, value: DataObject) -> DlmsResult<DataObject> {
        match self {
            SubIndex::Whole => Ok(value),
            SubIndex::Leaf(n) => value.leaf_at(*n as usize).cloned().ok_or_else(|| {
                DlmsError::InvalidConfiguration(format!(
                    "Leaf {} does not exist in a value with {} leaves",
                    n,
                    value.leaf_count()
                ))
            }),
        }
    }
}

/// One attribute (or one leaf of it) captured into a compact row
#[derive(Debug, Clone)]
pub struct CaptureObjectRef {
    target: Arc<dyn CosemObject>,
    attribute_index: u8,
    sub_index: SubIndex,
}

impl CaptureObjectRef {
    /// Reference the whole value of `attribute_index`
    pub fn new(target: Arc<dyn CosemObject>, attribute_index: u8) -> Self {
        Self {
            target,
            attribute_index,
            sub_index: SubIndex::Whole,
        }
    }

    pub fn with_sub_index(mut self, sub_index: SubIndex) -> Self {
        self.sub_index = sub_index;
        self
    }

    pub fn target(&self) -> &Arc<dyn CosemObject> {
        &self.target
    }

    pub fn attribute_index(&self) -> u8 {
        self.attribute_index
    }

    pub fn sub_index(&self) -> SubIndex {
        self.sub_index
    }

    /// Wire form of this reference
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` while the target's logical name is unknown.
    pub fn definition(&self) -> DlmsResult<CaptureObjectDefinition> {
        let logical_name = self.target.logical_name().ok_or_else(|| {
            DlmsError::InvalidConfiguration(format!(
                "Capture target {} has no logical name",
                self.target.object_type()
            ))
        })?;
        Ok(CaptureObjectDefinition {
            class_id: self.target.class_id(),
            logical_name,
            attribute_index: self.attribute_index,
            data_index: self.sub_index.data_index(),
        })
    }

    /// Current value of the referenced part
    ///
    /// Goes through the target's access table but does not mark the
    /// attribute as read: capturing is not a client read.
    pub async fn current_value(&self) -> DlmsResult<DataObject> {
        ensure_readable(self.target.as_ref(), self.attribute_index)?;
        let value = self.target.get_attribute(self.attribute_index).await?;
        self.sub_index.select(value)
    }

    /// Declared type of the referenced attribute, per-instance override first
    pub async fn resolved_type(&self) -> DlmsResult<DataObjectType> {
        match self.target.descriptor().declared_type(self.attribute_index) {
            Some(data_type) => Ok(data_type),
            None => self.target.data_type(self.attribute_index).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessMode, Data, Register, ScalerUnit};
    use dlms_core::ObisCode;

    fn nested() -> DataObject {
        DataObject::Structure(vec![
            DataObject::Unsigned8(1),
            DataObject::Array(vec![DataObject::Unsigned16(2), DataObject::Unsigned16(3)]),
        ])
    }

    #[test]
    fn test_sub_index_wire_form() {
        assert_eq!(SubIndex::from_data_index(0), SubIndex::Whole);
        assert_eq!(SubIndex::from_data_index(1), SubIndex::Leaf(0));
        assert_eq!(SubIndex::Leaf(4).data_index(), 5);
        assert_eq!(SubIndex::Whole.data_index(), 0);
    }

    #[test]
    fn test_sub_index_select() {
        assert_eq!(SubIndex::Whole.select(nested()).unwrap(), nested());
        assert_eq!(SubIndex::Leaf(0).select(nested()).unwrap(), DataObject::Unsigned8(1));
        assert_eq!(SubIndex::Leaf(2).select(nested()).unwrap(), DataObject::Unsigned16(3));
        assert!(matches!(
            SubIndex::Leaf(3).select(nested()),
            Err(DlmsError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_capture_object_ref_reads_without_marking() {
        let register = Arc::new(Register::new(
            ObisCode::new(1, 0, 1, 8, 0, 255),
            DataObject::Unsigned32(7),
            ScalerUnit::none(),
        ));
        let reference = CaptureObjectRef::new(register.clone(), 3).with_sub_index(SubIndex::Leaf(1));
        assert_eq!(reference.current_value().await.unwrap(), DataObject::Enumerate(0));
        assert!(!register.descriptor().is_already_read(3));

        let definition = reference.definition().unwrap();
        assert_eq!(definition.class_id, 3);
        assert_eq!(definition.data_index, 2);
    }

    #[tokio::test]
    async fn test_capture_object_ref_respects_access() {
        let data = Arc::new(
            Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), DataObject::Unsigned8(1))
                .with_access_mode(2, AccessMode::NoAccess),
        );
        let reference = CaptureObjectRef::new(data, 2);
        assert!(matches!(
            reference.current_value().await,
            Err(DlmsError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_resolved_type_prefers_override() {
        let data = Arc::new(Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), DataObject::Null));
        let reference = CaptureObjectRef::new(data.clone(), 2);
        assert_eq!(reference.resolved_type().await.unwrap(), DataObjectType::NullData);
        data.descriptor()
            .set_data_type(2, Some(DataObjectType::DoubleLongUnsigned));
        assert_eq!(
            reference.resolved_type().await.unwrap(),
            DataObjectType::DoubleLongUnsigned
        );
    }
}
