//! Template derivation

use super::{CaptureObjectRef, SubIndex};
use dlms_asn1::{AxdrDecoder, AxdrEncoder};
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult, TypeDesc};
use log::debug;

/// Deepest nesting of arrays and structures a captured value may have
pub const MAX_NESTING: usize = 8;

/// Shape of one compact row: one type description per capture object
///
/// On the wire this is a single structure description with one member per
/// capture object. An empty template encodes to zero bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TemplateDescription {
    elements: Vec<TypeDesc>,
}

impl TemplateDescription {
    pub fn new(elements: Vec<TypeDesc>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[TypeDesc] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of leaf payloads in a row of this shape, saturating at `usize::MAX`
    pub fn leaf_count(&self) -> usize {
        self.elements
            .iter()
            .fold(0usize, |total, desc| total.saturating_add(desc.leaf_count()))
    }

    pub fn encode(&self) -> DlmsResult<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let mut encoder = AxdrEncoder::new();
        encoder.encode_type_description(&TypeDesc::Structure(self.elements.clone()))?;
        Ok(encoder.into_bytes())
    }

    /// Parse the wire form produced by [`encode`](Self::encode)
    ///
    /// # Errors
    ///
    /// Returns `MalformedCapture` for anything but a single structure
    /// description with nothing after it, including arrays that repeat an
    /// element without leaves.
    pub fn decode(bytes: &[u8]) -> DlmsResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let mut decoder = AxdrDecoder::new(bytes);
        let desc = decoder
            .decode_type_description()
            .map_err(|e| DlmsError::MalformedCapture(e.to_string()))?;
        if decoder.remaining() > 0 {
            return Err(DlmsError::MalformedCapture(format!(
                "{} bytes after the template description",
                decoder.remaining()
            )));
        }
        match desc {
            TypeDesc::Structure(elements) => Ok(Self { elements }),
            other => Err(DlmsError::MalformedCapture(format!(
                "Template must be a structure, got {}",
                other
            ))),
        }
    }
}

/// Derive the row shape of `refs`
///
/// A reference to a leaf-typed attribute contributes its declared type
/// without reading it. Composite attributes and leaf selections are read
/// once and described from their current value.
///
/// # Errors
///
/// Returns `InvalidConfiguration` when a value cannot be described (nested
/// too deep, arrays of mixed shapes, compact arrays) and the target's error
/// when it cannot be read.
pub async fn derive_template(refs: &[CaptureObjectRef]) -> DlmsResult<TemplateDescription> {
    let mut elements = Vec::with_capacity(refs.len());
    for reference in refs {
        let data_type = reference.resolved_type().await?;
        let desc = if data_type.is_leaf() && reference.sub_index() == SubIndex::Whole {
            TypeDesc::simple(data_type)?
        } else {
            describe(&reference.current_value().await?)?
        };
        elements.push(desc);
    }
    let template = TemplateDescription::new(elements);
    debug!(
        "Derived template with {} elements and {} leaves",
        template.len(),
        template.leaf_count()
    );
    Ok(template)
}

/// Type description of a value
///
/// Every element of an array must have the same shape. An empty array is
/// described as zero `null-data` elements. A non-empty array of elements
/// without leaves (such as empty structures) has no compact form and is
/// rejected.
pub fn describe(value: &DataObject) -> DlmsResult<TypeDesc> {
    let depth = value.depth();
    if depth > MAX_NESTING {
        return Err(DlmsError::InvalidConfiguration(format!(
            "Value is nested {} levels deep, at most {} are supported",
            depth, MAX_NESTING
        )));
    }
    describe_value(value)
}

fn describe_value(value: &DataObject) -> DlmsResult<TypeDesc> {
    match value {
        DataObject::Array(items) => {
            let count = u16::try_from(items.len()).map_err(|_| {
                DlmsError::InvalidConfiguration(format!("Array of {} elements is too long", items.len()))
            })?;
            let Some((first, rest)) = items.split_first() else {
                return Ok(TypeDesc::array(0, TypeDesc::Simple(DataObjectType::NullData)));
            };
            let element = describe_value(first)?;
            if element.is_leafless() {
                return Err(DlmsError::InvalidConfiguration(format!(
                    "Array of {} elements without leaves: {}",
                    count, element
                )));
            }
            for (i, item) in rest.iter().enumerate() {
                if !element.matches(item) {
                    return Err(DlmsError::InvalidConfiguration(format!(
                        "Array element {} does not have the shape {}",
                        i + 1,
                        element
                    )));
                }
            }
            Ok(TypeDesc::array(count, element))
        }
        DataObject::Structure(members) => members
            .iter()
            .map(describe_value)
            .collect::<DlmsResult<Vec<_>>>()
            .map(TypeDesc::Structure),
        DataObject::CompactArray(_) => Err(DlmsError::InvalidConfiguration(
            "Compact arrays cannot be captured".to_string(),
        )),
        leaf => TypeDesc::simple(leaf.get_type())
            .map_err(|e| DlmsError::InvalidConfiguration(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Data, Register, ScalerUnit};
    use dlms_core::ObisCode;
    use std::sync::Arc;

    fn data(value: DataObject) -> Arc<Data> {
        Arc::new(Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), value))
    }

    #[test]
    fn test_describe_nested() {
        let value = DataObject::Structure(vec![
            DataObject::Unsigned8(1),
            DataObject::Array(vec![
                DataObject::Structure(vec![DataObject::Boolean(true), DataObject::OctetString(vec![1])]),
                DataObject::Structure(vec![DataObject::Boolean(false), DataObject::OctetString(vec![])]),
            ]),
        ]);
        let desc = describe(&value).unwrap();
        assert_eq!(
            desc,
            TypeDesc::Structure(vec![
                TypeDesc::Simple(DataObjectType::Unsigned),
                TypeDesc::array(
                    2,
                    TypeDesc::Structure(vec![
                        TypeDesc::Simple(DataObjectType::Boolean),
                        TypeDesc::Simple(DataObjectType::OctetString),
                    ])
                ),
            ])
        );
        assert_eq!(desc.leaf_count(), value.leaf_count());
    }

    #[test]
    fn test_describe_rejects_mixed_array() {
        let value = DataObject::Array(vec![DataObject::Unsigned8(1), DataObject::Unsigned16(1)]);
        assert!(matches!(describe(&value), Err(DlmsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_describe_empty_array() {
        let desc = describe(&DataObject::Array(vec![])).unwrap();
        assert_eq!(desc, TypeDesc::array(0, TypeDesc::Simple(DataObjectType::NullData)));
        assert_eq!(desc.leaf_count(), 0);
    }

    #[test]
    fn test_describe_rejects_arrays_without_leaves() {
        let empty_rows = DataObject::Array(vec![DataObject::Structure(vec![]); 3]);
        assert!(matches!(describe(&empty_rows), Err(DlmsError::InvalidConfiguration(_))));

        let empty_arrays = DataObject::Array(vec![DataObject::Array(vec![]), DataObject::Array(vec![])]);
        assert!(matches!(describe(&empty_arrays), Err(DlmsError::InvalidConfiguration(_))));

        let desc = describe(&DataObject::Structure(vec![])).unwrap();
        assert_eq!(desc, TypeDesc::Structure(vec![]));
    }

    #[test]
    fn test_decode_rejects_unbounded_template() {
        // 1000 x 1000 x 10 empty structures, nothing to read from a row
        let bytes = [0x02, 0x01, 0x01, 0x03, 0xE8, 0x01, 0x03, 0xE8, 0x01, 0x00, 0x0A, 0x02, 0x00];
        assert!(matches!(
            TemplateDescription::decode(&bytes),
            Err(DlmsError::MalformedCapture(_))
        ));
    }

    #[test]
    fn test_leaf_count_saturates() {
        let mut desc = TypeDesc::Simple(DataObjectType::Unsigned);
        for _ in 0..5 {
            desc = TypeDesc::array(u16::MAX, desc);
        }
        let template = TemplateDescription::new(vec![desc.clone(), desc]);
        assert_eq!(template.leaf_count(), usize::MAX);
    }

    #[test]
    fn test_describe_nesting_bound() {
        let mut value = DataObject::Unsigned8(0);
        for _ in 0..MAX_NESTING {
            value = DataObject::Structure(vec![value]);
        }
        assert!(describe(&value).is_ok());
        let too_deep = DataObject::Array(vec![value]);
        assert!(matches!(describe(&too_deep), Err(DlmsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_template_wire_form() {
        let template = TemplateDescription::new(vec![
            TypeDesc::Simple(DataObjectType::DoubleLongUnsigned),
            TypeDesc::array(3, TypeDesc::Simple(DataObjectType::LongUnsigned)),
        ]);
        let bytes = template.encode().unwrap();
        assert_eq!(bytes, vec![0x02, 0x02, 0x06, 0x01, 0x00, 0x03, 0x12]);
        assert_eq!(TemplateDescription::decode(&bytes).unwrap(), template);

        assert!(TemplateDescription::default().encode().unwrap().is_empty());
        assert!(TemplateDescription::decode(&[]).unwrap().is_empty());
        assert!(matches!(
            TemplateDescription::decode(&[0x06]),
            Err(DlmsError::MalformedCapture(_))
        ));
        assert!(matches!(
            TemplateDescription::decode(&[0x02, 0x01, 0x06, 0x06]),
            Err(DlmsError::MalformedCapture(_))
        ));
    }

    #[tokio::test]
    async fn test_derive_template_scalar_and_composite() {
        let register = Arc::new(Register::new(
            ObisCode::new(1, 0, 1, 8, 0, 255),
            DataObject::Unsigned32(1000),
            ScalerUnit::new(-1, 0x1E),
        ));
        let refs = vec![
            CaptureObjectRef::new(register.clone(), 2),
            CaptureObjectRef::new(register.clone(), 3),
            CaptureObjectRef::new(register, 3).with_sub_index(SubIndex::Leaf(0)),
        ];
        let template = derive_template(&refs).await.unwrap();
        assert_eq!(
            template.elements(),
            &[
                TypeDesc::Simple(DataObjectType::DoubleLongUnsigned),
                TypeDesc::Structure(vec![
                    TypeDesc::Simple(DataObjectType::Integer),
                    TypeDesc::Simple(DataObjectType::Enumerate),
                ]),
                TypeDesc::Simple(DataObjectType::Integer),
            ]
        );
        assert_eq!(template.leaf_count(), 4);
    }

    #[tokio::test]
    async fn test_derive_template_is_idempotent() {
        let target = data(DataObject::Array(vec![
            DataObject::Unsigned16(1),
            DataObject::Unsigned16(2),
        ]));
        let refs = vec![CaptureObjectRef::new(target, 2)];
        let first = derive_template(&refs).await.unwrap().encode().unwrap();
        let second = derive_template(&refs).await.unwrap().encode().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_derive_template_empty() {
        let template = derive_template(&[]).await.unwrap();
        assert!(template.is_empty());
        assert_eq!(template.leaf_count(), 0);
    }

    #[tokio::test]
    async fn test_derive_template_missing_leaf() {
        let refs = vec![CaptureObjectRef::new(data(DataObject::Unsigned8(1)), 2)
            .with_sub_index(SubIndex::Leaf(1))];
        assert!(matches!(
            derive_template(&refs).await,
            Err(DlmsError::InvalidConfiguration(_))
        ));
    }
}
