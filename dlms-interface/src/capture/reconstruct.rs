//! Reconstruction of captured values

use super::TemplateDescription;
use dlms_asn1::{decode_compact, AxdrDecoder};
use dlms_core::{DataObject, DlmsError, DlmsResult};

/// Decode one compact row back into one value per template element
///
/// # Errors
///
/// Returns `MalformedCapture` when `buffer` ends before the template is
/// satisfied or has bytes left over after it. No partial result is returned.
pub fn decode_values(template: &TemplateDescription, buffer: &[u8]) -> DlmsResult<Vec<DataObject>> {
    let mut decoder = AxdrDecoder::new(buffer);
    let values = template
        .elements()
        .iter()
        .map(|desc| decode_compact(desc, &mut decoder))
        .collect::<DlmsResult<Vec<_>>>()?;
    if decoder.remaining() > 0 {
        return Err(DlmsError::MalformedCapture(format!(
            "{} bytes left after decoding {} values",
            decoder.remaining(),
            values.len()
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlms_core::{DataObjectType, TypeDesc};

    fn two_leaf_template() -> TemplateDescription {
        TemplateDescription::new(vec![
            TypeDesc::Simple(DataObjectType::DoubleLongUnsigned),
            TypeDesc::Simple(DataObjectType::LongInteger),
        ])
    }

    #[test]
    fn test_decode_values() {
        let values = decode_values(&two_leaf_template(), &[0, 0, 0, 42, 0xFF, 0xFE]).unwrap();
        assert_eq!(values, vec![DataObject::Unsigned32(42), DataObject::Integer16(-2)]);
    }

    #[test]
    fn test_buffer_one_byte_short() {
        let err = decode_values(&two_leaf_template(), &[0, 0, 0, 42, 0xFF]).unwrap_err();
        assert!(matches!(err, DlmsError::MalformedCapture(_)));
    }

    #[test]
    fn test_buffer_with_trailing_bytes() {
        let err = decode_values(&two_leaf_template(), &[0, 0, 0, 42, 0xFF, 0xFE, 0x00]).unwrap_err();
        assert!(matches!(err, DlmsError::MalformedCapture(_)));
    }

    #[test]
    fn test_empty_template_needs_empty_buffer() {
        let template = TemplateDescription::default();
        assert!(decode_values(&template, &[]).unwrap().is_empty());
        assert!(decode_values(&template, &[0x01]).is_err());
    }

    #[test]
    fn test_template_without_leaves_is_rejected() {
        let template = TemplateDescription::new(vec![TypeDesc::array(
            1000,
            TypeDesc::array(1000, TypeDesc::Structure(vec![])),
        )]);
        let err = decode_values(&template, &[]).unwrap_err();
        assert!(matches!(err, DlmsError::MalformedCapture(_)));

        let empty = TemplateDescription::new(vec![TypeDesc::array(0, TypeDesc::Structure(vec![]))]);
        assert_eq!(decode_values(&empty, &[]).unwrap(), vec![DataObject::Array(vec![])]);
    }

    #[test]
    fn test_decode_array_of_structures() {
        let template = TemplateDescription::new(vec![TypeDesc::array(
            2,
            TypeDesc::Structure(vec![
                TypeDesc::Simple(DataObjectType::Unsigned),
                TypeDesc::Simple(DataObjectType::NullData),
            ]),
        )]);
        let values = decode_values(&template, &[7, 0, 8, 0]).unwrap();
        assert_eq!(
            values,
            vec![DataObject::Array(vec![
                DataObject::Structure(vec![DataObject::Unsigned8(7), DataObject::Null]),
                DataObject::Structure(vec![DataObject::Unsigned8(8), DataObject::Null]),
            ])]
        );
    }
}
