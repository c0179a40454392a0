//! Compact (tag-free) encoding against a type description
//!
//! A compact row carries only leaf payloads. The type description supplies
//! every tag and container count, so encoder and decoder must visit leaves
//! in the same depth-first order. A `null-data` leaf is written as a single
//! zero byte so that every leaf occupies at least one byte.

use crate::axdr::decoder::AxdrDecoder;
use crate::axdr::encoder::AxdrEncoder;
use dlms_core::datatypes::{CompactArray, DataObject, DataObjectType, TypeDesc};
use dlms_core::{DlmsError, DlmsResult};

const NULL_MARKER: u8 = 0x00;

/// Append the leaf payloads of `value`, shaped by `desc`
///
/// # Errors
///
/// Returns `InvalidConfiguration` when `value` does not have the shape
/// `desc` describes. Nothing is appended in that case.
pub fn encode_compact(desc: &TypeDesc, value: &DataObject, encoder: &mut AxdrEncoder) -> DlmsResult<()> {
    if !desc.matches(value) {
        return Err(DlmsError::InvalidConfiguration(format!(
            "Value of type {:?} does not match description {}",
            value.get_type(),
            desc
        )));
    }
    encode_matched(desc, value, encoder)
}

fn encode_matched(desc: &TypeDesc, value: &DataObject, encoder: &mut AxdrEncoder) -> DlmsResult<()> {
    match (desc, value) {
        (TypeDesc::Simple(DataObjectType::NullData), _) => {
            encoder.encode_u8(NULL_MARKER);
            Ok(())
        }
        (TypeDesc::Simple(_), leaf) => encoder.encode_payload(leaf),
        (TypeDesc::Array { element, .. }, DataObject::Array(items)) => items
            .iter()
            .try_for_each(|item| encode_matched(element, item, encoder)),
        (TypeDesc::Structure(members), DataObject::Structure(items)) => members
            .iter()
            .zip(items)
            .try_for_each(|(member, item)| encode_matched(member, item, encoder)),
        _ => Err(DlmsError::InvalidConfiguration(format!(
            "Value does not match description {}",
            desc
        ))),
    }
}

/// Read one value shaped by `desc` from `decoder`
///
/// # Errors
///
/// Returns `MalformedCapture` when the bytes run out before `desc` is
/// satisfied, a leaf payload is invalid or an array repeats an element
/// without leaves.
pub fn decode_compact(desc: &TypeDesc, decoder: &mut AxdrDecoder<'_>) -> DlmsResult<DataObject> {
    match desc {
        TypeDesc::Simple(DataObjectType::NullData) => {
            let marker = decoder.decode_fixed_bytes(1).map_err(malformed)?;
            if marker != [NULL_MARKER] {
                return Err(DlmsError::MalformedCapture(format!(
                    "Expected null marker at offset {}, found 0x{:02X}",
                    decoder.position() - 1,
                    marker[0]
                )));
            }
            Ok(DataObject::Null)
        }
        TypeDesc::Simple(data_type) => decoder.decode_value(*data_type).map_err(malformed),
        TypeDesc::Array { count, element } if *count > 0 && element.is_leafless() => {
            Err(DlmsError::MalformedCapture(format!(
                "Array of {} elements without leaves: {}",
                count, element
            )))
        }
        TypeDesc::Array { count, element } => (0..*count)
            .map(|_| decode_compact(element, decoder))
            .collect::<DlmsResult<Vec<_>>>()
            .map(DataObject::Array),
        TypeDesc::Structure(members) => members
            .iter()
            .map(|member| decode_compact(member, decoder))
            .collect::<DlmsResult<Vec<_>>>()
            .map(DataObject::Structure),
    }
}

fn malformed(err: DlmsError) -> DlmsError {
    match err {
        DlmsError::MalformedCapture(_) => err,
        other => DlmsError::MalformedCapture(other.to_string()),
    }
}

/// Pack values of one shape into a compact array
pub fn pack_compact_array(element: TypeDesc, values: &[DataObject]) -> DlmsResult<CompactArray> {
    let mut encoder = AxdrEncoder::new();
    for value in values {
        encode_compact(&element, value, &mut encoder)?;
    }
    Ok(CompactArray::new(element, encoder.into_bytes()))
}

/// Split a compact array back into its elements
///
/// # Errors
///
/// Returns `MalformedCapture` when the contents do not end on an element
/// boundary.
pub fn unpack_compact_array(compact_array: &CompactArray) -> DlmsResult<Vec<DataObject>> {
    let mut decoder = AxdrDecoder::new(compact_array.array_contents());
    if compact_array.type_description().leaf_count() == 0 && decoder.remaining() > 0 {
        return Err(DlmsError::MalformedCapture(
            "Compact array of empty elements carries contents".to_string(),
        ));
    }
    let mut values = Vec::new();
    while decoder.remaining() > 0 {
        values.push(decode_compact(compact_array.type_description(), &mut decoder)?);
    }
    Ok(values)
}
