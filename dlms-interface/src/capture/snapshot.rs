//! Live capture

use super::{CaptureObjectRef, TemplateDescription};
use bytes::Bytes;
use dlms_asn1::{encode_compact, AxdrEncoder};
use dlms_core::{DlmsError, DlmsResult};
use log::{debug, trace};

/// Capture the current values of `refs` as one compact row shaped by `template`
///
/// `template` must have been derived from the same `refs`. Nothing is
/// returned unless every reference was read and matched its description.
///
/// # Errors
///
/// Returns `InvalidConfiguration` when the number of references differs
/// from the template or a value no longer has the shape the template
/// recorded, and the target's error when a value cannot be read.
pub async fn capture_snapshot(refs: &[CaptureObjectRef], template: &TemplateDescription) -> DlmsResult<Bytes> {
    if refs.len() != template.len() {
        return Err(DlmsError::InvalidConfiguration(format!(
            "{} capture objects for a template of {} elements",
            refs.len(),
            template.len()
        )));
    }
    let mut encoder = AxdrEncoder::new();
    for (reference, desc) in refs.iter().zip(template.elements()) {
        let value = reference.current_value().await?;
        encode_compact(desc, &value, &mut encoder)?;
    }
    let row = Bytes::from(encoder.into_bytes());
    debug!("Captured {} bytes from {} capture objects", row.len(), refs.len());
    trace!("Compact row: {:02X?}", row.as_ref());
    Ok(row)
}
