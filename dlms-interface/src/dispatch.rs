//! Access-gated GET / SET / ACTION over [`CosemObject`]s
//!
//! Single operations return `Err` on failure. Bulk operations work on
//! [`AttributeContext`] / [`MethodContext`] slices and record each failure
//! in the context's `error` field, then carry on with the next entry.
//!
//! Gating order for attributes:
//!
//! 1. the index must exist at the object's version (`UnsupportedVersion`
//!    when it only exists in a later version, `AccessDenied` otherwise)
//! 2. the access table must allow the operation (`AccessDenied`)
//! 3. the kind performs it

use crate::{CosemObject, LATEST_VERSION};
use dlms_core::{DataObject, DlmsError, DlmsResult};
use log::{debug, warn};
use std::sync::Arc;
use std::time::SystemTime;

/// Per-attribute outcome reported to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataAccessResult {
    Success = 0,
    HardwareFault = 1,
    TemporaryFailure = 2,
    ReadWriteDenied = 3,
    ObjectUndefined = 4,
    ObjectClassInconsistent = 9,
    ObjectUnavailable = 11,
    TypeUnmatched = 12,
    ScopeOfAccessViolated = 13,
    OtherReason = 250,
}

impl DataAccessResult {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn from_value(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::HardwareFault),
            2 => Ok(Self::TemporaryFailure),
            3 => Ok(Self::ReadWriteDenied),
            4 => Ok(Self::ObjectUndefined),
            9 => Ok(Self::ObjectClassInconsistent),
            11 => Ok(Self::ObjectUnavailable),
            12 => Ok(Self::TypeUnmatched),
            13 => Ok(Self::ScopeOfAccessViolated),
            250 => Ok(Self::OtherReason),
            _ => Err(DlmsError::InvalidData(format!(
                "Invalid data access result: {}",
                value
            ))),
        }
    }
}

impl From<&DlmsError> for DataAccessResult {
    fn from(err: &DlmsError) -> Self {
        match err {
            DlmsError::AccessDenied(_) => Self::ReadWriteDenied,
            DlmsError::UnsupportedVersion { .. } => Self::ObjectUndefined,
            DlmsError::InvalidConfiguration(_) => Self::ObjectClassInconsistent,
            DlmsError::InvalidData(_) | DlmsError::MalformedCapture(_) => Self::TypeUnmatched,
            DlmsError::Asn1Encoding(_) | DlmsError::Asn1Decoding(_) => Self::OtherReason,
        }
    }
}

/// Per-method outcome reported to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionResult {
    Success = 0,
    HardwareFault = 1,
    TemporaryFailure = 2,
    ReadWriteDenied = 3,
    ObjectUndefined = 4,
    ObjectClassInconsistent = 9,
    ObjectUnavailable = 11,
    TypeUnmatched = 12,
    ScopeOfAccessViolated = 13,
    DataBlockUnavailable = 14,
    LongActionAborted = 15,
    NoLongActionInProgress = 16,
    OtherReason = 250,
}

impl ActionResult {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl From<&DlmsError> for ActionResult {
    fn from(err: &DlmsError) -> Self {
        match DataAccessResult::from(err) {
            DataAccessResult::ReadWriteDenied => Self::ReadWriteDenied,
            DataAccessResult::ObjectUndefined => Self::ObjectUndefined,
            DataAccessResult::ObjectClassInconsistent => Self::ObjectClassInconsistent,
            DataAccessResult::TypeUnmatched => Self::TypeUnmatched,
            _ => Self::OtherReason,
        }
    }
}

/// One attribute of a bulk GET or SET
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeContext {
    pub index: u8,
    /// Value read, or value to write
    pub value: Option<DataObject>,
    /// Failure of this attribute, if any
    pub error: Option<DlmsError>,
}

impl AttributeContext {
    pub fn read(index: u8) -> Self {
        Self {
            index,
            value: None,
            error: None,
        }
    }

    pub fn write(index: u8, value: DataObject) -> Self {
        Self {
            index,
            value: Some(value),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn result(&self) -> DataAccessResult {
        self.error
            .as_ref()
            .map_or(DataAccessResult::Success, DataAccessResult::from)
    }
}

/// One method of a bulk ACTION
#[derive(Debug, Clone, PartialEq)]
pub struct MethodContext {
    pub index: u8,
    pub parameters: Option<DataObject>,
    pub return_value: Option<DataObject>,
    pub error: Option<DlmsError>,
}

impl MethodContext {
    pub fn new(index: u8, parameters: Option<DataObject>) -> Self {
        Self {
            index,
            parameters,
            return_value: None,
            error: None,
        }
    }

    pub fn result(&self) -> ActionResult {
        self.error
            .as_ref()
            .map_or(ActionResult::Success, ActionResult::from)
    }
}

/// Check that attribute `index` exists at the object's version
pub fn check_attribute_index(object: &dyn CosemObject, index: u8) -> DlmsResult<()> {
    let version = object.version();
    check_index(
        object,
        index,
        object.attribute_count(version),
        object.attribute_count(LATEST_VERSION),
        "attribute",
    )
}

/// Check that method `index` exists at the object's version
pub fn check_method_index(object: &dyn CosemObject, index: u8) -> DlmsResult<()> {
    let version = object.version();
    check_index(
        object,
        index,
        object.method_count(version),
        object.method_count(LATEST_VERSION),
        "method",
    )
}

fn check_index(object: &dyn CosemObject, index: u8, count: u8, latest: u8, what: &str) -> DlmsResult<()> {
    if index == 0 || index > latest {
        return Err(DlmsError::AccessDenied(format!(
            "{} has no {} {}",
            object.object_type(),
            what,
            index
        )));
    }
    if index > count {
        return Err(DlmsError::UnsupportedVersion {
            class_id: object.class_id(),
            version: object.version(),
            index,
        });
    }
    Ok(())
}

/// Fail unless attribute `index` may be read
///
/// The logical name is always readable.
pub fn ensure_readable(object: &dyn CosemObject, index: u8) -> DlmsResult<()> {
    check_attribute_index(object, index)?;
    if index == 1 || object.descriptor().access_mode(index).allows_read() {
        Ok(())
    } else {
        Err(DlmsError::AccessDenied(format!(
            "Attribute {} of {} is not readable",
            index,
            object.object_type()
        )))
    }
}

/// GET one attribute, recording the read time on success
pub async fn read_attribute(object: &dyn CosemObject, index: u8) -> DlmsResult<DataObject> {
    ensure_readable(object, index)?;
    let value = object.get_attribute(index).await?;
    object.descriptor().mark_read(index, SystemTime::now());
    Ok(value)
}

/// SET one attribute
///
/// Attribute 1 is write-once, see
/// [`ObjectDescriptor::set_logical_name`](crate::ObjectDescriptor::set_logical_name).
pub async fn write_attribute(object: &dyn CosemObject, index: u8, value: DataObject) -> DlmsResult<()> {
    check_attribute_index(object, index)?;
    if index == 1 {
        return object.descriptor().write_logical_name(&value);
    }
    if !object.descriptor().access_mode(index).allows_write() {
        return Err(DlmsError::AccessDenied(format!(
            "Attribute {} of {} is not writable",
            index,
            object.object_type()
        )));
    }
    object.set_attribute(index, value).await
}

/// ACTION on one method
pub async fn invoke_method(
    object: &dyn CosemObject,
    index: u8,
    parameters: Option<DataObject>,
) -> DlmsResult<Option<DataObject>> {
    check_method_index(object, index)?;
    if !object.descriptor().can_invoke(index) {
        return Err(DlmsError::AccessDenied(format!(
            "Method {} of {} is not accessible",
            index,
            object.object_type()
        )));
    }
    object.invoke_method(index, parameters).await
}

pub async fn read_attributes(object: &dyn CosemObject, contexts: &mut [AttributeContext]) {
    for context in contexts.iter_mut() {
        match read_attribute(object, context.index).await {
            Ok(value) => {
                context.value = Some(value);
                context.error = None;
            }
            Err(err) => {
                warn!(
                    "{:?}: reading attribute {} failed: {}",
                    object.logical_name(),
                    context.index,
                    err
                );
                context.value = None;
                context.error = Some(err);
            }
        }
    }
}

pub async fn write_attributes(object: &dyn CosemObject, contexts: &mut [AttributeContext]) {
    for context in contexts.iter_mut() {
        let result = match context.value.clone() {
            Some(value) => write_attribute(object, context.index, value).await,
            None => Err(DlmsError::InvalidData(format!(
                "No value given for attribute {}",
                context.index
            ))),
        };
        if let Err(err) = result {
            warn!(
                "{:?}: writing attribute {} failed: {}",
                object.logical_name(),
                context.index,
                err
            );
            context.error = Some(err);
        } else {
            context.error = None;
        }
    }
}

pub async fn invoke_methods(object: &dyn CosemObject, contexts: &mut [MethodContext]) {
    for context in contexts.iter_mut() {
        match invoke_method(object, context.index, context.parameters.clone()).await {
            Ok(return_value) => {
                context.return_value = return_value;
                context.error = None;
            }
            Err(err) => {
                warn!(
                    "{:?}: method {} failed: {}",
                    object.logical_name(),
                    context.index,
                    err
                );
                context.return_value = None;
                context.error = Some(err);
            }
        }
    }
}

/// Read the attributes a bulk request needs, see
/// [`ObjectDescriptor::attributes_to_read`](crate::ObjectDescriptor::attributes_to_read)
pub async fn read_object(object: &dyn CosemObject, all: bool) -> Vec<AttributeContext> {
    let mut contexts: Vec<AttributeContext> = object
        .descriptor()
        .attributes_to_read(all)
        .into_iter()
        .map(AttributeContext::read)
        .collect();
    debug!(
        "{:?}: reading attributes {:?}",
        object.logical_name(),
        contexts.iter().map(|context| context.index).collect::<Vec<_>>()
    );
    read_attributes(object, &mut contexts).await;
    contexts
}

/// [`read_object`] over many instances, results in input order
pub async fn read_objects(objects: &[Arc<dyn CosemObject>], all: bool) -> Vec<Vec<AttributeContext>> {
    let mut results = Vec::with_capacity(objects.len());
    for object in objects {
        results.push(read_object(object.as_ref(), all).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessMode, Clock, Data, MethodAccessMode, ObjectDescriptor, ObjectType, Register, ScalerUnit};
    use dlms_core::{DataObjectType, ObisCode};

    fn energy() -> Register {
        Register::new(
            ObisCode::new(1, 0, 1, 8, 0, 255),
            DataObject::Unsigned32(1000),
            ScalerUnit::new(0, 0x1E),
        )
    }

    #[test]
    fn test_data_access_result_mapping() {
        let denied = DlmsError::AccessDenied("x".to_string());
        assert_eq!(DataAccessResult::from(&denied), DataAccessResult::ReadWriteDenied);
        let version = DlmsError::UnsupportedVersion {
            class_id: 8,
            version: 0,
            index: 10,
        };
        assert_eq!(DataAccessResult::from(&version), DataAccessResult::ObjectUndefined);
        let config = DlmsError::InvalidConfiguration("x".to_string());
        assert_eq!(
            DataAccessResult::from(&config),
            DataAccessResult::ObjectClassInconsistent
        );
        assert_eq!(DataAccessResult::from_value(3).unwrap(), DataAccessResult::ReadWriteDenied);
        assert!(DataAccessResult::from_value(5).is_err());
        assert_eq!(ActionResult::from(&denied).value(), 3);
    }

    #[tokio::test]
    async fn test_index_99_is_access_denied() {
        let objects: Vec<Arc<dyn CosemObject>> = vec![
            Arc::new(energy()),
            Arc::new(Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), DataObject::Null)),
            Arc::new(Clock::with_default_obis()),
        ];
        for object in &objects {
            let object = object.as_ref();
            assert!(matches!(object.get_attribute(99).await, Err(DlmsError::AccessDenied(_))));
            assert!(matches!(
                object.set_attribute(99, DataObject::Null).await,
                Err(DlmsError::AccessDenied(_))
            ));
            assert!(matches!(read_attribute(object, 99).await, Err(DlmsError::AccessDenied(_))));
            assert!(matches!(
                write_attribute(object, 99, DataObject::Null).await,
                Err(DlmsError::AccessDenied(_))
            ));
            assert!(matches!(
                invoke_method(object, 99, None).await,
                Err(DlmsError::AccessDenied(_))
            ));
        }
    }

    /// Kind with two attributes at version 0 and four at version 1
    #[derive(Debug)]
    struct Versioned {
        descriptor: ObjectDescriptor,
    }

    impl Versioned {
        fn new(version: u8) -> Self {
            let attribute_count = if version == 0 { 2 } else { 4 };
            Self {
                descriptor: ObjectDescriptor::new(ObjectType::Data, version, attribute_count, 0)
                    .with_logical_name(ObisCode::new(0, 0, 96, 1, 0, 255)),
            }
        }
    }

    #[async_trait::async_trait]
    impl CosemObject for Versioned {
        fn descriptor(&self) -> &ObjectDescriptor {
            &self.descriptor
        }

        fn attribute_count(&self, version: u8) -> u8 {
            if version == 0 { 2 } else { 4 }
        }

        fn method_count(&self, _version: u8) -> u8 {
            0
        }

        async fn data_type(&self, _attribute_id: u8) -> DlmsResult<DataObjectType> {
            Ok(DataObjectType::Unsigned)
        }

        async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
            Ok(DataObject::Unsigned8(attribute_id))
        }

        async fn set_attribute(&self, _attribute_id: u8, _value: DataObject) -> DlmsResult<()> {
            Ok(())
        }

        async fn invoke_method(
            &self,
            method_id: u8,
            _parameters: Option<DataObject>,
        ) -> DlmsResult<Option<DataObject>> {
            Err(crate::no_such_method(self, method_id))
        }
    }

    #[tokio::test]
    async fn test_version_gating() {
        let old = Versioned::new(0);
        assert_eq!(read_attribute(&old, 2).await.unwrap(), DataObject::Unsigned8(2));
        assert_eq!(
            read_attribute(&old, 3).await.unwrap_err(),
            DlmsError::UnsupportedVersion {
                class_id: 1,
                version: 0,
                index: 3
            }
        );
        assert!(matches!(
            write_attribute(&old, 4, DataObject::Null).await,
            Err(DlmsError::UnsupportedVersion { .. })
        ));
        assert!(matches!(read_attribute(&old, 5).await, Err(DlmsError::AccessDenied(_))));
        assert!(matches!(read_attribute(&old, 0).await, Err(DlmsError::AccessDenied(_))));

        let new = Versioned::new(1);
        assert_eq!(read_attribute(&new, 4).await.unwrap(), DataObject::Unsigned8(4));
        assert!(matches!(invoke_method(&new, 1, None).await, Err(DlmsError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_read_marks_static_attribute() {
        let register = energy();
        assert_eq!(register.descriptor().attributes_to_read(false), vec![2, 3]);
        let value = read_attribute(&register, 3).await.unwrap();
        assert_eq!(value, ScalerUnit::new(0, 0x1E).to_data_object());
        assert!(register.descriptor().is_already_read(3));
        assert_eq!(register.descriptor().attributes_to_read(false), vec![2]);
    }

    #[tokio::test]
    async fn test_access_table_gates_operations() {
        let register = energy();
        register.descriptor().set_access_mode(2, AccessMode::Read);
        assert!(matches!(
            write_attribute(&register, 2, DataObject::Unsigned32(1)).await,
            Err(DlmsError::AccessDenied(_))
        ));
        register.descriptor().set_access_mode(2, AccessMode::Write);
        assert!(matches!(read_attribute(&register, 2).await, Err(DlmsError::AccessDenied(_))));
        assert!(write_attribute(&register, 2, DataObject::Unsigned32(7)).await.is_ok());

        register
            .descriptor()
            .set_method_access_mode(1, MethodAccessMode::NoAccess);
        assert!(matches!(
            invoke_method(&register, 1, None).await,
            Err(DlmsError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_logical_name_always_readable_and_write_once() {
        let register = energy().with_access_mode(1, AccessMode::NoAccess);
        let name = read_attribute(&register, 1).await.unwrap();
        assert_eq!(name, DataObject::OctetString(vec![1, 0, 1, 8, 0, 255]));

        assert!(write_attribute(&register, 1, name).await.is_ok());
        let err = write_attribute(&register, 1, DataObject::OctetString(vec![1, 0, 2, 8, 0, 255]))
            .await
            .unwrap_err();
        assert!(matches!(err, DlmsError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_bulk_read_continues_past_failures() {
        let register = energy().with_access_mode(2, AccessMode::NoAccess);
        let mut contexts = vec![
            AttributeContext::read(2),
            AttributeContext::read(99),
            AttributeContext::read(3),
        ];
        read_attributes(&register, &mut contexts).await;
        assert_eq!(contexts[0].result(), DataAccessResult::ReadWriteDenied);
        assert_eq!(contexts[1].result(), DataAccessResult::ReadWriteDenied);
        assert!(contexts[2].is_ok());
        assert_eq!(
            contexts[2].value,
            Some(ScalerUnit::new(0, 0x1E).to_data_object())
        );
    }

    #[tokio::test]
    async fn test_bulk_write_continues_past_failures() {
        let register = energy();
        let mut contexts = vec![
            AttributeContext::write(99, DataObject::Null),
            AttributeContext::read(2),
            AttributeContext::write(2, DataObject::Unsigned32(55)),
        ];
        write_attributes(&register, &mut contexts).await;
        assert!(!contexts[0].is_ok());
        assert!(matches!(contexts[1].error, Some(DlmsError::InvalidData(_))));
        assert!(contexts[2].is_ok());
        assert_eq!(register.value().await, DataObject::Unsigned32(55));
    }

    #[tokio::test]
    async fn test_bulk_invoke() {
        let register = energy();
        let mut contexts = vec![MethodContext::new(1, Some(DataObject::Integer8(0))), MethodContext::new(2, None)];
        invoke_methods(&register, &mut contexts).await;
        assert_eq!(contexts[0].result(), ActionResult::Success);
        assert_eq!(contexts[1].result(), ActionResult::ReadWriteDenied);
        assert_eq!(register.value().await, DataObject::Unsigned32(0));
    }

    #[tokio::test]
    async fn test_read_objects_uses_static_cache() {
        let objects: Vec<Arc<dyn CosemObject>> = vec![
            Arc::new(energy()),
            Arc::new(Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), DataObject::Unsigned8(1))),
        ];
        let first = read_objects(&objects, false).await;
        assert_eq!(
            first[0].iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(first[1].iter().map(|c| c.index).collect::<Vec<_>>(), vec![2]);

        let second = read_objects(&objects, false).await;
        assert_eq!(second[0].iter().map(|c| c.index).collect::<Vec<_>>(), vec![2]);

        let all = read_objects(&objects, true).await;
        assert_eq!(all[0].iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(all.iter().flatten().all(AttributeContext::is_ok));
    }
}
