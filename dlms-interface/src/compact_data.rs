//! Compact Data interface class (Class ID: 62)
//!
//! Captures the values of a list of attributes into one tag-free row
//! described by a template, so that repeated readings cost only their
//! payload bytes.
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (octet-string)
//! - Attribute 2: compact_buffer (octet-string, read-only)
//! - Attribute 3: capture_objects (array of capture object definitions, static)
//! - Attribute 4: template_id (unsigned, static)
//! - Attribute 5: template_description (octet-string, read-only, static)
//! - Attribute 6: capture_method (enum, static)
//!
//! # Methods
//!
//! - Method 1: reset (clears the buffer, keeps the template)
//! - Method 2: capture
//!
//! The template and the buffer are kept behind one lock and are only ever
//! handed out together, so a reader never pairs a buffer with the template
//! of another configuration.

use crate::access::AccessMode;
use crate::capture::{self, capture_snapshot, derive_template, CaptureObjectRef, SubIndex, TemplateDescription};
use crate::descriptor::{CaptureObjectDefinition, ObjectDescriptor, ObjectType};
use crate::registry::{create_default, ObjectRegistry};
use crate::{no_such_attribute, no_such_method, CosemObject};
use async_trait::async_trait;
use bytes::Bytes;
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult, ObisCode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};

/// When the buffer is refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    /// Only by the capture method
    #[default]
    Invoked = 0,
    /// Also on every read of the buffer
    Implicit = 1,
}

impl CaptureMethod {
    pub fn from_value(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(CaptureMethod::Invoked),
            1 => Ok(CaptureMethod::Implicit),
            _ => Err(DlmsError::InvalidData(format!("Invalid capture method: {}", value))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Lifecycle of the capture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    /// No capture objects were ever set
    Unconfigured,
    /// Capture objects set, template not derived yet
    Configured,
    /// Template derived, no row captured since the last configuration or reset
    TemplateDerived,
    /// The buffer holds a row matching the template
    Captured,
}

#[derive(Debug)]
struct CaptureState {
    phase: CapturePhase,
    capture_objects: Vec<CaptureObjectRef>,
    template: Option<TemplateDescription>,
    buffer: Bytes,
}

impl CaptureState {
    fn new() -> Self {
        Self {
            phase: CapturePhase::Unconfigured,
            capture_objects: Vec::new(),
            template: None,
            buffer: Bytes::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompactData {
    descriptor: Arc<ObjectDescriptor>,
    template_id: Arc<RwLock<u8>>,
    capture_method: Arc<RwLock<CaptureMethod>>,
    state: Arc<Mutex<CaptureState>>,
    registry: Option<Weak<ObjectRegistry>>,
}

impl CompactData {
    pub const CLASS_ID: u16 = 62;
    pub const VERSION: u8 = 0;

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_COMPACT_BUFFER: u8 = 2;
    pub const ATTR_CAPTURE_OBJECTS: u8 = 3;
    pub const ATTR_TEMPLATE_ID: u8 = 4;
    pub const ATTR_TEMPLATE_DESCRIPTION: u8 = 5;
    pub const ATTR_CAPTURE_METHOD: u8 = 6;

    pub const METHOD_RESET: u8 = 1;
    pub const METHOD_CAPTURE: u8 = 2;

    /// Default OBIS code (0-0:66.0.1.255)
    pub fn default_obis() -> ObisCode {
        ObisCode::new(0, 0, 66, 0, 1, 255)
    }

    pub fn new(logical_name: ObisCode) -> Self {
        let descriptor = ObjectDescriptor::new(ObjectType::CompactData, Self::VERSION, 6, 2)
            .with_logical_name(logical_name)
            .with_static_attributes(&[
                Self::ATTR_CAPTURE_OBJECTS,
                Self::ATTR_TEMPLATE_ID,
                Self::ATTR_TEMPLATE_DESCRIPTION,
                Self::ATTR_CAPTURE_METHOD,
            ])
            .with_access_mode(Self::ATTR_COMPACT_BUFFER, AccessMode::Read)
            .with_access_mode(Self::ATTR_TEMPLATE_DESCRIPTION, AccessMode::Read);
        Self {
            descriptor: Arc::new(descriptor),
            template_id: Arc::new(RwLock::new(0)),
            capture_method: Arc::new(RwLock::new(CaptureMethod::default())),
            state: Arc::new(Mutex::new(CaptureState::new())),
            registry: None,
        }
    }

    pub fn with_default_obis() -> Self {
        Self::new(Self::default_obis())
    }

    pub fn with_template_id(mut self, template_id: u8) -> Self {
        self.template_id = Arc::new(RwLock::new(template_id));
        self
    }

    pub fn with_capture_method(mut self, capture_method: CaptureMethod) -> Self {
        self.capture_method = Arc::new(RwLock::new(capture_method));
        self
    }

    /// Resolve capture objects written through attribute 3 in `registry`
    ///
    /// Without a registry, or once it has been dropped, each written
    /// definition gets a fresh default instance.
    pub fn with_registry(mut self, registry: &Arc<ObjectRegistry>) -> Self {
        self.registry = Some(Arc::downgrade(registry));
        self
    }

    /// Build a configured instance, binding every capture object through `registry`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for unknown class ids, classes without a
    /// default instance and definitions targeting a Compact Data object.
    pub async fn from_config(config: &CompactDataConfig, registry: &Arc<ObjectRegistry>) -> DlmsResult<Self> {
        let compact = Self::new(config.logical_name)
            .with_template_id(config.template_id)
            .with_capture_method(config.capture_method)
            .with_registry(registry);
        let refs = bind_definitions(&config.capture_objects, Some(registry.as_ref())).await?;
        compact.set_capture_objects(refs).await?;
        Ok(compact)
    }

    /// Current configuration in its serializable form
    pub async fn config(&self) -> DlmsResult<CompactDataConfig> {
        let logical_name = self.logical_name().ok_or_else(|| {
            DlmsError::InvalidConfiguration("Compact data object has no logical name".to_string())
        })?;
        Ok(CompactDataConfig {
            logical_name,
            template_id: self.template_id().await,
            capture_method: self.capture_method().await,
            capture_objects: self.capture_object_definitions().await?,
        })
    }

    pub async fn phase(&self) -> CapturePhase {
        self.state.lock().await.phase
    }

    pub async fn template_id(&self) -> u8 {
        *self.template_id.read().await
    }

    pub async fn set_template_id(&self, template_id: u8) {
        *self.template_id.write().await = template_id;
    }

    pub async fn capture_method(&self) -> CaptureMethod {
        *self.capture_method.read().await
    }

    pub async fn set_capture_method(&self, capture_method: CaptureMethod) {
        *self.capture_method.write().await = capture_method;
    }

    pub async fn capture_objects(&self) -> Vec<CaptureObjectRef> {
        self.state.lock().await.capture_objects.clone()
    }

    /// Replace the capture objects, discarding the template and the buffer
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if a reference targets a Compact Data
    /// object.
    pub async fn set_capture_objects(&self, refs: Vec<CaptureObjectRef>) -> DlmsResult<()> {
        if let Some(nested) = refs
            .iter()
            .find(|r| r.target().object_type() == ObjectType::CompactData)
        {
            return Err(DlmsError::InvalidConfiguration(format!(
                "Capture object {:?} is a compact data object",
                nested.target().logical_name()
            )));
        }
        let mut state = self.state.lock().await;
        debug!(
            "Compact data {:?} configured with {} capture objects",
            self.logical_name(),
            refs.len()
        );
        state.capture_objects = refs;
        state.template = None;
        state.buffer = Bytes::new();
        state.phase = CapturePhase::Configured;
        Ok(())
    }

    /// Template of the configured capture objects, derived on first use
    ///
    /// Empty while unconfigured.
    pub async fn template_description(&self) -> DlmsResult<TemplateDescription> {
        let mut state = self.state.lock().await;
        if state.phase == CapturePhase::Unconfigured {
            return Ok(TemplateDescription::default());
        }
        ensure_template(&mut state).await
    }

    /// Capture one row into the buffer
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` while no capture objects have been set
    /// and any error of template derivation or capture. The previous buffer
    /// is kept on error.
    pub async fn capture(&self) -> DlmsResult<()> {
        let mut state = self.state.lock().await;
        if state.phase == CapturePhase::Unconfigured {
            return Err(DlmsError::InvalidConfiguration(
                "Cannot capture before capture objects are set".to_string(),
            ));
        }
        capture_locked(&mut state).await
    }

    /// Clear the buffer, keeping the template
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.buffer = Bytes::new();
        if state.phase == CapturePhase::Captured {
            state.phase = CapturePhase::TemplateDerived;
        }
        debug!("Compact data {:?} reset", self.logical_name());
    }

    /// Contents of the buffer, capturing first with [`CaptureMethod::Implicit`]
    pub async fn compact_buffer(&self) -> DlmsResult<Bytes> {
        let implicit = self.capture_method().await == CaptureMethod::Implicit;
        let mut state = self.state.lock().await;
        if implicit && state.phase != CapturePhase::Unconfigured {
            capture_locked(&mut state).await?;
        }
        Ok(state.buffer.clone())
    }

    /// The captured row together with its template
    ///
    /// `None` until a row has been captured. Capturing first with
    /// [`CaptureMethod::Implicit`], like a read of the buffer.
    pub async fn record(&self) -> DlmsResult<Option<CompactRecord>> {
        let implicit = self.capture_method().await == CaptureMethod::Implicit;
        let template_id = self.template_id().await;
        let mut state = self.state.lock().await;
        if implicit && state.phase != CapturePhase::Unconfigured {
            capture_locked(&mut state).await?;
        }
        match (&state.template, state.phase) {
            (Some(template), CapturePhase::Captured) => Ok(Some(CompactRecord {
                template_id,
                template_description: template.encode()?,
                compact_buffer: state.buffer.to_vec(),
            })),
            _ => Ok(None),
        }
    }

    /// Values of the captured row, empty until a row has been captured
    pub async fn decode_buffer(&self) -> DlmsResult<Vec<DataObject>> {
        let state = self.state.lock().await;
        match (&state.template, state.phase) {
            (Some(template), CapturePhase::Captured) => capture::decode_values(template, &state.buffer),
            _ => Ok(Vec::new()),
        }
    }

    async fn capture_object_definitions(&self) -> DlmsResult<Vec<CaptureObjectDefinition>> {
        self.state
            .lock()
            .await
            .capture_objects
            .iter()
            .map(CaptureObjectRef::definition)
            .collect()
    }

    async fn write_capture_objects(&self, value: &DataObject) -> DlmsResult<()> {
        let definitions = value
            .as_array()?
            .iter()
            .map(CaptureObjectDefinition::from_data_object)
            .collect::<DlmsResult<Vec<_>>>()?;
        let registry = self.registry.as_ref().and_then(Weak::upgrade);
        let refs = bind_definitions(&definitions, registry.as_deref()).await?;
        self.set_capture_objects(refs).await
    }
}

async fn ensure_template(state: &mut CaptureState) -> DlmsResult<TemplateDescription> {
    if let Some(template) = &state.template {
        return Ok(template.clone());
    }
    let template = derive_template(&state.capture_objects).await?;
    state.template = Some(template.clone());
    state.phase = CapturePhase::TemplateDerived;
    Ok(template)
}

async fn capture_locked(state: &mut CaptureState) -> DlmsResult<()> {
    let template = ensure_template(state).await?;
    state.buffer = capture_snapshot(&state.capture_objects, &template).await?;
    state.phase = CapturePhase::Captured;
    Ok(())
}

async fn bind_definitions(
    definitions: &[CaptureObjectDefinition],
    registry: Option<&ObjectRegistry>,
) -> DlmsResult<Vec<CaptureObjectRef>> {
    let mut refs = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let object_type = ObjectType::from_class_id(definition.class_id)?;
        if object_type == ObjectType::CompactData {
            return Err(DlmsError::InvalidConfiguration(format!(
                "Capture object {} is a compact data object",
                definition.logical_name
            )));
        }
        let target = match registry {
            Some(registry) => registry.resolve(object_type, definition.logical_name).await?,
            None => create_default(object_type, definition.logical_name)?,
        };
        refs.push(
            CaptureObjectRef::new(target, definition.attribute_index)
                .with_sub_index(SubIndex::from_data_index(definition.data_index)),
        );
    }
    Ok(refs)
}

#[async_trait]
impl CosemObject for CompactData {
    fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    fn attribute_count(&self, _version: u8) -> u8 {
        6
    }

    fn method_count(&self, _version: u8) -> u8 {
        2
    }

    async fn data_type(&self, attribute_id: u8) -> DlmsResult<DataObjectType> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME | Self::ATTR_COMPACT_BUFFER | Self::ATTR_TEMPLATE_DESCRIPTION => {
                Ok(DataObjectType::OctetString)
            }
            Self::ATTR_CAPTURE_OBJECTS => Ok(DataObjectType::Array),
            Self::ATTR_TEMPLATE_ID => Ok(DataObjectType::Unsigned),
            Self::ATTR_CAPTURE_METHOD => Ok(DataObjectType::Enumerate),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(self.descriptor.logical_name_value()),
            Self::ATTR_COMPACT_BUFFER => Ok(DataObject::OctetString(self.compact_buffer().await?.to_vec())),
            Self::ATTR_CAPTURE_OBJECTS => Ok(DataObject::Array(
                self.capture_object_definitions()
                    .await?
                    .iter()
                    .map(CaptureObjectDefinition::to_data_object)
                    .collect::<DlmsResult<Vec<_>>>()?,
            )),
            Self::ATTR_TEMPLATE_ID => Ok(DataObject::Unsigned8(self.template_id().await)),
            Self::ATTR_TEMPLATE_DESCRIPTION => Ok(DataObject::OctetString(
                self.template_description().await?.encode()?,
            )),
            Self::ATTR_CAPTURE_METHOD => Ok(DataObject::Enumerate(self.capture_method().await.value())),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => self.descriptor.write_logical_name(&value),
            Self::ATTR_COMPACT_BUFFER | Self::ATTR_TEMPLATE_DESCRIPTION => Err(DlmsError::AccessDenied(
                format!("Attribute {} of compact data is read-only", attribute_id),
            )),
            Self::ATTR_CAPTURE_OBJECTS => self.write_capture_objects(&value).await,
            Self::ATTR_TEMPLATE_ID => {
                self.set_template_id(value.as_u8()?).await;
                Ok(())
            }
            Self::ATTR_CAPTURE_METHOD => {
                self.set_capture_method(CaptureMethod::from_value(value.as_u8()?)?).await;
                Ok(())
            }
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn invoke_method(
        &self,
        method_id: u8,
        _parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        match method_id {
            Self::METHOD_RESET => {
                self.reset().await;
                Ok(None)
            }
            Self::METHOD_CAPTURE => {
                self.capture().await?;
                Ok(None)
            }
            _ => Err(no_such_method(self, method_id)),
        }
    }
}

/// Serializable configuration of a [`CompactData`] object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactDataConfig {
    pub logical_name: ObisCode,
    pub template_id: u8,
    pub capture_method: CaptureMethod,
    pub capture_objects: Vec<CaptureObjectDefinition>,
}

impl Default for CompactDataConfig {
    fn default() -> Self {
        Self {
            logical_name: CompactData::default_obis(),
            template_id: 0,
            capture_method: CaptureMethod::default(),
            capture_objects: Vec::new(),
        }
    }
}

/// One captured row stored with the template that describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactRecord {
    pub template_id: u8,
    #[serde(with = "serde_bytes")]
    pub template_description: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub compact_buffer: Vec<u8>,
}

impl CompactRecord {
    pub fn template(&self) -> DlmsResult<TemplateDescription> {
        TemplateDescription::decode(&self.template_description)
    }

    pub fn decode_values(&self) -> DlmsResult<Vec<DataObject>> {
        capture::decode_values(&self.template()?, &self.compact_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch;
    use crate::{Data, Register, ScalerUnit};

    fn energy_name() -> ObisCode {
        ObisCode::new(1, 0, 1, 8, 0, 255)
    }

    fn energy(value: u32) -> Arc<Register> {
        Arc::new(Register::new(
            energy_name(),
            DataObject::Unsigned32(value),
            ScalerUnit::new(0, 0x1E),
        ))
    }

    #[tokio::test]
    async fn test_compact_data_identity() {
        let compact = CompactData::with_default_obis();
        assert_eq!(compact.class_id(), 62);
        assert_eq!(compact.logical_name(), Some(ObisCode::new(0, 0, 66, 0, 1, 255)));
        assert!(compact.descriptor().is_static(3));
        assert!(!compact.descriptor().is_static(2));
        assert_eq!(compact.descriptor().access_mode(2), AccessMode::Read);
        assert_eq!(compact.phase().await, CapturePhase::Unconfigured);
    }

    #[tokio::test]
    async fn test_state_machine() {
        let compact = CompactData::with_default_obis();
        assert!(matches!(
            compact.capture().await,
            Err(DlmsError::InvalidConfiguration(_))
        ));
        assert!(compact.template_description().await.unwrap().is_empty());

        let register = energy(1000);
        compact
            .set_capture_objects(vec![CaptureObjectRef::new(register.clone(), 2)])
            .await
            .unwrap();
        assert_eq!(compact.phase().await, CapturePhase::Configured);

        let template = compact.template_description().await.unwrap();
        assert_eq!(template.len(), 1);
        assert_eq!(compact.phase().await, CapturePhase::TemplateDerived);
        assert!(compact.decode_buffer().await.unwrap().is_empty());

        compact.capture().await.unwrap();
        assert_eq!(compact.phase().await, CapturePhase::Captured);
        assert_eq!(compact.compact_buffer().await.unwrap().as_ref(), &[0, 0, 0x03, 0xE8]);
        assert_eq!(compact.decode_buffer().await.unwrap(), vec![DataObject::Unsigned32(1000)]);

        compact.set_capture_objects(vec![]).await.unwrap();
        assert_eq!(compact.phase().await, CapturePhase::Configured);
        assert!(compact.compact_buffer().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_keeps_template() {
        let compact = CompactData::with_default_obis();
        compact
            .set_capture_objects(vec![CaptureObjectRef::new(energy(5), 2)])
            .await
            .unwrap();
        compact.invoke_method(CompactData::METHOD_CAPTURE, None).await.unwrap();
        let template = compact.get_attribute(5).await.unwrap();

        compact.invoke_method(CompactData::METHOD_RESET, None).await.unwrap();
        assert_eq!(compact.phase().await, CapturePhase::TemplateDerived);
        assert_eq!(compact.get_attribute(2).await.unwrap(), DataObject::OctetString(vec![]));
        assert_eq!(compact.get_attribute(5).await.unwrap(), template);
        assert!(compact.record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_implicit_capture_on_read() {
        let register = energy(1);
        let compact = CompactData::with_default_obis().with_capture_method(CaptureMethod::Implicit);
        compact
            .set_capture_objects(vec![CaptureObjectRef::new(register.clone(), 2)])
            .await
            .unwrap();

        assert_eq!(compact.compact_buffer().await.unwrap().as_ref(), &[0, 0, 0, 1]);
        register.set_value(DataObject::Unsigned32(2)).await;
        assert_eq!(
            compact.get_attribute(2).await.unwrap(),
            DataObject::OctetString(vec![0, 0, 0, 2])
        );
        assert_eq!(compact.get_attribute(6).await.unwrap(), DataObject::Enumerate(1));
    }

    #[tokio::test]
    async fn test_empty_capture_objects() {
        let compact = CompactData::with_default_obis();
        compact.set_capture_objects(vec![]).await.unwrap();
        compact.capture().await.unwrap();
        assert!(compact.template_description().await.unwrap().is_empty());
        assert!(compact.compact_buffer().await.unwrap().is_empty());
        assert!(compact.decode_buffer().await.unwrap().is_empty());

        let record = compact.record().await.unwrap().unwrap();
        assert!(record.template_description.is_empty());
        assert!(record.decode_values().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_compact_data_targets() {
        let compact = Arc::new(CompactData::with_default_obis());
        let reference = CaptureObjectRef::new(compact.clone(), 2);
        assert!(matches!(
            compact.set_capture_objects(vec![reference]).await,
            Err(DlmsError::InvalidConfiguration(_))
        ));
        assert_eq!(compact.phase().await, CapturePhase::Unconfigured);

        let nested = CaptureObjectDefinition::new(62, ObisCode::new(0, 0, 66, 0, 2, 255), 2);
        assert!(matches!(
            compact
                .set_attribute(3, DataObject::Array(vec![nested.to_data_object().unwrap()]))
                .await,
            Err(DlmsError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_read_only_attributes() {
        let compact = CompactData::with_default_obis();
        assert!(matches!(
            compact.set_attribute(2, DataObject::OctetString(vec![1])).await,
            Err(DlmsError::AccessDenied(_))
        ));
        assert!(matches!(
            dispatch::write_attribute(&compact, 5, DataObject::OctetString(vec![])).await,
            Err(DlmsError::AccessDenied(_))
        ));
        assert!(matches!(compact.get_attribute(7).await, Err(DlmsError::AccessDenied(_))));
        assert!(matches!(compact.invoke_method(3, None).await, Err(DlmsError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_capture_objects_resolved_through_registry() {
        let registry = Arc::new(ObjectRegistry::new());
        registry.register(energy(1000)).await.unwrap();
        let compact = CompactData::with_default_obis().with_registry(&registry);

        let definitions = DataObject::Array(vec![
            CaptureObjectDefinition::new(3, energy_name(), 2).to_data_object().unwrap(),
            CaptureObjectDefinition::new(3, energy_name(), 3)
                .with_data_index(1)
                .to_data_object()
                .unwrap(),
            CaptureObjectDefinition::new(1, ObisCode::new(0, 0, 96, 1, 0, 255), 2)
                .to_data_object()
                .unwrap(),
        ]);
        compact.set_attribute(3, definitions.clone()).await.unwrap();
        assert_eq!(compact.get_attribute(3).await.unwrap(), definitions);
        assert_eq!(registry.len().await, 2);

        compact.capture().await.unwrap();
        assert_eq!(
            compact.decode_buffer().await.unwrap(),
            vec![DataObject::Unsigned32(1000), DataObject::Integer8(0), DataObject::Null]
        );
    }

    #[tokio::test]
    async fn test_capture_objects_without_registry() {
        let compact = CompactData::with_default_obis();
        let definitions = DataObject::Array(vec![CaptureObjectDefinition::new(3, energy_name(), 2)
            .to_data_object()
            .unwrap()]);
        compact.set_attribute(3, definitions).await.unwrap();
        compact.capture().await.unwrap();
        assert_eq!(compact.decode_buffer().await.unwrap(), vec![DataObject::Unsigned32(0)]);
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let registry = Arc::new(ObjectRegistry::new());
        registry.register(energy(7)).await.unwrap();
        let json = r#"{
            "logical_name": "0.0.66.0.1.255",
            "template_id": 3,
            "capture_method": "implicit",
            "capture_objects": [
                { "class_id": 3, "logical_name": "1.0.1.8.0.255", "attribute_index": 2 }
            ]
        }"#;
        let config: CompactDataConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.capture_objects[0].data_index, 0);

        let compact = CompactData::from_config(&config, &registry).await.unwrap();
        assert_eq!(compact.template_id().await, 3);
        assert_eq!(compact.phase().await, CapturePhase::Configured);
        assert_eq!(compact.config().await.unwrap(), config);
        assert_eq!(compact.decode_buffer().await.unwrap(), Vec::<DataObject>::new());
        assert_eq!(compact.compact_buffer().await.unwrap().as_ref(), &[0, 0, 0, 7]);

        let defaults: CompactDataConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, CompactDataConfig::default());
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let compact = CompactData::with_default_obis().with_template_id(9);
        let data = Arc::new(Data::new(
            ObisCode::new(0, 0, 96, 1, 0, 255),
            DataObject::Structure(vec![DataObject::Boolean(true), DataObject::Unsigned16(42)]),
        ));
        compact
            .set_capture_objects(vec![CaptureObjectRef::new(energy(1000), 2), CaptureObjectRef::new(data, 2)])
            .await
            .unwrap();
        compact.capture().await.unwrap();

        let record = compact.record().await.unwrap().unwrap();
        assert_eq!(record.template_id, 9);
        let json = serde_json::to_string(&record).unwrap();
        let restored: CompactRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.decode_values().unwrap(), compact.decode_buffer().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_capture_and_read() {
        let compact = Arc::new(CompactData::with_default_obis());
        let register = energy(0);
        let data = Arc::new(Data::new(
            ObisCode::new(0, 0, 96, 1, 0, 255),
            DataObject::Array(vec![DataObject::Unsigned8(1), DataObject::Unsigned8(2)]),
        ));
        let narrow = vec![CaptureObjectRef::new(register.clone(), 2)];
        let wide = vec![
            CaptureObjectRef::new(register.clone(), 2),
            CaptureObjectRef::new(data, 2),
        ];

        let writer = {
            let compact = compact.clone();
            tokio::spawn(async move {
                for i in 0..100u32 {
                    let refs = if i % 2 == 0 { narrow.clone() } else { wide.clone() };
                    compact.set_capture_objects(refs).await.unwrap();
                    register.set_value(DataObject::Unsigned32(i)).await;
                    compact.capture().await.unwrap();
                }
            })
        };
        let reader = {
            let compact = compact.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    if let Some(record) = compact.record().await.unwrap() {
                        let values = record.decode_values().unwrap();
                        assert_eq!(values.len(), record.template().unwrap().len());
                    }
                    tokio::task::yield_now().await;
                }
            })
        };
        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(compact.phase().await, CapturePhase::Captured);
    }
}
