//! Object identity and the access controller
//!
//! [`ObjectDescriptor`] is the common part of every COSEM object instance:
//! its interface class, version, logical name and the per-attribute access
//! table. The access controller answers which attributes may be read or
//! written and which ones a bulk read still needs to fetch.

use crate::access::{AccessMode, AttributeDescriptor, MethodAccessMode, MethodDescriptor};
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult, ObisCode};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// COSEM interface classes, keyed by Blue Book class id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum ObjectType {
    Data = 1,
    Register = 3,
    ExtendedRegister = 4,
    DemandRegister = 5,
    RegisterActivation = 6,
    ProfileGeneric = 7,
    Clock = 8,
    ScriptTable = 9,
    Schedule = 10,
    SpecialDaysTable = 11,
    AssociationShortName = 12,
    AssociationLogicalName = 15,
    SapAssignment = 17,
    ImageTransfer = 18,
    IecLocalPortSetup = 19,
    ActivityCalendar = 20,
    RegisterMonitor = 21,
    SingleActionSchedule = 22,
    IecHdlcSetup = 23,
    IecTwistedPairSetup = 24,
    MBusSlavePortSetup = 25,
    ModemConfiguration = 27,
    AutoAnswer = 28,
    AutoConnect = 29,
    PushSetup = 40,
    TcpUdpSetup = 41,
    Ip4Setup = 42,
    MacAddressSetup = 43,
    PppSetup = 44,
    GprsSetup = 45,
    SmtpSetup = 46,
    GsmDiagnostic = 47,
    Ip6Setup = 48,
    RegisterTable = 61,
    CompactData = 62,
    StatusMapping = 63,
    SecuritySetup = 64,
    ParameterMonitor = 65,
    DisconnectControl = 70,
    Limiter = 71,
    MBusClient = 72,
    Account = 111,
    Credit = 112,
    Charge = 113,
    TokenGateway = 115,
}

impl ObjectType {
    const ALL: [ObjectType; 45] = [
        ObjectType::Data,
        ObjectType::Register,
        ObjectType::ExtendedRegister,
        ObjectType::DemandRegister,
        ObjectType::RegisterActivation,
        ObjectType::ProfileGeneric,
        ObjectType::Clock,
        ObjectType::ScriptTable,
        ObjectType::Schedule,
        ObjectType::SpecialDaysTable,
        ObjectType::AssociationShortName,
        ObjectType::AssociationLogicalName,
        ObjectType::SapAssignment,
        ObjectType::ImageTransfer,
        ObjectType::IecLocalPortSetup,
        ObjectType::ActivityCalendar,
        ObjectType::RegisterMonitor,
        ObjectType::SingleActionSchedule,
        ObjectType::IecHdlcSetup,
        ObjectType::IecTwistedPairSetup,
        ObjectType::MBusSlavePortSetup,
        ObjectType::ModemConfiguration,
        ObjectType::AutoAnswer,
        ObjectType::AutoConnect,
        ObjectType::PushSetup,
        ObjectType::TcpUdpSetup,
        ObjectType::Ip4Setup,
        ObjectType::MacAddressSetup,
        ObjectType::PppSetup,
        ObjectType::GprsSetup,
        ObjectType::SmtpSetup,
        ObjectType::GsmDiagnostic,
        ObjectType::Ip6Setup,
        ObjectType::RegisterTable,
        ObjectType::CompactData,
        ObjectType::StatusMapping,
        ObjectType::SecuritySetup,
        ObjectType::ParameterMonitor,
        ObjectType::DisconnectControl,
        ObjectType::Limiter,
        ObjectType::MBusClient,
        ObjectType::Account,
        ObjectType::Credit,
        ObjectType::Charge,
        ObjectType::TokenGateway,
    ];

    pub fn class_id(self) -> u16 {
        self as u16
    }

    /// Look up a class id
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for class ids this model does not know.
    pub fn from_class_id(class_id: u16) -> DlmsResult<Self> {
        Self::ALL
            .into_iter()
            .find(|object_type| object_type.class_id() == class_id)
            .ok_or_else(|| {
                DlmsError::InvalidConfiguration(format!("Unknown interface class {}", class_id))
            })
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.class_id())
    }
}

/// Identity and access metadata shared by every COSEM object
///
/// The logical name is write-once: it may be set while unset, and later
/// writes must repeat the same value. Attribute 1 is always readable,
/// indices outside `1..=attribute_count` have no access.
#[derive(Debug)]
pub struct ObjectDescriptor {
    object_type: ObjectType,
    version: u8,
    short_name: Option<u16>,
    attribute_count: u8,
    method_count: u8,
    logical_name: RwLock<Option<ObisCode>>,
    attributes: RwLock<BTreeMap<u8, AttributeDescriptor>>,
    methods: RwLock<BTreeMap<u8, MethodDescriptor>>,
}

impl ObjectDescriptor {
    /// Create a descriptor with default access: every attribute read-write
    /// and dynamic, every method accessible
    ///
    /// # Arguments
    /// * `object_type` - Interface class of the object
    /// * `version` - Interface class version of this instance
    /// * `attribute_count` - Number of attributes defined at `version`
    /// * `method_count` - Number of methods defined at `version`
    pub fn new(object_type: ObjectType, version: u8, attribute_count: u8, method_count: u8) -> Self {
        Self {
            object_type,
            version,
            short_name: None,
            attribute_count,
            method_count,
            logical_name: RwLock::new(None),
            attributes: RwLock::new(BTreeMap::new()),
            methods: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_logical_name(self, logical_name: ObisCode) -> Self {
        *write(&self.logical_name) = Some(logical_name);
        self
    }

    /// Short name used by SN referencing
    pub fn with_short_name(mut self, short_name: u16) -> Self {
        self.short_name = Some(short_name);
        self
    }

    /// Mark attributes as static (read-once)
    pub fn with_static_attributes(self, indices: &[u8]) -> Self {
        for index in indices {
            self.set_static(*index, true);
        }
        self
    }

    pub fn with_access_mode(self, index: u8, mode: AccessMode) -> Self {
        self.set_access_mode(index, mode);
        self
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn class_id(&self) -> u16 {
        self.object_type.class_id()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn short_name(&self) -> Option<u16> {
        self.short_name
    }

    pub fn attribute_count(&self) -> u8 {
        self.attribute_count
    }

    pub fn method_count(&self) -> u8 {
        self.method_count
    }

    pub fn logical_name(&self) -> Option<ObisCode> {
        *read(&self.logical_name)
    }

    /// Attribute 1 as an octet-string, `Null` while unset
    pub fn logical_name_value(&self) -> DataObject {
        match self.logical_name() {
            Some(name) => DataObject::OctetString(name.to_bytes().to_vec()),
            None => DataObject::Null,
        }
    }

    /// Set the logical name
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when a different logical name is already set.
    pub fn set_logical_name(&self, logical_name: ObisCode) -> DlmsResult<()> {
        let mut current = write(&self.logical_name);
        match *current {
            Some(existing) if existing != logical_name => Err(DlmsError::AccessDenied(format!(
                "Logical name {} is already set, cannot change it to {}",
                existing, logical_name
            ))),
            _ => {
                *current = Some(logical_name);
                Ok(())
            }
        }
    }

    /// Write attribute 1 from its octet-string form
    pub fn write_logical_name(&self, value: &DataObject) -> DlmsResult<()> {
        self.set_logical_name(ObisCode::from_bytes(value.as_octet_string()?)?)
    }

    fn in_range(&self, index: u8) -> bool {
        (1..=self.attribute_count).contains(&index)
    }

    /// Edit the entry for `index`, creating it with defaults when missing
    fn update_attribute(&self, index: u8, update: impl FnOnce(&mut AttributeDescriptor)) {
        if !self.in_range(index) {
            warn!(
                "{}: ignoring access table update for attribute {} (defined: 1..={})",
                self.object_type, index, self.attribute_count
            );
            return;
        }
        let mut attributes = write(&self.attributes);
        update(
            attributes
                .entry(index)
                .or_insert_with(|| AttributeDescriptor::new(index)),
        );
    }

    fn attribute_entry<R>(&self, index: u8, query: impl FnOnce(&AttributeDescriptor) -> R) -> Option<R> {
        read(&self.attributes).get(&index).map(query)
    }

    /// Snapshot of the stored entry for `index`
    pub fn attribute(&self, index: u8) -> Option<AttributeDescriptor> {
        self.attribute_entry(index, Clone::clone)
    }

    /// Access mode of attribute `index`
    ///
    /// Attribute 1 is always `Read`. Indices outside the defined range are
    /// `NoAccess`; attributes without an entry are `ReadWrite`.
    pub fn access_mode(&self, index: u8) -> AccessMode {
        if !self.in_range(index) {
            return AccessMode::NoAccess;
        }
        if index == 1 {
            return AccessMode::Read;
        }
        self.attribute_entry(index, |attribute| attribute.access_mode)
            .unwrap_or_default()
    }

    pub fn set_access_mode(&self, index: u8, mode: AccessMode) {
        self.update_attribute(index, |attribute| attribute.access_mode = mode);
    }

    pub fn can_read(&self, index: u8) -> bool {
        self.access_mode(index) != AccessMode::NoAccess
    }

    pub fn is_static(&self, index: u8) -> bool {
        self.attribute_entry(index, |attribute| attribute.is_static)
            .unwrap_or(false)
    }

    pub fn set_static(&self, index: u8, is_static: bool) {
        self.update_attribute(index, |attribute| attribute.is_static = is_static);
    }

    /// Type override for attribute `index`, if one was declared
    pub fn declared_type(&self, index: u8) -> Option<DataObjectType> {
        self.attribute_entry(index, |attribute| attribute.data_type)
            .flatten()
    }

    pub fn set_data_type(&self, index: u8, data_type: Option<DataObjectType>) {
        self.update_attribute(index, |attribute| attribute.data_type = data_type);
    }

    pub fn last_read_at(&self, index: u8) -> Option<SystemTime> {
        self.attribute_entry(index, |attribute| attribute.last_read_at)
            .flatten()
    }

    /// True when the attribute cannot be read, or is static and was read before
    pub fn is_already_read(&self, index: u8) -> bool {
        !self.can_read(index) || (self.is_static(index) && self.last_read_at(index).is_some())
    }

    /// Record a successful read of attribute `index`
    pub fn mark_read(&self, index: u8, at: SystemTime) {
        self.update_attribute(index, |attribute| attribute.last_read_at = Some(at));
    }

    /// Drop every read marker, e.g. after reconnecting to a device
    pub fn clear_read_marks(&self) {
        for attribute in write(&self.attributes).values_mut() {
            attribute.last_read_at = None;
        }
        debug!("{}: cleared read markers", self.object_type);
    }

    /// Attribute indices a bulk read should request, in ascending order
    ///
    /// With `all` every defined index is returned. Otherwise the logical
    /// name is included only while unset, dynamic attributes whenever they
    /// are readable and static attributes until they have been read once.
    pub fn attributes_to_read(&self, all: bool) -> Vec<u8> {
        let mut indices = Vec::with_capacity(self.attribute_count as usize);
        if self.attribute_count == 0 {
            return indices;
        }
        if all || self.logical_name().is_none() {
            indices.push(1);
        }
        for index in 2..=self.attribute_count {
            let include = if all {
                true
            } else if self.is_static(index) {
                !self.is_already_read(index)
            } else {
                self.can_read(index)
            };
            if include {
                indices.push(index);
            }
        }
        indices
    }

    /// Access mode of method `index`, `NoAccess` outside the defined range
    pub fn method_access_mode(&self, index: u8) -> MethodAccessMode {
        if !(1..=self.method_count).contains(&index) {
            return MethodAccessMode::NoAccess;
        }
        read(&self.methods)
            .get(&index)
            .map(|method| method.access_mode)
            .unwrap_or_default()
    }

    pub fn set_method_access_mode(&self, index: u8, mode: MethodAccessMode) {
        if !(1..=self.method_count).contains(&index) {
            warn!(
                "{}: ignoring access table update for method {} (defined: 1..={})",
                self.object_type, index, self.method_count
            );
            return;
        }
        write(&self.methods).insert(index, MethodDescriptor::new(index, mode));
    }

    pub fn can_invoke(&self, index: u8) -> bool {
        self.method_access_mode(index) == MethodAccessMode::Access
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Wire and configuration form of a capture object reference
///
/// `data_index` 0 selects the whole attribute value, `n >= 1` selects the
/// n-th leaf (1-based, depth-first) of a composite value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureObjectDefinition {
    pub class_id: u16,
    pub logical_name: ObisCode,
    pub attribute_index: u8,
    #[serde(default)]
    pub data_index: u16,
}

impl CaptureObjectDefinition {
    pub fn new(class_id: u16, logical_name: ObisCode, attribute_index: u8) -> Self {
        Self {
            class_id,
            logical_name,
            attribute_index,
            data_index: 0,
        }
    }

    pub fn with_data_index(mut self, data_index: u16) -> Self {
        self.data_index = data_index;
        self
    }

    /// `structure { long-unsigned, octet-string, integer, long-unsigned }`
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` for attribute indices above 127, which the
    /// `integer` member cannot carry.
    pub fn to_data_object(&self) -> DlmsResult<DataObject> {
        let attribute_index = i8::try_from(self.attribute_index).map_err(|_| {
            DlmsError::InvalidData(format!(
                "Attribute index {} does not fit a capture object definition",
                self.attribute_index
            ))
        })?;
        Ok(DataObject::Structure(vec![
            DataObject::Unsigned16(self.class_id),
            DataObject::OctetString(self.logical_name.to_bytes().to_vec()),
            DataObject::Integer8(attribute_index),
            DataObject::Unsigned16(self.data_index),
        ]))
    }

    pub fn from_data_object(value: &DataObject) -> DlmsResult<Self> {
        let [class_id, logical_name, attribute_index, data_index] = value.as_structure()? else {
            return Err(DlmsError::InvalidData(format!(
                "Capture object definition needs 4 members, got {}",
                value.as_structure()?.len()
            )));
        };
        let attribute_index = u8::try_from(attribute_index.as_i64()?).map_err(|_| {
            DlmsError::InvalidData(format!("Invalid attribute index {}", attribute_index))
        })?;
        Ok(Self {
            class_id: class_id.as_u16()?,
            logical_name: ObisCode::from_bytes(logical_name.as_octet_string()?)?,
            attribute_index,
            data_index: data_index.as_u16()?,
        })
    }
}
