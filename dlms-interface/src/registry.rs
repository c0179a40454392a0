//! Object registry
//!
//! Holds the COSEM objects of one logical device, keyed by interface class
//! and logical name. Capture object definitions are bound to instances
//! through [`ObjectRegistry::resolve`], which instantiates a default object
//! when nothing is registered under the name yet.

use crate::compact_data::CompactData;
use crate::descriptor::ObjectType;
use crate::{Clock, CosemObject, Data, Register, ScalerUnit};
use dlms_core::{CosemDateTime, DataObject, DlmsError, DlmsResult, ObisCode};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type ObjectKey = (ObjectType, ObisCode);

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: RwLock<HashMap<ObjectKey, Arc<dyn CosemObject>>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under its class and logical name
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the object has no logical name or
    /// the key is already taken.
    pub async fn register(&self, object: Arc<dyn CosemObject>) -> DlmsResult<()> {
        let logical_name = object.logical_name().ok_or_else(|| {
            DlmsError::InvalidConfiguration(format!(
                "Cannot register {} without a logical name",
                object.object_type()
            ))
        })?;
        let key = (object.object_type(), logical_name);
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(DlmsError::InvalidConfiguration(format!(
                "{} {} is already registered",
                key.0, logical_name
            )));
        }
        info!("Registered {} {}", key.0, logical_name);
        objects.insert(key, object);
        Ok(())
    }

    pub async fn unregister(&self, object_type: ObjectType, logical_name: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects.write().await.remove(&(object_type, *logical_name))
    }

    pub async fn find(&self, object_type: ObjectType, logical_name: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects.read().await.get(&(object_type, *logical_name)).cloned()
    }

    /// Any object with this logical name, regardless of class
    pub async fn find_by_name(&self, logical_name: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects
            .read()
            .await
            .iter()
            .find(|((_, name), _)| name == logical_name)
            .map(|(_, object)| object.clone())
    }

    /// The registered object, or a new default instance registered in its place
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when nothing is registered and the
    /// class has no default instance.
    pub async fn resolve(&self, object_type: ObjectType, logical_name: ObisCode) -> DlmsResult<Arc<dyn CosemObject>> {
        let mut objects = self.objects.write().await;
        if let Some(object) = objects.get(&(object_type, logical_name)) {
            return Ok(object.clone());
        }
        let object = create_default(object_type, logical_name)?;
        debug!("Created default {} {}", object_type, logical_name);
        objects.insert((object_type, logical_name), object.clone());
        Ok(object)
    }

    /// All registered objects, in no particular order
    pub async fn objects(&self) -> Vec<Arc<dyn CosemObject>> {
        self.objects.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

/// Default instance of `object_type` named `logical_name`
///
/// # Errors
///
/// Returns `InvalidConfiguration` for classes without a default instance.
pub fn create_default(object_type: ObjectType, logical_name: ObisCode) -> DlmsResult<Arc<dyn CosemObject>> {
    match object_type {
        ObjectType::Data => Ok(Arc::new(Data::new(logical_name, DataObject::Null))),
        ObjectType::Register => Ok(Arc::new(Register::new(
            logical_name,
            DataObject::Unsigned32(0),
            ScalerUnit::none(),
        ))),
        ObjectType::Clock => Ok(Arc::new(Clock::new(logical_name, CosemDateTime::unspecified(), 0))),
        ObjectType::CompactData => Ok(Arc::new(CompactData::new(logical_name))),
        other => Err(DlmsError::InvalidConfiguration(format!(
            "No default instance for {}",
            other
        ))),
    }
}
