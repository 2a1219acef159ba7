//! Bridged functions and the spawn catalog

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use scenelink_host::{EntitySpec, FieldDescriptor, LiveObjectRegistry, ObjectKey};

use crate::reflect::ObjectReference;
use crate::sync::messages::FunctionSnapshot;
use crate::sync::SyncController;

/// A host function exposed to the peer, with its parameters bridged as
/// detached properties
#[derive(Debug, Clone)]
pub struct FunctionBinding {
    pub id: Uuid,
    pub name: String,
    pub reference: ObjectReference,
    /// Property ids of every parameter
    pub params: Vec<Uuid>,
    /// Parameters whose values flow back after the call
    pub out_params: Vec<Uuid>,
    pub signature: Vec<FieldDescriptor>,
}

pub type CustomHandler = Arc<dyn Fn(&mut SyncController, &HashMap<Uuid, Vec<u8>>) + Send + Sync>;

/// A bridge-defined function with no host object behind it
#[derive(Clone)]
pub struct CustomFunction {
    pub id: Uuid,
    pub snapshot: FunctionSnapshot,
    pub handler: CustomHandler,
}

impl fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFunction")
            .field("id", &self.id)
            .field("name", &self.snapshot.name)
            .finish()
    }
}

/// Source of spawnable entity templates
pub trait SpawnCatalog: Send {
    fn template_names(&self) -> Vec<String>;

    fn spawn(&self, registry: &mut LiveObjectRegistry, name: &str) -> Option<ObjectKey>;
}

type SpecBuilder = Arc<dyn Fn() -> EntitySpec + Send + Sync>;

/// Catalog backed by registered spec builders
#[derive(Default)]
pub struct TemplateCatalog {
    templates: Vec<(String, SpecBuilder)>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn() -> EntitySpec + Send + Sync + 'static,
    {
        self.templates.push((name.into(), Arc::new(builder)));
    }
}

impl SpawnCatalog for TemplateCatalog {
    fn template_names(&self) -> Vec<String> {
        self.templates.iter().map(|(name, _)| name.clone()).collect()
    }

    fn spawn(&self, registry: &mut LiveObjectRegistry, name: &str) -> Option<ObjectKey> {
        let builder = self
            .templates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)?;
        Some(registry.spawn_entity((**builder)()))
    }
}
