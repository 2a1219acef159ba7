//! Host object model
//!
//! Top-level entities carry a stable id, outliner placement, and lifetime
//! flags. Sub-entities hang off an entity's root sub-object as a parent/child
//! chain and are addressed by (owner id, name).

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use slotmap::new_key_type;
use uuid::Uuid;

use crate::field::{FieldDescriptor, FieldSlot, ParamBlock};

new_key_type! {
    /// Versioned arena key for a live host object. A key held across a
    /// despawn/respawn never aliases the new object.
    pub struct ObjectKey;
}

bitflags! {
    /// Entity lifetime and visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        const EDITABLE = 1 << 0;
        const LISTED = 1 << 1;
        const TRANSIENT = 1 << 2;
        const TEMPLATE = 1 << 3;
        const SYSTEM = 1 << 4;
        /// World is in play mode
        const IN_PLAY = 1 << 5;
    }
}

/// Entity- or sub-entity-specific part of a host object
#[derive(Debug, Clone)]
pub enum ObjectDetail {
    Entity {
        /// Stable id surviving the object's arena key
        stable_id: Uuid,
        /// Outliner folder path, `/`-separated
        folder_path: String,
        /// Entity this one is attached under, if any
        outliner_parent: Option<Uuid>,
        flags: EntityFlags,
        tags: Vec<String>,
        /// Root of the sub-entity chain
        root_sub: Option<ObjectKey>,
    },
    SubEntity {
        /// Stable id of the owning entity
        owner: Uuid,
        name: String,
        children: Vec<ObjectKey>,
    },
}

/// Host-side function callable through the bridge
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub display_name: Option<String>,
    pub params: Vec<FieldDescriptor>,
    pub body: HostFn,
}

pub type HostFn = Arc<dyn Fn(&mut HostObject, &mut ParamBlock) + Send + Sync>;

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("params", &self.params.len())
            .finish()
    }
}

impl FunctionDescriptor {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A live object in the host world
#[derive(Debug, Clone)]
pub struct HostObject {
    pub class_name: String,
    pub label: String,
    pub detail: ObjectDetail,
    pub fields: Vec<FieldSlot>,
    pub functions: Vec<FunctionDescriptor>,
    /// Count of transform refreshes requested after sub-entity writes
    pub transform_refreshes: u32,
}

impl HostObject {
    pub fn stable_id(&self) -> Option<Uuid> {
        match &self.detail {
            ObjectDetail::Entity { stable_id, .. } => Some(*stable_id),
            ObjectDetail::SubEntity { .. } => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.detail, ObjectDetail::Entity { .. })
    }
}

/// Whether an entity should appear in the bridged outliner.
///
/// Transient entities are shown while the world is in play, or when tagged
/// persistent. Templates and system entities never show.
pub fn is_entity_displayable(flags: EntityFlags, tags: &[String]) -> bool {
    if !flags.contains(EntityFlags::EDITABLE) || !flags.contains(EntityFlags::LISTED) {
        return false;
    }
    let lifetime_ok = flags.contains(EntityFlags::IN_PLAY)
        || !flags.contains(EntityFlags::TRANSIENT)
        || tags.iter().any(|t| t == "persistent");
    lifetime_ok
        && !flags.contains(EntityFlags::TEMPLATE)
        && !flags.contains(EntityFlags::SYSTEM)
}
