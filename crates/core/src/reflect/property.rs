//! Bridged property nodes
//!
//! A [`PropertyNode`] ties one host field to one peer-visible pin: the wire
//! type tag, cached value buffers, display metadata, and the owning object
//! reference plus field path used for write-through. Struct and widget
//! fields expand into child nodes forming a small tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use scenelink_host::{lookup, lookup_mut, FieldKind, LiveObjectRegistry, ParamBlock};

use crate::error::{BridgeError, Result};
use crate::reflect::reference::{ObjectReference, ObjectTarget};
use crate::value::{codec, TypeTag};

/// How the peer surfaces a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowAs {
    Property,
    InputPin,
    OutputPin,
}

/// One bridged property
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub id: Uuid,
    pub type_tag: TypeTag,
    pub display_name: String,
    pub category: String,
    /// Last value pushed to or pulled for the peer
    pub data: Vec<u8>,
    pub min: Vec<u8>,
    pub max: Vec<u8>,
    pub default: Vec<u8>,
    pub read_only: bool,
    pub advanced: bool,
    pub transient: bool,
    pub show_as: ShowAs,
    pub metadata: BTreeMap<String, String>,
    pub owner: Option<ObjectReference>,
    /// Field names from the owning object down to the bridged field
    pub field_path: Vec<String>,
    pub field_kind: FieldKind,
    pub children: Vec<PropertyNode>,
}

impl PropertyNode {
    /// Write peer bytes through to the owning host field.
    ///
    /// Non-writable tags are silently ignored. The cached `data` buffer is
    /// deliberately left alone; it refreshes on the next [`update_value`].
    ///
    /// [`update_value`]: PropertyNode::update_value
    pub fn set_value(&mut self, bytes: &[u8], registry: &mut LiveObjectRegistry) -> Result<()> {
        if !self.type_tag.is_writable() {
            trace!(id = %self.id, tag = ?self.type_tag, "ignoring write to non-writable property");
            return Ok(());
        }
        let Some(owner) = self.owner.as_mut() else {
            // detached property (custom function parameter), keep bytes locally
            self.data = bytes.to_vec();
            return Ok(());
        };
        let Some(key) = owner.get(registry) else {
            return Err(BridgeError::StaleReference(self.id));
        };
        let is_sub = matches!(owner.target, ObjectTarget::SubEntity { .. });
        let obj = registry
            .get_mut(key)
            .ok_or(BridgeError::StaleReference(self.id))?;
        let slot = lookup_mut(&mut obj.fields, &self.field_path)
            .ok_or(BridgeError::FieldPathUnresolved)?;
        codec::decode_into(self.type_tag, bytes, slot, &self.field_kind)?;
        if is_sub {
            registry.refresh_transform(key);
        }
        Ok(())
    }

    /// Write peer bytes into a parameter block instead of a live object
    pub fn set_value_in_block(&self, bytes: &[u8], block: &mut ParamBlock) -> Result<()> {
        if !self.type_tag.is_writable() {
            return Ok(());
        }
        let slot = lookup_mut(&mut block.slots, &self.field_path)
            .ok_or(BridgeError::FieldPathUnresolved)?;
        codec::decode_into(self.type_tag, bytes, slot, &self.field_kind)
    }

    /// Refresh the cached buffer from the owning host field and return it.
    /// When the owner no longer resolves, the last known buffer is kept.
    pub fn update_value(&mut self, registry: &LiveObjectRegistry) -> &[u8] {
        if self.type_tag.is_writable() {
            if let Some(owner) = self.owner.as_mut() {
                if let Some(key) = owner.get(registry) {
                    if let Some(obj) = registry.get(key) {
                        if let Some(value) = lookup(&obj.fields, &self.field_path) {
                            self.data = codec::encode_value(value, &self.field_kind);
                        }
                    }
                }
            }
        }
        &self.data
    }

    /// Refresh the cached buffer from a parameter block (out params after a
    /// host function call)
    pub fn update_value_from_block(&mut self, block: &ParamBlock) -> &[u8] {
        if self.type_tag.is_writable() {
            if let Some(value) = lookup(&block.slots, &self.field_path) {
                self.data = codec::encode_value(value, &self.field_kind);
            }
        }
        &self.data
    }

    /// This node's id plus every descendant's, preorder
    pub fn ids(&self) -> Vec<Uuid> {
        let mut out = vec![self.id];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }

    pub fn find(&self, id: Uuid) -> Option<&PropertyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut PropertyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Dotted path used for field-indexed lookups
    pub fn path_key(&self) -> String {
        self.field_path.join("/")
    }
}
