//! Peer message model
//!
//! Serde types for everything the bridge sends to or receives from the
//! remote peer, plus the [`Transport`] seam the controller sends through.
//! Graph edits are expressed as [`NodeUpdate`] deltas scoped to a parent
//! node.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scenelink_host::FieldKind;

use crate::reflect::{PropertyNode, ShowAs};

/// What an update clears on the target node before applying additions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearFlags {
    None,
    /// Replace the node's pins
    Pins,
    /// Replace everything under the node
    Any,
}

/// Widget hint attached to a pin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visualizer {
    ComboBox { list_name: String },
}

/// Peer-facing view of one property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinSnapshot {
    pub id: Uuid,
    pub name: String,
    pub type_name: String,
    pub show_as: ShowAs,
    pub category: String,
    pub visualizer: Option<Visualizer>,
    pub data: Vec<u8>,
    pub min: Vec<u8>,
    pub max: Vec<u8>,
    pub default: Vec<u8>,
    pub read_only: bool,
    pub advanced: bool,
    pub transient: bool,
    pub metadata: Vec<(String, String)>,
}

impl PinSnapshot {
    pub fn of(prop: &PropertyNode) -> Self {
        let visualizer = match &prop.field_kind {
            FieldKind::Enum(desc) => Some(Visualizer::ComboBox {
                list_name: desc.name.clone(),
            }),
            _ => None,
        };
        Self {
            id: prop.id,
            name: prop.display_name.clone(),
            type_name: prop.type_tag.wire_name().to_string(),
            show_as: prop.show_as,
            category: prop.category.clone(),
            visualizer,
            data: prop.data.clone(),
            min: prop.min.clone(),
            max: prop.max.clone(),
            default: prop.default.clone(),
            read_only: prop.read_only,
            advanced: prop.advanced,
            transient: prop.transient,
            metadata: prop
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Peer-facing view of a callable function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSnapshot {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub pins: Vec<PinSnapshot>,
}

/// Peer-facing view of one scene graph node, recursive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: Uuid,
    pub name: String,
    pub node_type: String,
    pub pins: Vec<PinSnapshot>,
    pub functions: Vec<FunctionSnapshot>,
    pub children: Vec<NodeSnapshot>,
    pub metadata: Vec<(String, String)>,
}

/// Delta applied to the children and pins of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub parent_id: Uuid,
    pub clear: ClearFlags,
    pub added_pins: Vec<PinSnapshot>,
    pub removed_pin_ids: Vec<Uuid>,
    pub added_functions: Vec<FunctionSnapshot>,
    pub added_nodes: Vec<NodeSnapshot>,
    pub removed_node_ids: Vec<Uuid>,
}

impl NodeUpdate {
    pub fn empty(parent_id: Uuid) -> Self {
        Self {
            parent_id,
            clear: ClearFlags::None,
            added_pins: Vec::new(),
            removed_pin_ids: Vec::new(),
            added_functions: Vec::new(),
            added_nodes: Vec::new(),
            removed_node_ids: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.clear == ClearFlags::None
            && self.added_pins.is_empty()
            && self.removed_pin_ids.is_empty()
            && self.added_functions.is_empty()
            && self.added_nodes.is_empty()
            && self.removed_node_ids.is_empty()
    }
}

/// A pin's value buffer changed on the host side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueChanged {
    pub pin_id: Uuid,
    pub value: Vec<u8>,
}

/// Published named string list (spawnable templates, enum members)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringListUpdate {
    pub list_name: String,
    pub items: Vec<String>,
}

impl StringListUpdate {
    /// Build a list, capping each entry at `max_len` bytes on a char
    /// boundary.
    pub fn new(list_name: impl Into<String>, items: Vec<String>, max_len: usize) -> Self {
        Self {
            list_name: list_name.into(),
            items: items
                .into_iter()
                .map(|s| truncate_to_boundary(s, max_len))
                .collect(),
        }
    }
}

fn truncate_to_boundary(mut s: String, max_len: usize) -> String {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

/// Everything the bridge sends to the peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutboundMessage {
    NodeUpdated(NodeUpdate),
    PinValueChanged(ValueChanged),
    StringList(StringListUpdate),
}

/// A node received back from the peer on import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedPin {
    pub id: Uuid,
    pub name: String,
    pub show_as: ShowAs,
    pub data: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedNode {
    pub id: Uuid,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
    pub pins: Vec<ImportedPin>,
    pub children: Vec<ImportedNode>,
}

/// Everything the peer sends to the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundMessage {
    Connected { peer_root: Uuid },
    Disconnected,
    NodeExpanded { node_id: Uuid },
    NodeSelected { node_id: Uuid },
    Executed { updates: Vec<(Uuid, Vec<u8>)> },
    PinValueChanged { pin_id: Uuid, value: Vec<u8> },
    PinShowAsChanged { pin_id: Uuid, show_as: ShowAs },
    FunctionCall { function_id: Uuid, params: Vec<(Uuid, Vec<u8>)> },
    NodeImported { root: ImportedNode },
    NodeRemoved { node_id: Uuid },
}

/// Outbound seam to the peer connection
pub trait Transport: Send {
    fn send(&self, message: OutboundMessage);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_truncation() {
        let long = "x".repeat(300);
        let list = StringListUpdate::new("spawnables", vec!["short".into(), long], 256);
        assert_eq!(list.items[0], "short");
        assert_eq!(list.items[1].len(), 256);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // four-byte scorpion emoji straddling the cap
        let s = format!("{}🦂", "a".repeat(254));
        let list = StringListUpdate::new("names", vec![s], 256);
        assert_eq!(list.items[0].len(), 254);
        assert!(list.items[0].chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_node_update_noop_detection() {
        let mut update = NodeUpdate::empty(Uuid::new_v4());
        assert!(update.is_noop());
        update.removed_node_ids.push(Uuid::new_v4());
        assert!(!update.is_noop());
    }

    #[test]
    fn test_messages_round_trip_as_json() {
        let update = OutboundMessage::NodeUpdated(NodeUpdate::empty(Uuid::new_v4()));
        let json = serde_json::to_string(&update).unwrap();
        let back: OutboundMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, OutboundMessage::NodeUpdated(u) if u.is_noop()));
    }
}
