//! SceneLink Core - Property Bridge and Scene Graph Synchronizer
//!
//! Mirrors a host application's live objects to a remote peer as a node
//! graph, bridges typed fields as value pins, and paces host frames against
//! peer execution.
//!
//! # Architecture
//!
//! - [`value`] - wire type tags and the byte codec
//! - [`reflect`] - property nodes, the field-to-property factory, and
//!   revalidating object references
//! - [`scene`] - the lazily populated mirrored outliner tree
//! - [`tasks`] - the deferred task queue bridging transport threads to the
//!   host tick
//! - [`sync`] - the controller, peer messages, functions, and frame pacing
//! - [`config`] - TOML-backed settings
//!
//! # Threading
//!
//! All mutable state lives in [`sync::SyncController`], owned by the host
//! tick. Transport callbacks go through a cloneable [`sync::BridgeHandle`]
//! which defers work onto the task queue; only frame pacing signals take
//! effect immediately.

pub mod config;
pub mod error;
pub mod reflect;
pub mod scene;
pub mod sync;
pub mod tasks;
pub mod value;

pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, Result};
pub use reflect::{
    CategoryFilter, ObjectReference, ObjectTarget, PropertyNode, PropertyObserver,
    PropertyRegistry, ShowAs,
};
pub use scene::{SceneGraph, TreeNode, TreeNodeKind};
pub use sync::{
    BridgeHandle, FramePacer, InboundMessage, OutboundMessage, PaceEvent, SpawnCatalog,
    SyncController, TemplateCatalog, Transport,
};
pub use value::TypeTag;
