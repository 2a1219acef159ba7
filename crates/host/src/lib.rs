//! SceneLink Host - Live Object Registry and Typed Field Model
//!
//! This crate models the host application's side of the bridge:
//! - Typed field descriptors and values, including nested structs and
//!   inline widget objects ([`field`])
//! - Entities, sub-entity chains, and callable host functions ([`object`])
//! - The arena of live objects with stable-id lookup ([`registry`])
//!
//! # Object Identity
//!
//! Objects are addressed two ways. An [`ObjectKey`] is a versioned arena key
//! that goes stale when the object is destroyed. Entities additionally carry
//! a stable [`uuid::Uuid`] that survives respawns and is the identity the
//! bridge advertises to the remote peer.

pub mod field;
pub mod object;
pub mod registry;

pub use field::{
    lookup, lookup_mut, lookup_slot, zeroed_value, EnumDescriptor, FieldDescriptor, FieldFlags,
    FieldKind, FieldSlot, FieldValue, ObjectRefValue, ParamBlock, StructDescriptor, StructIdent,
    TrackValue, WidgetObject,
};
pub use object::{
    is_entity_displayable, EntityFlags, FunctionDescriptor, HostFn, HostObject, ObjectDetail,
    ObjectKey,
};
pub use registry::{EntitySpec, LiveObjectRegistry, SubEntitySpec};
