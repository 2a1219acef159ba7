//! Property reflection
//!
//! Bridges host fields into peer-addressable properties: revalidating object
//! references, property nodes with cached value buffers, and the factory
//! that classifies and expands host fields.

pub mod factory;
pub mod property;
pub mod reference;

pub use factory::{
    classify, create_property, is_field_visible, CategoryFilter, FactoryContext, PropertyObserver,
    PropertyRegistry, StructContext,
};
pub use property::{PropertyNode, ShowAs};
pub use reference::{ObjectReference, ObjectTarget};
