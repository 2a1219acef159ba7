//! Revalidating object references
//!
//! Properties do not hold arena keys directly. An [`ObjectReference`] caches
//! the last known key and revalidates it against the registry by stable
//! identity, so a despawn/respawn cycle heals transparently. A failed lookup
//! marks the reference invalid until a later identity match resurrects it.

use tracing::debug;
use uuid::Uuid;

use scenelink_host::{LiveObjectRegistry, ObjectKey};

/// Stable identity of a referenced host object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectTarget {
    Entity { stable_id: Uuid },
    SubEntity { entity_id: Uuid, name: String },
}

impl ObjectTarget {
    /// Stable id of the owning entity
    pub fn entity_id(&self) -> Uuid {
        match self {
            ObjectTarget::Entity { stable_id } => *stable_id,
            ObjectTarget::SubEntity { entity_id, .. } => *entity_id,
        }
    }

    /// Name of the owning sub-entity, if any
    pub fn sub_entity_name(&self) -> Option<&str> {
        match self {
            ObjectTarget::Entity { .. } => None,
            ObjectTarget::SubEntity { name, .. } => Some(name.as_str()),
        }
    }

    /// Resolve against the registry without touching any cached key
    pub fn resolve(&self, registry: &LiveObjectRegistry) -> Option<ObjectKey> {
        match self {
            ObjectTarget::Entity { stable_id } => registry.entity_by_stable_id(*stable_id),
            ObjectTarget::SubEntity { entity_id, name } => {
                registry.sub_entity_by_name(*entity_id, name)
            }
        }
    }
}

/// Cached, revalidating handle to a host object
#[derive(Debug, Clone)]
pub struct ObjectReference {
    pub target: ObjectTarget,
    key: Option<ObjectKey>,
    invalid: bool,
}

impl ObjectReference {
    pub fn new(target: ObjectTarget) -> Self {
        Self {
            target,
            key: None,
            invalid: false,
        }
    }

    pub fn with_key(target: ObjectTarget, key: ObjectKey) -> Self {
        Self {
            target,
            key: Some(key),
            invalid: false,
        }
    }

    /// Resolve the reference, revalidating the cached key when it went stale.
    /// A failed lookup marks the reference invalid, but every call retries the
    /// identity match, so a respawn under the same identity resurrects it.
    pub fn get(&mut self, registry: &LiveObjectRegistry) -> Option<ObjectKey> {
        if !self.invalid {
            if let Some(key) = self.key {
                if registry.contains(key) {
                    return Some(key);
                }
            }
        }
        match self.target.resolve(registry) {
            Some(key) => {
                self.key = Some(key);
                self.invalid = false;
                Some(key)
            }
            None => {
                if !self.invalid {
                    debug!(reference = ?self.target, "object reference went stale");
                }
                self.invalid = true;
                self.key = None;
                None
            }
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }
}

#[cfg(test)]
mod tests {
    use scenelink_host::EntitySpec;

    use super::*;

    #[test]
    fn test_reference_heals_across_respawn() {
        let mut reg = LiveObjectRegistry::new();
        let spec = EntitySpec::new("Lamp", "Lamp01");
        let id = spec.stable_id;
        let key = reg.spawn_entity(spec);

        let mut reference =
            ObjectReference::with_key(ObjectTarget::Entity { stable_id: id }, key);
        assert_eq!(reference.get(&reg), Some(key));

        reg.destroy_entity(id);
        let mut again = EntitySpec::new("Lamp", "Lamp01");
        again.stable_id = id;
        let new_key = reg.spawn_entity(again);

        assert_eq!(reference.get(&reg), Some(new_key));
        assert!(!reference.is_invalid());
    }

    #[test]
    fn test_invalid_reference_resurrects_on_identity_match() {
        let mut reg = LiveObjectRegistry::new();
        let spec = EntitySpec::new("Lamp", "Lamp01");
        let id = spec.stable_id;
        let key = reg.spawn_entity(spec);
        reg.destroy_entity(id);

        let mut reference =
            ObjectReference::with_key(ObjectTarget::Entity { stable_id: id }, key);
        assert_eq!(reference.get(&reg), None);
        assert!(reference.is_invalid());
        // stays dead while nothing matches
        assert_eq!(reference.get(&reg), None);

        // a respawn under the same identity brings the reference back
        let mut again = EntitySpec::new("Lamp", "Lamp01");
        again.stable_id = id;
        let new_key = reg.spawn_entity(again);
        assert_eq!(reference.get(&reg), Some(new_key));
        assert!(!reference.is_invalid());
    }
}
