//! Live object registry
//!
//! Arena of all live host objects plus a stable-id index for entities.
//! Spawning materializes an [`EntitySpec`] into arena slots; destruction
//! removes the entity and its whole sub-entity chain.

use std::collections::HashMap;

use slotmap::SlotMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::field::{FieldSlot, ParamBlock};
use crate::object::{
    EntityFlags, FunctionDescriptor, HostObject, ObjectDetail, ObjectKey,
};

/// Blueprint for spawning a sub-entity chain
#[derive(Debug, Clone, Default)]
pub struct SubEntitySpec {
    pub name: String,
    pub class_name: String,
    pub fields: Vec<FieldSlot>,
    pub children: Vec<SubEntitySpec>,
}

/// Blueprint for spawning an entity
#[derive(Debug, Clone)]
pub struct EntitySpec {
    pub class_name: String,
    pub label: String,
    pub stable_id: Uuid,
    pub folder_path: String,
    pub outliner_parent: Option<Uuid>,
    pub flags: EntityFlags,
    pub tags: Vec<String>,
    pub fields: Vec<FieldSlot>,
    pub functions: Vec<FunctionDescriptor>,
    pub root_sub: Option<SubEntitySpec>,
}

impl EntitySpec {
    pub fn new(class_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            label: label.into(),
            stable_id: Uuid::new_v4(),
            folder_path: String::new(),
            outliner_parent: None,
            flags: EntityFlags::EDITABLE | EntityFlags::LISTED,
            tags: Vec::new(),
            fields: Vec::new(),
            functions: Vec::new(),
            root_sub: None,
        }
    }
}

/// All live host objects, keyed by versioned arena key
#[derive(Debug, Default)]
pub struct LiveObjectRegistry {
    objects: SlotMap<ObjectKey, HostObject>,
    entity_index: HashMap<Uuid, ObjectKey>,
}

impl LiveObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_entity(&mut self, spec: EntitySpec) -> ObjectKey {
        let EntitySpec {
            class_name,
            label,
            stable_id,
            folder_path,
            outliner_parent,
            flags,
            tags,
            fields,
            functions,
            root_sub,
        } = spec;

        let root_sub_key = root_sub.map(|sub| self.spawn_sub_entity(stable_id, sub));

        let key = self.objects.insert(HostObject {
            class_name,
            label,
            detail: ObjectDetail::Entity {
                stable_id,
                folder_path,
                outliner_parent,
                flags,
                tags,
                root_sub: root_sub_key,
            },
            fields,
            functions,
            transform_refreshes: 0,
        });
        self.entity_index.insert(stable_id, key);
        debug!(%stable_id, "spawned entity");
        key
    }

    fn spawn_sub_entity(&mut self, owner: Uuid, spec: SubEntitySpec) -> ObjectKey {
        let children = spec
            .children
            .into_iter()
            .map(|child| self.spawn_sub_entity(owner, child))
            .collect();
        self.objects.insert(HostObject {
            class_name: spec.class_name,
            label: spec.name.clone(),
            detail: ObjectDetail::SubEntity {
                owner,
                name: spec.name,
                children,
            },
            fields: spec.fields,
            functions: Vec::new(),
            transform_refreshes: 0,
        })
    }

    /// Remove an entity and its whole sub-entity chain. Returns false if the
    /// stable id is unknown.
    pub fn destroy_entity(&mut self, stable_id: Uuid) -> bool {
        let Some(key) = self.entity_index.remove(&stable_id) else {
            warn!(%stable_id, "destroy requested for unknown entity");
            return false;
        };
        let root_sub = match self.objects.get(key).map(|o| &o.detail) {
            Some(ObjectDetail::Entity { root_sub, .. }) => *root_sub,
            _ => None,
        };
        if let Some(sub) = root_sub {
            self.destroy_sub_tree(sub);
        }
        self.objects.remove(key);
        debug!(%stable_id, "destroyed entity");
        true
    }

    fn destroy_sub_tree(&mut self, key: ObjectKey) {
        let children = match self.objects.get(key).map(|o| &o.detail) {
            Some(ObjectDetail::SubEntity { children, .. }) => children.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.destroy_sub_tree(child);
        }
        self.objects.remove(key);
    }

    pub fn entity_by_stable_id(&self, stable_id: Uuid) -> Option<ObjectKey> {
        self.entity_index.get(&stable_id).copied()
    }

    /// Find a sub-entity of an entity by name, walking the chain from the
    /// root sub-object.
    pub fn sub_entity_by_name(&self, entity_id: Uuid, name: &str) -> Option<ObjectKey> {
        let entity_key = self.entity_by_stable_id(entity_id)?;
        let root = match &self.objects.get(entity_key)?.detail {
            ObjectDetail::Entity { root_sub, .. } => (*root_sub)?,
            ObjectDetail::SubEntity { .. } => return None,
        };
        self.find_sub_named(root, name)
    }

    fn find_sub_named(&self, key: ObjectKey, name: &str) -> Option<ObjectKey> {
        let obj = self.objects.get(key)?;
        if let ObjectDetail::SubEntity {
            name: sub_name,
            children,
            ..
        } = &obj.detail
        {
            if sub_name == name {
                return Some(key);
            }
            for child in children {
                if let Some(found) = self.find_sub_named(*child, name) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn get(&self, key: ObjectKey) -> Option<&HostObject> {
        self.objects.get(key)
    }

    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut HostObject> {
        self.objects.get_mut(key)
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn iter_entities(&self) -> impl Iterator<Item = (ObjectKey, &HostObject)> {
        self.objects.iter().filter(|(_, o)| o.is_entity())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Give an entity a new stable id, rewriting the index and the owner id
    /// carried by its sub-entity chain. Used when an imported node dictates
    /// the identity of a freshly spawned entity.
    pub fn reassign_stable_id(&mut self, key: ObjectKey, new_id: Uuid) -> bool {
        let (old_id, root_sub) = match self.objects.get_mut(key) {
            Some(HostObject {
                detail:
                    ObjectDetail::Entity {
                        stable_id,
                        root_sub,
                        ..
                    },
                ..
            }) => {
                let old = *stable_id;
                *stable_id = new_id;
                (old, *root_sub)
            }
            _ => return false,
        };
        self.entity_index.remove(&old_id);
        self.entity_index.insert(new_id, key);
        if let Some(root) = root_sub {
            self.rewrite_sub_owner(root, new_id);
        }
        true
    }

    fn rewrite_sub_owner(&mut self, key: ObjectKey, new_id: Uuid) {
        let children = match self.objects.get_mut(key) {
            Some(HostObject {
                detail: ObjectDetail::SubEntity { owner, children, .. },
                ..
            }) => {
                *owner = new_id;
                children.clone()
            }
            _ => return,
        };
        for child in children {
            self.rewrite_sub_owner(child, new_id);
        }
    }

    /// Mark that a sub-entity write requires the owner's transform to be
    /// refreshed on the host side.
    pub fn refresh_transform(&mut self, key: ObjectKey) {
        if let Some(obj) = self.objects.get_mut(key) {
            obj.transform_refreshes += 1;
        }
    }

    /// Invoke a host function by name with the given parameter block.
    /// Returns false when the object or function does not exist.
    pub fn call_function(&mut self, key: ObjectKey, name: &str, params: &mut ParamBlock) -> bool {
        let body = match self.objects.get(key) {
            Some(obj) => obj
                .functions
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.body.clone()),
            None => None,
        };
        let Some(body) = body else {
            warn!(function = name, "host function call failed to resolve");
            return false;
        };
        if let Some(obj) = self.objects.get_mut(key) {
            (*body)(obj, params);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::field::{FieldDescriptor, FieldKind, FieldValue};

    fn spec_with_subs() -> EntitySpec {
        let mut spec = EntitySpec::new("CameraRig", "Rig01");
        spec.root_sub = Some(SubEntitySpec {
            name: "Root".into(),
            class_name: "SceneRoot".into(),
            fields: Vec::new(),
            children: vec![SubEntitySpec {
                name: "Lens".into(),
                class_name: "LensUnit".into(),
                fields: vec![FieldSlot::new(
                    FieldDescriptor::new("focal", FieldKind::F32),
                    FieldValue::F32(35.0),
                )],
                children: Vec::new(),
            }],
        });
        spec
    }

    #[test]
    fn test_spawn_and_lookup_by_stable_id() {
        let mut reg = LiveObjectRegistry::new();
        let spec = EntitySpec::new("Lamp", "Lamp01");
        let id = spec.stable_id;
        let key = reg.spawn_entity(spec);
        assert_eq!(reg.entity_by_stable_id(id), Some(key));
        assert!(reg.get(key).is_some());
    }

    #[test]
    fn test_sub_entity_by_name_walks_chain() {
        let mut reg = LiveObjectRegistry::new();
        let spec = spec_with_subs();
        let id = spec.stable_id;
        reg.spawn_entity(spec);

        let lens = reg.sub_entity_by_name(id, "Lens").expect("lens sub");
        assert_eq!(reg.get(lens).unwrap().class_name, "LensUnit");
        assert!(reg.sub_entity_by_name(id, "Missing").is_none());
    }

    #[test]
    fn test_destroy_removes_whole_chain() {
        let mut reg = LiveObjectRegistry::new();
        let spec = spec_with_subs();
        let id = spec.stable_id;
        let key = reg.spawn_entity(spec);
        let lens = reg.sub_entity_by_name(id, "Lens").unwrap();

        assert!(reg.destroy_entity(id));
        assert!(!reg.contains(key));
        assert!(!reg.contains(lens));
        assert!(reg.is_empty());
        assert!(!reg.destroy_entity(id));
    }

    #[test]
    fn test_stale_key_after_respawn() {
        let mut reg = LiveObjectRegistry::new();
        let spec = EntitySpec::new("Lamp", "Lamp01");
        let id = spec.stable_id;
        let old_key = reg.spawn_entity(spec);
        reg.destroy_entity(id);

        let mut again = EntitySpec::new("Lamp", "Lamp01");
        again.stable_id = id;
        let new_key = reg.spawn_entity(again);

        assert_ne!(old_key, new_key);
        assert!(!reg.contains(old_key));
        assert!(reg.contains(new_key));
    }

    #[test]
    fn test_call_function_dispatch() {
        let mut reg = LiveObjectRegistry::new();
        let mut spec = EntitySpec::new("Counter", "Counter01");
        spec.fields = vec![FieldSlot::new(
            FieldDescriptor::new("count", FieldKind::I32),
            FieldValue::I32(0),
        )];
        spec.functions = vec![FunctionDescriptor {
            name: "bump".into(),
            display_name: None,
            params: vec![FieldDescriptor::new("by", FieldKind::I32)],
            body: Arc::new(|obj, params| {
                let by = match params.field(&["by".to_string()]) {
                    Some(FieldValue::I32(v)) => *v,
                    _ => 0,
                };
                if let Some(FieldValue::I32(count)) = obj
                    .fields
                    .iter_mut()
                    .find(|s| s.desc.name == "count")
                    .map(|s| &mut s.value)
                {
                    *count += by;
                }
            }),
        }];
        let key = reg.spawn_entity(spec);

        let sig = vec![FieldDescriptor::new("by", FieldKind::I32)];
        let mut params = ParamBlock::zeroed(&sig);
        *params.field_mut(&["by".to_string()]).unwrap() = FieldValue::I32(3);

        assert!(reg.call_function(key, "bump", &mut params));
        assert!(!reg.call_function(key, "missing", &mut params));
        match &reg.get(key).unwrap().fields[0].value {
            FieldValue::I32(v) => assert_eq!(*v, 3),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_refresh_transform_counts() {
        let mut reg = LiveObjectRegistry::new();
        let key = reg.spawn_entity(EntitySpec::new("Lamp", "Lamp01"));
        reg.refresh_transform(key);
        reg.refresh_transform(key);
        assert_eq!(reg.get(key).unwrap().transform_refreshes, 2);
    }
}
