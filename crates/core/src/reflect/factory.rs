//! Property construction and registration
//!
//! The factory turns typed host fields into [`PropertyNode`] trees: it
//! classifies the field kind into a wire tag, captures the current value as
//! the default buffer, and expands composite structs and widget objects into
//! child nodes. Registration indexes every non-void node by id so inbound
//! messages can address it.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace};
use uuid::Uuid;

use scenelink_host::{
    lookup, zeroed_value, FieldDescriptor, FieldFlags, FieldKind, FieldValue, LiveObjectRegistry,
    ObjectRefValue, StructIdent,
};

use crate::reflect::property::{PropertyNode, ShowAs};
use crate::reflect::reference::{ObjectReference, ObjectTarget};
use crate::value::{codec, TypeTag};

/// Categories hidden per host class
#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    hidden: HashMap<String, HashSet<String>>,
}

impl CategoryFilter {
    pub fn hide(&mut self, class_name: impl Into<String>, category: impl Into<String>) {
        self.hidden
            .entry(class_name.into())
            .or_default()
            .insert(category.into());
    }

    pub fn is_hidden(&self, class_name: &str, category: &str) -> bool {
        self.hidden
            .get(class_name)
            .is_some_and(|set| set.contains(category))
    }
}

/// Hook for side effects during property construction
pub trait PropertyObserver {
    fn property_created(&mut self, property: &PropertyNode);

    /// A texture pin was created for the given render target. The returned
    /// bytes become the pin's data buffer.
    fn texture_pin_added(&mut self, property_id: Uuid, target: Uuid) -> Option<Vec<u8>>;

    fn reset(&mut self);
}

/// Shared inputs for one factory invocation
pub struct FactoryContext<'a, 'o> {
    pub host: &'a LiveObjectRegistry,
    pub hidden: &'a CategoryFilter,
    pub observer: Option<&'o mut (dyn PropertyObserver + 'static)>,
}

/// Category and naming context carried down struct and widget expansions
#[derive(Debug, Clone)]
pub struct StructContext {
    pub type_name: String,
    pub category: String,
    pub display: String,
}

/// Whether a field may be bridged at all for the given owning class
pub fn is_field_visible(desc: &FieldDescriptor, class_name: &str, hidden: &CategoryFilter) -> bool {
    let flags = desc.flags;
    flags.contains(FieldFlags::EDIT)
        && flags.contains(FieldFlags::PUBLIC)
        && !flags.contains(FieldFlags::DEPRECATED)
        && !flags.contains(FieldFlags::DISABLE_EDIT_ON_INSTANCE)
        && !hidden.is_hidden(class_name, desc.category())
}

/// Map a field kind (and, for object references, its current value) to a
/// wire tag. Containers do not bridge.
pub fn classify(kind: &FieldKind, value: Option<&FieldValue>) -> Option<TypeTag> {
    let tag = match kind {
        FieldKind::Enum(_) => TypeTag::EnumAsString,
        FieldKind::F32 => TypeTag::F32,
        FieldKind::F64 => TypeTag::F64,
        FieldKind::I8 => TypeTag::I8,
        FieldKind::I16 => TypeTag::I16,
        FieldKind::I32 => TypeTag::I32,
        FieldKind::I64 => TypeTag::I64,
        FieldKind::U8 => TypeTag::U8,
        FieldKind::U16 => TypeTag::U16,
        FieldKind::U32 => TypeTag::U32,
        FieldKind::U64 => TypeTag::U64,
        FieldKind::Bool => TypeTag::Bool,
        FieldKind::Text | FieldKind::Name | FieldKind::Str => TypeTag::String,
        FieldKind::ObjectRef => match value {
            Some(FieldValue::ObjectRef(ObjectRefValue::RenderTarget(_))) => TypeTag::TextureHandle,
            _ => TypeTag::ObjectReference,
        },
        FieldKind::Struct(desc) => match desc.ident {
            StructIdent::Vec2 => TypeTag::Vec2,
            StructIdent::Vec3 => TypeTag::Vec3,
            StructIdent::Vec4 | StructIdent::Quat => TypeTag::Vec4,
            StructIdent::Rotator => TypeTag::Rotator,
            StructIdent::Track => TypeTag::Track,
            StructIdent::Other => TypeTag::AutoStruct,
        },
        FieldKind::Array | FieldKind::Map => return None,
    };
    Some(tag)
}

fn encode_f64s(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Build a property node (and its children) for one host field.
///
/// Returns `None` for unbridgeable kinds. The node is not yet registered;
/// pass it to [`PropertyRegistry::insert`] to make it addressable.
pub fn create_property(
    owner: Option<&ObjectReference>,
    desc: &FieldDescriptor,
    ctx: &mut FactoryContext<'_, '_>,
    parent_category: &str,
    struct_base: &[String],
    parent_struct: Option<&StructContext>,
) -> Option<PropertyNode> {
    let mut field_path: Vec<String> = struct_base.to_vec();
    field_path.push(desc.name.clone());

    // current host value, or the kind's zero for detached (parameter) nodes
    let resolved = owner.and_then(|o| {
        let key = o.target.resolve(ctx.host)?;
        ctx.host.get(key)
    });
    let current = resolved
        .and_then(|obj| lookup(&obj.fields, &field_path).cloned())
        .unwrap_or_else(|| zeroed_value(&desc.kind));

    let type_tag = classify(&desc.kind, Some(&current))?;
    let class_name = resolved.map(|obj| obj.class_name.clone()).unwrap_or_default();

    let (category, display_name) = match parent_struct {
        Some(sc) => {
            let own = desc.category();
            let category = if own == sc.type_name {
                sc.category.clone()
            } else {
                format!("{}|{}", sc.category, own)
            };
            (category, format!("{}_{}", sc.display, desc.display()))
        }
        None => {
            let category = if parent_category.is_empty() {
                desc.category().to_string()
            } else {
                format!("{}|{}", parent_category, desc.category())
            };
            (category, desc.display().to_string())
        }
    };

    let id = Uuid::new_v4();
    let mut metadata = BTreeMap::new();
    metadata.insert("property".to_string(), desc.name.clone());
    metadata.insert("propertyPath".to_string(), field_path.join("/"));
    if !struct_base.is_empty() {
        metadata.insert("containerPath".to_string(), struct_base.join("/"));
    }
    if let Some(owner) = owner {
        metadata.insert("actorId".to_string(), owner.target.entity_id().to_string());
        if let ObjectTarget::SubEntity { name, .. } = &owner.target {
            metadata.insert("component".to_string(), name.clone());
        }
    }
    if let Some(min) = &desc.ui_min {
        metadata.insert("UIMin".to_string(), min.clone());
    }
    if let Some(max) = &desc.ui_max {
        metadata.insert("UIMax".to_string(), max.clone());
    }

    let mut data = codec::encode_value(&current, &desc.kind);
    let (mut min, mut max) = match type_tag {
        TypeTag::Rotator => (
            encode_f64s(&[0.0, 0.0, 0.0]),
            encode_f64s(&[359.999, 359.999, 359.999]),
        ),
        _ => (Vec::new(), Vec::new()),
    };
    let mut default = data.clone();

    // expand composites into child nodes
    let mut children = Vec::new();
    match (&desc.kind, &current) {
        (FieldKind::Struct(sdesc), _) if sdesc.ident == StructIdent::Other => {
            let sc = StructContext {
                type_name: sdesc.name.clone(),
                category: category.clone(),
                display: display_name.clone(),
            };
            for field in &sdesc.fields {
                if !is_field_visible(field, &class_name, ctx.hidden) {
                    trace!(field = %field.name, "skipping hidden struct field");
                    continue;
                }
                if let Some(child) =
                    create_property(owner, field, ctx, parent_category, &field_path, Some(&sc))
                {
                    children.push(child);
                }
            }
        }
        (FieldKind::ObjectRef, FieldValue::ObjectRef(ObjectRefValue::Widget(widget))) => {
            let sc = StructContext {
                type_name: widget.class_name.clone(),
                category: category.clone(),
                display: display_name.clone(),
            };
            for slot in &widget.fields {
                if !is_field_visible(&slot.desc, &widget.class_name, ctx.hidden) {
                    continue;
                }
                if let Some(child) = create_property(
                    owner,
                    &slot.desc,
                    ctx,
                    parent_category,
                    &field_path,
                    Some(&sc),
                ) {
                    children.push(child);
                }
            }
        }
        _ => {}
    }

    if matches!(
        type_tag,
        TypeTag::Void | TypeTag::AutoStruct | TypeTag::ObjectReference
    ) {
        data.clear();
        default.clear();
        min.clear();
        max.clear();
    }

    let mut node = PropertyNode {
        id,
        type_tag,
        display_name,
        category,
        data,
        min,
        max,
        default,
        read_only: !desc.flags.contains(FieldFlags::EDIT),
        advanced: desc.flags.contains(FieldFlags::ADVANCED),
        transient: desc.flags.contains(FieldFlags::TRANSIENT),
        show_as: ShowAs::Property,
        metadata,
        owner: owner.cloned(),
        field_path,
        field_kind: desc.kind.clone(),
        children,
    };

    if let Some(observer) = ctx.observer.as_deref_mut() {
        if type_tag == TypeTag::TextureHandle {
            if let FieldValue::ObjectRef(ObjectRefValue::RenderTarget(target)) = &current {
                if let Some(bytes) = observer.texture_pin_added(node.id, *target) {
                    node.data = bytes;
                }
            }
        }
        observer.property_created(&node);
    }

    Some(node)
}

/// Every addressable property, indexed across all bridged objects
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    roots: HashMap<Uuid, PropertyNode>,
    /// Registered node id to the id of the tree root containing it
    root_of: HashMap<Uuid, Uuid>,
    /// (owning entity id, sub-entity name or "", field path) to node id
    by_field: HashMap<(Uuid, String, String), Uuid>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property tree. Void-tagged nodes stay in the tree but are
    /// not addressable by id. Returns the ids that were registered.
    pub fn insert(&mut self, root: PropertyNode) -> Vec<Uuid> {
        let root_id = root.id;
        let mut registered = Vec::new();
        let mut stack = vec![&root];
        while let Some(node) = stack.pop() {
            if node.type_tag != TypeTag::Void {
                self.root_of.insert(node.id, root_id);
                if let Some(owner) = &node.owner {
                    self.by_field.insert(
                        (
                            owner.target.entity_id(),
                            owner.target.sub_entity_name().unwrap_or("").to_string(),
                            node.path_key(),
                        ),
                        node.id,
                    );
                }
                registered.push(node.id);
            }
            stack.extend(node.children.iter());
        }
        self.roots.insert(root_id, root);
        debug!(%root_id, count = registered.len(), "registered property tree");
        registered
    }

    pub fn get(&self, id: Uuid) -> Option<&PropertyNode> {
        let root_id = self.root_of.get(&id)?;
        self.roots.get(root_id)?.find(id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut PropertyNode> {
        let root_id = self.root_of.get(&id)?;
        self.roots.get_mut(root_id)?.find_mut(id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.root_of.contains_key(&id)
    }

    pub fn by_field(&self, entity_id: Uuid, component: Option<&str>, path: &str) -> Option<Uuid> {
        self.by_field
            .get(&(
                entity_id,
                component.unwrap_or("").to_string(),
                path.to_string(),
            ))
            .copied()
    }

    /// Drop one property tree by its root id
    pub fn remove_root(&mut self, root_id: Uuid) -> Option<PropertyNode> {
        let root = self.roots.remove(&root_id)?;
        self.unindex(&root);
        Some(root)
    }

    /// Drop every property tree owned by the given entity
    pub fn remove_owned_by(&mut self, entity_id: Uuid) -> Vec<Uuid> {
        let root_ids: Vec<Uuid> = self
            .roots
            .iter()
            .filter(|(_, node)| {
                node.owner
                    .as_ref()
                    .is_some_and(|o| o.target.entity_id() == entity_id)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &root_ids {
            if let Some(root) = self.roots.remove(id) {
                self.unindex(&root);
            }
        }
        root_ids
    }

    fn unindex(&mut self, root: &PropertyNode) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.root_of.remove(&node.id);
            if let Some(owner) = &node.owner {
                self.by_field.remove(&(
                    owner.target.entity_id(),
                    owner.target.sub_entity_name().unwrap_or("").to_string(),
                    node.path_key(),
                ));
            }
            stack.extend(node.children.iter());
        }
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.root_of.clear();
        self.by_field.clear();
    }

    pub fn len(&self) -> usize {
        self.root_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_of.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scenelink_host::{
        EntitySpec, EnumDescriptor, FieldSlot, StructDescriptor, SubEntitySpec,
    };

    use super::*;

    fn ctx_parts() -> (LiveObjectRegistry, CategoryFilter) {
        (LiveObjectRegistry::new(), CategoryFilter::default())
    }

    fn spawn_with_fields(reg: &mut LiveObjectRegistry, fields: Vec<FieldSlot>) -> ObjectReference {
        let mut spec = EntitySpec::new("Lamp", "Lamp01");
        let id = spec.stable_id;
        spec.fields = fields;
        reg.spawn_entity(spec);
        ObjectReference::new(ObjectTarget::Entity { stable_id: id })
    }

    fn make(
        owner: &ObjectReference,
        desc: &FieldDescriptor,
        host: &LiveObjectRegistry,
        hidden: &CategoryFilter,
    ) -> Option<PropertyNode> {
        let mut ctx = FactoryContext {
            host,
            hidden,
            observer: None,
        };
        create_property(Some(owner), desc, &mut ctx, "", &[], None)
    }

    #[test]
    fn test_visibility_filter() {
        let hidden = CategoryFilter::default();
        let visible = FieldDescriptor::new("a", FieldKind::F32);
        assert!(is_field_visible(&visible, "Lamp", &hidden));

        let deprecated = FieldDescriptor::new("b", FieldKind::F32)
            .with_flags(FieldFlags::EDIT | FieldFlags::PUBLIC | FieldFlags::DEPRECATED);
        assert!(!is_field_visible(&deprecated, "Lamp", &hidden));

        let locked = FieldDescriptor::new("c", FieldKind::F32).with_flags(
            FieldFlags::EDIT | FieldFlags::PUBLIC | FieldFlags::DISABLE_EDIT_ON_INSTANCE,
        );
        assert!(!is_field_visible(&locked, "Lamp", &hidden));

        let mut hidden = CategoryFilter::default();
        hidden.hide("Lamp", "Internal");
        let categorized = FieldDescriptor::new("d", FieldKind::F32).with_category("Internal");
        assert!(!is_field_visible(&categorized, "Lamp", &hidden));
        assert!(is_field_visible(&categorized, "Other", &hidden));
    }

    #[test]
    fn test_classify_dispatch() {
        assert_eq!(classify(&FieldKind::F32, None), Some(TypeTag::F32));
        assert_eq!(classify(&FieldKind::Name, None), Some(TypeTag::String));
        assert_eq!(
            classify(
                &FieldKind::Enum(Arc::new(EnumDescriptor::new("E", vec![]))),
                None
            ),
            Some(TypeTag::EnumAsString)
        );
        assert_eq!(
            classify(
                &FieldKind::Struct(Arc::new(StructDescriptor::well_known(
                    StructIdent::Quat,
                    "Quat"
                ))),
                None
            ),
            Some(TypeTag::Vec4)
        );
        assert_eq!(classify(&FieldKind::Array, None), None);
        assert_eq!(classify(&FieldKind::Map, None), None);
        assert_eq!(
            classify(
                &FieldKind::ObjectRef,
                Some(&FieldValue::ObjectRef(ObjectRefValue::RenderTarget(
                    Uuid::new_v4()
                )))
            ),
            Some(TypeTag::TextureHandle)
        );
        assert_eq!(
            classify(
                &FieldKind::ObjectRef,
                Some(&FieldValue::ObjectRef(ObjectRefValue::None))
            ),
            Some(TypeTag::ObjectReference)
        );
    }

    #[test]
    fn test_enum_property_data_is_member_name() {
        let (mut reg, hidden) = ctx_parts();
        let kind = FieldKind::Enum(Arc::new(EnumDescriptor::new(
            "RunState",
            vec![("Idle".into(), 0), ("Running".into(), 1)],
        )));
        let desc = FieldDescriptor::new("state", kind);
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(desc.clone(), FieldValue::Enum(1))],
        );
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();
        assert_eq!(prop.type_tag, TypeTag::EnumAsString);
        assert_eq!(prop.data, codec::encode_string("Running"));
        assert_eq!(prop.default, prop.data);
    }

    #[test]
    fn test_rotator_gets_degree_bounds() {
        let (mut reg, hidden) = ctx_parts();
        let kind = FieldKind::Struct(Arc::new(StructDescriptor::well_known(
            StructIdent::Rotator,
            "Rotator",
        )));
        let desc = FieldDescriptor::new("spin", kind);
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(desc.clone(), FieldValue::Rotator([0.0; 3]))],
        );
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();
        assert_eq!(prop.min, encode_f64s(&[0.0, 0.0, 0.0]));
        assert_eq!(prop.max, encode_f64s(&[359.999, 359.999, 359.999]));
    }

    #[test]
    fn test_struct_category_collapse() {
        let (mut reg, hidden) = ctx_parts();
        // child "inner" is categorized after its struct type, which collapses
        // into the parent category; "other" keeps its own nested category
        let inner = FieldDescriptor::new("inner", FieldKind::F32).with_category("Shape");
        let other = FieldDescriptor::new("other", FieldKind::F32).with_category("Tuning");
        let sdesc = Arc::new(StructDescriptor::composite(
            "Shape",
            vec![inner.clone(), other.clone()],
        ));
        let desc = FieldDescriptor::new("shape", FieldKind::Struct(sdesc))
            .with_category("Geometry");
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(
                desc.clone(),
                FieldValue::Struct(vec![
                    FieldSlot::new(inner, FieldValue::F32(1.0)),
                    FieldSlot::new(other, FieldValue::F32(2.0)),
                ]),
            )],
        );
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();
        assert_eq!(prop.type_tag, TypeTag::AutoStruct);
        assert_eq!(prop.category, "Geometry");
        assert_eq!(prop.children.len(), 2);

        let inner_node = &prop.children[0];
        assert_eq!(inner_node.category, "Geometry");
        assert_eq!(inner_node.display_name, "shape_inner");
        assert_eq!(inner_node.field_path, vec!["shape", "inner"]);

        let other_node = &prop.children[1];
        assert_eq!(other_node.category, "Geometry|Tuning");
        assert_eq!(other_node.display_name, "shape_other");
    }

    #[test]
    fn test_auto_struct_buffers_cleared() {
        let (mut reg, hidden) = ctx_parts();
        let sdesc = Arc::new(StructDescriptor::composite("Empty", vec![]));
        let desc = FieldDescriptor::new("empty", FieldKind::Struct(sdesc));
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(desc.clone(), FieldValue::Struct(vec![]))],
        );
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();
        assert!(prop.data.is_empty());
        assert!(prop.default.is_empty());
    }

    #[test]
    fn test_registry_addresses_children_not_void() {
        let (mut reg, hidden) = ctx_parts();
        let inner = FieldDescriptor::new("inner", FieldKind::F32);
        let sdesc = Arc::new(StructDescriptor::composite("Shape", vec![inner.clone()]));
        let desc = FieldDescriptor::new("shape", FieldKind::Struct(sdesc));
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(
                desc.clone(),
                FieldValue::Struct(vec![FieldSlot::new(inner, FieldValue::F32(7.0))]),
            )],
        );
        let entity_id = owner.target.entity_id();
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();
        let child_id = prop.children[0].id;
        let root_id = prop.id;

        let mut props = PropertyRegistry::new();
        let registered = props.insert(prop);
        assert_eq!(registered.len(), 2);
        assert!(props.contains(child_id));
        assert_eq!(props.by_field(entity_id, None, "shape/inner"), Some(child_id));

        // child write routes through the registry
        assert!(props.get_mut(child_id).is_some());

        props.remove_root(root_id);
        assert!(!props.contains(child_id));
        assert!(props.is_empty());
    }

    #[test]
    fn test_remove_owned_by_entity() {
        let (mut reg, hidden) = ctx_parts();
        let desc = FieldDescriptor::new("intensity", FieldKind::F32);
        let owner = spawn_with_fields(
            &mut reg,
            vec![FieldSlot::new(desc.clone(), FieldValue::F32(1.0))],
        );
        let entity_id = owner.target.entity_id();
        let prop = make(&owner, &desc, &reg, &hidden).unwrap();

        let mut props = PropertyRegistry::new();
        props.insert(prop);
        assert_eq!(props.len(), 1);
        let removed = props.remove_owned_by(entity_id);
        assert_eq!(removed.len(), 1);
        assert!(props.is_empty());
    }

    #[derive(Default)]
    struct CountingObserver {
        created: Vec<Uuid>,
    }

    impl PropertyObserver for CountingObserver {
        fn property_created(&mut self, property: &PropertyNode) {
            self.created.push(property.id);
        }

        fn texture_pin_added(&mut self, _property_id: Uuid, _target: Uuid) -> Option<Vec<u8>> {
            None
        }

        fn reset(&mut self) {
            self.created.clear();
        }
    }

    #[test]
    fn test_observer_reborrows_across_factory_calls() {
        let (mut reg, hidden) = ctx_parts();
        let a = FieldDescriptor::new("intensity", FieldKind::F32);
        let b = FieldDescriptor::new("exposure", FieldKind::F32);
        let owner = spawn_with_fields(
            &mut reg,
            vec![
                FieldSlot::new(a.clone(), FieldValue::F32(1.0)),
                FieldSlot::new(b.clone(), FieldValue::F32(2.0)),
            ],
        );

        // one observer threaded through a fresh context per field, the way
        // the controller builds bindings
        let mut observer = CountingObserver::default();
        let mut slot: Option<&mut dyn PropertyObserver> = Some(&mut observer);
        let mut ids = Vec::new();
        for desc in [&a, &b] {
            let mut ctx = FactoryContext {
                host: &reg,
                hidden: &hidden,
                observer: slot.as_deref_mut(),
            };
            let prop = create_property(Some(&owner), desc, &mut ctx, "", &[], None).unwrap();
            ids.push(prop.id);
        }
        assert_eq!(observer.created, ids);
    }

    #[test]
    fn test_by_field_separates_entity_and_sub_entity_owners() {
        let (mut reg, hidden) = ctx_parts();
        let desc = FieldDescriptor::new("focal", FieldKind::F32);
        let mut spec = EntitySpec::new("Camera", "Cam01");
        let entity_id = spec.stable_id;
        spec.fields = vec![FieldSlot::new(desc.clone(), FieldValue::F32(1.0))];
        spec.root_sub = Some(SubEntitySpec {
            name: "Lens".to_string(),
            class_name: "LensUnit".to_string(),
            fields: vec![FieldSlot::new(desc.clone(), FieldValue::F32(35.0))],
            children: Vec::new(),
        });
        reg.spawn_entity(spec);

        let entity_owner = ObjectReference::new(ObjectTarget::Entity {
            stable_id: entity_id,
        });
        let sub_owner = ObjectReference::new(ObjectTarget::SubEntity {
            entity_id,
            name: "Lens".to_string(),
        });
        let on_entity = make(&entity_owner, &desc, &reg, &hidden).unwrap();
        let on_sub = make(&sub_owner, &desc, &reg, &hidden).unwrap();
        let entity_prop = on_entity.id;
        let sub_prop = on_sub.id;

        let mut props = PropertyRegistry::new();
        props.insert(on_entity);
        props.insert(on_sub);
        assert_eq!(props.by_field(entity_id, None, "focal"), Some(entity_prop));
        assert_eq!(
            props.by_field(entity_id, Some("Lens"), "focal"),
            Some(sub_prop)
        );

        props.remove_owned_by(entity_id);
        assert!(props.is_empty());
    }
}
