//! Sync controller
//!
//! Single owner of all bridge state. Transport callbacks never touch it
//! directly: a [`BridgeHandle`] enqueues closures onto the deferred task
//! queue and the host drains them once per tick via [`SyncController::tick`].
//! Only pacing signals bypass the queue, since the frame source may already
//! be blocked waiting for them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use scenelink_host::{
    is_entity_displayable, lookup_slot, FieldDescriptor, FieldFlags, LiveObjectRegistry,
    ObjectDetail, ObjectKey, ParamBlock,
};

use crate::config::BridgeConfig;
use crate::reflect::{
    create_property, is_field_visible, CategoryFilter, FactoryContext, ObjectReference,
    ObjectTarget, PropertyNode, PropertyObserver, PropertyRegistry, ShowAs,
};
use crate::scene::{SceneGraph, TreeNodeKind};
use crate::sync::functions::{CustomFunction, CustomHandler, FunctionBinding, SpawnCatalog};
use crate::sync::messages::{
    ClearFlags, FunctionSnapshot, ImportedNode, InboundMessage, NodeSnapshot, NodeUpdate,
    OutboundMessage, PinSnapshot, StringListUpdate, Transport, ValueChanged, Visualizer,
};
use crate::sync::pacing::FramePacer;
use crate::tasks::{TaskQueue, TaskSender};
use crate::value::{codec, TypeTag};

/// Host functions with this prefix are change-notification hooks, not
/// peer-callable operations.
const CHANGE_HOOK_PREFIX: &str = "on_changed_";

/// Owns the mirrored scene graph, the property registry, and the peer
/// connection state
pub struct SyncController {
    config: BridgeConfig,
    host: Arc<RwLock<LiveObjectRegistry>>,
    graph: SceneGraph,
    properties: PropertyRegistry,
    /// Properties surfaced as pins on the bridge's own peer node
    pins: Vec<Uuid>,
    functions: HashMap<Uuid, FunctionBinding>,
    custom_functions: HashMap<Uuid, CustomFunction>,
    catalog: Box<dyn SpawnCatalog>,
    transport: Box<dyn Transport>,
    pacer: Arc<FramePacer>,
    peer_root: Option<Uuid>,
    queue: TaskQueue,
    hidden: CategoryFilter,
    observer: Option<Box<dyn PropertyObserver>>,
}

impl SyncController {
    pub fn new(
        config: BridgeConfig,
        host: Arc<RwLock<LiveObjectRegistry>>,
        catalog: Box<dyn SpawnCatalog>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let queue = TaskQueue::new(config.queue_capacity);
        let graph = SceneGraph::new(config.root_label.clone());
        let mut controller = Self {
            config,
            host,
            graph,
            properties: PropertyRegistry::new(),
            pins: Vec::new(),
            functions: HashMap::new(),
            custom_functions: HashMap::new(),
            catalog,
            transport,
            pacer: Arc::new(FramePacer::new()),
            peer_root: None,
            queue,
            hidden: CategoryFilter::default(),
            observer: None,
        };
        controller.register_spawn_function();
        controller
    }

    /// Cloneable, thread-safe entry point for transport callbacks
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            sender: self.queue.sender(),
            pacer: Arc::clone(&self.pacer),
        }
    }

    /// Run all tasks deferred since the last tick
    pub fn tick(&mut self) {
        let tasks = self.queue.collect();
        for task in tasks {
            task(self);
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    pub fn pins(&self) -> &[Uuid] {
        &self.pins
    }

    pub fn peer_root(&self) -> Option<Uuid> {
        self.peer_root
    }

    pub fn pacer(&self) -> Arc<FramePacer> {
        Arc::clone(&self.pacer)
    }

    pub fn hidden_categories_mut(&mut self) -> &mut CategoryFilter {
        &mut self.hidden
    }

    pub fn set_observer(&mut self, observer: Box<dyn PropertyObserver>) {
        self.observer = Some(observer);
    }

    pub fn register_custom_function(&mut self, function: CustomFunction) {
        self.custom_functions.insert(function.id, function);
    }

    pub fn custom_functions(&self) -> impl Iterator<Item = &CustomFunction> {
        self.custom_functions.values()
    }

    fn send(&self, message: OutboundMessage) {
        self.transport.send(message);
    }

    // -- connection lifecycle --

    fn on_connected(&mut self, peer_root: Uuid) {
        info!(%peer_root, app = %self.config.app_name, "peer connected");
        self.peer_root = Some(peer_root);
        self.pacer.reset();
        self.reset_state();
        self.populate_root();
    }

    fn on_disconnected(&mut self) {
        info!("peer disconnected");
        self.peer_root = None;
        self.pacer.notify_disconnect();
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.graph = SceneGraph::new(self.config.root_label.clone());
        self.properties.clear();
        self.pins.clear();
        self.functions.clear();
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.reset();
        }
    }

    fn populate_root(&mut self) {
        struct Row {
            stable_id: Uuid,
            label: String,
            folder: String,
            parent: Option<Uuid>,
            expandable: bool,
        }
        let host = Arc::clone(&self.host);
        let guard = host.read();
        let mut rows = Vec::new();
        for (_, obj) in guard.iter_entities() {
            if let ObjectDetail::Entity {
                stable_id,
                folder_path,
                outliner_parent,
                flags,
                tags,
                root_sub,
            } = &obj.detail
            {
                if !is_entity_displayable(*flags, tags) {
                    continue;
                }
                rows.push(Row {
                    stable_id: *stable_id,
                    label: obj.label.clone(),
                    folder: folder_path.clone(),
                    parent: *outliner_parent,
                    expandable: root_sub.is_some(),
                });
            }
        }
        drop(guard);

        for row in rows {
            let reference = ObjectReference::new(ObjectTarget::Entity {
                stable_id: row.stable_id,
            });
            match row.parent {
                Some(parent) => {
                    self.graph.add_entity_under(
                        parent,
                        row.stable_id,
                        &row.label,
                        reference,
                        row.expandable,
                    );
                }
                None => {
                    self.graph.add_entity(
                        &row.folder,
                        row.stable_id,
                        &row.label,
                        reference,
                        row.expandable,
                    );
                }
            }
        }

        let Some(peer_root) = self.peer_root else {
            return;
        };
        let mut update = NodeUpdate::empty(peer_root);
        update.clear = ClearFlags::Any;
        update.added_nodes = self
            .graph
            .get(self.graph.root_id())
            .map(|root| {
                root.children
                    .iter()
                    .filter_map(|c| self.snapshot_node(*c))
                    .collect()
            })
            .unwrap_or_default();
        update.added_functions = self
            .custom_functions
            .values()
            .map(|f| f.snapshot.clone())
            .collect();
        self.send(OutboundMessage::NodeUpdated(update));
        self.publish_catalog();
    }

    fn publish_catalog(&self) {
        let list = StringListUpdate::new(
            self.config.catalog_list_name.clone(),
            self.catalog.template_names(),
            self.config.string_list_max_len,
        );
        self.send(OutboundMessage::StringList(list));
    }

    // -- scene graph population --

    /// Build an entity node's children, properties, and functions on first
    /// expansion. Later expansions are no-ops.
    fn populate_node(&mut self, node_id: Uuid) {
        let Some(node) = self.graph.get(node_id) else {
            return;
        };
        if !node.needs_reload {
            return;
        }
        let TreeNodeKind::Entity { reference, .. } = &node.kind else {
            return;
        };
        let entity_ref = reference.clone();
        let entity_id = entity_ref.target.entity_id();

        let host = Arc::clone(&self.host);
        let guard = host.read();
        let Some(key) = entity_ref.target.resolve(&guard) else {
            warn!(%node_id, "cannot populate node, entity is gone");
            return;
        };
        let Some(obj) = guard.get(key) else {
            return;
        };
        let class_name = obj.class_name.clone();
        let descs: Vec<FieldDescriptor> = obj.fields.iter().map(|s| s.desc.clone()).collect();
        let func_descs: Vec<(String, Vec<FieldDescriptor>)> = obj
            .functions
            .iter()
            .filter(|f| !f.name.starts_with(CHANGE_HOOK_PREFIX))
            .map(|f| (f.name.clone(), f.params.clone()))
            .collect();
        let root_sub = match &obj.detail {
            ObjectDetail::Entity { root_sub, .. } => *root_sub,
            ObjectDetail::SubEntity { .. } => None,
        };
        let sub_plan = root_sub.and_then(|k| collect_sub_plan(&guard, k));

        let prop_roots = build_props(
            &entity_ref,
            &descs,
            &class_name,
            &guard,
            &self.hidden,
            &mut self.observer,
            &mut self.properties,
            "",
        );

        let mut binding_ids = Vec::new();
        for (name, params) in func_descs {
            let binding = self.build_binding(&entity_ref, name, params, &guard);
            binding_ids.push(binding.id);
            self.functions.insert(binding.id, binding);
        }

        let mut sub_node_ids = Vec::new();
        if let Some(plan) = &sub_plan {
            self.add_sub_nodes(node_id, entity_id, plan, &guard, &mut sub_node_ids);
        }
        drop(guard);

        self.graph.remove_placeholder(node_id);
        if let Some(node) = self.graph.get_mut(node_id) {
            node.needs_reload = false;
            if let TreeNodeKind::Entity {
                properties,
                functions,
                ..
            } = &mut node.kind
            {
                properties.extend(prop_roots.iter().copied());
                functions.extend(binding_ids.iter().copied());
            }
        }
        debug!(%node_id, properties = prop_roots.len(), functions = binding_ids.len(), "populated node");

        let mut update = NodeUpdate::empty(node_id);
        update.clear = ClearFlags::Any;
        for root in &prop_roots {
            if let Some(prop) = self.properties.get(*root) {
                collect_pin_snapshots(prop, &mut update.added_pins);
            }
        }
        update.added_functions = binding_ids
            .iter()
            .filter_map(|id| self.snapshot_binding(*id))
            .collect();
        update.added_nodes = sub_node_ids
            .iter()
            .filter_map(|id| self.snapshot_node(*id))
            .collect();
        self.send(OutboundMessage::NodeUpdated(update));
    }

    fn build_binding(
        &mut self,
        entity_ref: &ObjectReference,
        name: String,
        params: Vec<FieldDescriptor>,
        guard: &LiveObjectRegistry,
    ) -> FunctionBinding {
        let mut param_ids = Vec::new();
        let mut out_ids = Vec::new();
        let mut created = Vec::new();
        for desc in &params {
            let mut ctx = FactoryContext {
                host: guard,
                hidden: &self.hidden,
                observer: self.observer.as_deref_mut(),
            };
            if let Some(mut prop) = create_property(None, desc, &mut ctx, "", &[], None) {
                let is_out = desc.flags.contains(FieldFlags::OUT_PARAM);
                prop.show_as = if is_out {
                    ShowAs::OutputPin
                } else {
                    ShowAs::InputPin
                };
                if is_out {
                    out_ids.push(prop.id);
                }
                param_ids.push(prop.id);
                created.push(prop);
            }
        }
        for prop in created {
            self.properties.insert(prop);
        }
        FunctionBinding {
            id: Uuid::new_v4(),
            name,
            reference: entity_ref.clone(),
            params: param_ids,
            out_params: out_ids,
            signature: params,
        }
    }

    fn add_sub_nodes(
        &mut self,
        parent_node: Uuid,
        entity_id: Uuid,
        plan: &SubPlan,
        guard: &LiveObjectRegistry,
        out: &mut Vec<Uuid>,
    ) {
        let sub_ref = ObjectReference::new(ObjectTarget::SubEntity {
            entity_id,
            name: plan.name.clone(),
        });
        let Some(sub_node) = self.graph.add_sub_entity(parent_node, &plan.name, sub_ref.clone())
        else {
            return;
        };
        out.push(sub_node);
        let roots = build_props(
            &sub_ref,
            &plan.descs,
            &plan.class_name,
            guard,
            &self.hidden,
            &mut self.observer,
            &mut self.properties,
            &plan.name,
        );
        if let Some(node) = self.graph.get_mut(sub_node) {
            if let TreeNodeKind::SubEntity { properties, .. } = &mut node.kind {
                properties.extend(roots);
            }
            node.needs_reload = false;
        }
        for child in &plan.children {
            self.add_sub_nodes(sub_node, entity_id, child, guard, out);
        }
    }

    // -- entity lifecycle --

    fn on_entity_spawned(&mut self, stable_id: Uuid) {
        if self.peer_root.is_none() || self.graph.contains(stable_id) {
            return;
        }
        let host = Arc::clone(&self.host);
        let guard = host.read();
        let Some(key) = guard.entity_by_stable_id(stable_id) else {
            return;
        };
        let Some(obj) = guard.get(key) else {
            return;
        };
        let ObjectDetail::Entity {
            folder_path,
            outliner_parent,
            flags,
            tags,
            root_sub,
            ..
        } = &obj.detail
        else {
            return;
        };
        if !is_entity_displayable(*flags, tags) {
            return;
        }
        let label = obj.label.clone();
        let folder = folder_path.clone();
        let parent = *outliner_parent;
        let expandable = root_sub.is_some();
        drop(guard);

        let reference = ObjectReference::new(ObjectTarget::Entity { stable_id });
        match parent {
            Some(parent) => {
                self.graph
                    .add_entity_under(parent, stable_id, &label, reference, expandable);
            }
            None => {
                self.graph
                    .add_entity(&folder, stable_id, &label, reference, expandable);
            }
        }

        let graph_parent = self.graph.get(stable_id).and_then(|n| n.parent);
        let Some(parent_id) = self.wire_parent(graph_parent) else {
            return;
        };
        let mut update = NodeUpdate::empty(parent_id);
        if let Some(snapshot) = self.snapshot_node(stable_id) {
            update.added_nodes.push(snapshot);
        }
        self.send(OutboundMessage::NodeUpdated(update));
    }

    fn on_entity_destroyed(&mut self, stable_id: Uuid) {
        let Some(removed) = self.graph.remove_subtree(stable_id) else {
            return;
        };
        self.properties.remove_owned_by(stable_id);
        self.functions
            .retain(|_, b| b.reference.target.entity_id() != stable_id);
        self.pins.retain(|id| self.properties.contains(*id));
        debug!(%stable_id, nodes = removed.nodes.len(), "entity removed from graph");

        let Some(parent_id) = self.wire_parent(removed.parent) else {
            return;
        };
        let mut update = NodeUpdate::empty(parent_id);
        update.removed_node_ids.push(stable_id);
        self.send(OutboundMessage::NodeUpdated(update));
    }

    /// Peer deleted one of our nodes: mirror the deletion into the host
    fn on_node_removed(&mut self, node_id: Uuid) {
        let is_entity = self.graph.get(node_id).is_some_and(|n| n.is_entity());
        if !is_entity {
            return;
        }
        let host = Arc::clone(&self.host);
        let mut guard = host.write();
        guard.destroy_entity(node_id);
        drop(guard);
        self.on_entity_destroyed(node_id);
    }

    fn spawn_from_catalog(&mut self, name: &str) -> Option<Uuid> {
        let host = Arc::clone(&self.host);
        let mut guard = host.write();
        let Some(key) = self.catalog.spawn(&mut guard, name) else {
            warn!(template = name, "spawn failed, unknown template");
            return None;
        };
        let stable_id = guard.get(key).and_then(|o| o.stable_id())?;
        drop(guard);
        info!(template = name, %stable_id, "spawned entity from catalog");
        self.on_entity_spawned(stable_id);
        Some(stable_id)
    }

    // -- values and pins --

    fn on_pin_value_changed(&mut self, pin_id: Uuid, value: Vec<u8>) {
        let host = Arc::clone(&self.host);
        let mut guard = host.write();
        match self.properties.get_mut(pin_id) {
            Some(prop) => {
                if let Err(err) = prop.set_value(&value, &mut guard) {
                    warn!(%pin_id, %err, "pin value rejected");
                }
            }
            None => warn!(%pin_id, "value change for unknown pin"),
        }
    }

    /// Per-frame sync: apply the peer's bulk pin snapshot to the host, then
    /// refresh every pin and send back the ones that changed.
    fn on_executed(&mut self, updates: Vec<(Uuid, Vec<u8>)>) {
        for (pin_id, value) in updates {
            self.on_pin_value_changed(pin_id, value);
        }
        let host = Arc::clone(&self.host);
        let guard = host.read();
        for pin_id in self.pins.clone() {
            let Some(prop) = self.properties.get_mut(pin_id) else {
                continue;
            };
            let old = prop.data.clone();
            let value = prop.update_value(&guard).to_vec();
            if value != old {
                self.transport
                    .send(OutboundMessage::PinValueChanged(ValueChanged {
                        pin_id,
                        value,
                    }));
            }
        }
    }

    fn on_show_as_changed(&mut self, pin_id: Uuid, show_as: ShowAs) {
        if self.pins.contains(&pin_id) {
            if let Some(prop) = self.properties.get_mut(pin_id) {
                prop.show_as = show_as;
            }
            if show_as == ShowAs::Property {
                self.pins.retain(|p| *p != pin_id);
            }
            self.send_pins();
            return;
        }
        if show_as == ShowAs::Property {
            return;
        }

        // promote a scene property to a pin on the bridge node. The original
        // property stays registered; the pin is a fresh node over the same
        // host field.
        let Some(source) = self.properties.get(pin_id) else {
            warn!(%pin_id, "show-as change for unknown property");
            return;
        };
        let Some(owner) = source.owner.clone() else {
            return;
        };
        let field_path = source.field_path.clone();

        let host = Arc::clone(&self.host);
        let guard = host.read();
        let Some(key) = owner.target.resolve(&guard) else {
            return;
        };
        let Some(obj) = guard.get(key) else {
            return;
        };
        let Some(slot) = lookup_slot(&obj.fields, &field_path) else {
            return;
        };
        let desc = slot.desc.clone();
        let base = field_path[..field_path.len() - 1].to_vec();
        let fresh = {
            let mut ctx = FactoryContext {
                host: &guard,
                hidden: &self.hidden,
                observer: self.observer.as_deref_mut(),
            };
            create_property(Some(&owner), &desc, &mut ctx, "", &base, None)
        };
        drop(guard);
        let Some(mut fresh) = fresh else {
            return;
        };
        fresh.show_as = show_as;
        let fresh_id = fresh.id;
        self.properties.insert(fresh);
        self.pins.push(fresh_id);
        debug!(%pin_id, %fresh_id, "property promoted to pin");
        self.send_pins();
    }

    fn send_pins(&self) {
        let Some(peer_root) = self.peer_root else {
            return;
        };
        let mut update = NodeUpdate::empty(peer_root);
        update.clear = ClearFlags::Pins;
        update.added_pins = self
            .pins
            .iter()
            .filter_map(|id| self.properties.get(*id))
            .map(PinSnapshot::of)
            .collect();
        self.send(OutboundMessage::NodeUpdated(update));
    }

    // -- functions --

    fn on_function_call(&mut self, function_id: Uuid, params: Vec<(Uuid, Vec<u8>)>) {
        let map: HashMap<Uuid, Vec<u8>> = params.into_iter().collect();
        if let Some(custom) = self.custom_functions.get(&function_id) {
            let handler: CustomHandler = Arc::clone(&custom.handler);
            (*handler)(self, &map);
            return;
        }
        let Some(binding) = self.functions.get(&function_id).cloned() else {
            warn!(%function_id, "call to unknown function");
            return;
        };

        let mut block = ParamBlock::zeroed(&binding.signature);
        for id in &binding.params {
            let Some(prop) = self.properties.get(*id) else {
                continue;
            };
            let bytes = map.get(id).map(|v| v.as_slice()).unwrap_or(&prop.data);
            if bytes.is_empty() {
                continue;
            }
            if let Err(err) = prop.set_value_in_block(bytes, &mut block) {
                warn!(param = %id, %err, "bad function parameter");
            }
        }

        let host = Arc::clone(&self.host);
        let mut guard = host.write();
        let Some(key) = binding.reference.target.resolve(&guard) else {
            warn!(function = %binding.name, "function target is gone");
            return;
        };
        let called = guard.call_function(key, &binding.name, &mut block);
        drop(guard);
        if !called {
            return;
        }

        for id in &binding.out_params {
            if let Some(prop) = self.properties.get_mut(*id) {
                let value = prop.update_value_from_block(&block).to_vec();
                self.transport
                    .send(OutboundMessage::PinValueChanged(ValueChanged {
                        pin_id: *id,
                        value,
                    }));
            }
        }
    }

    fn register_spawn_function(&mut self) {
        let id = Uuid::new_v4();
        let param_id = Uuid::new_v4();
        let pin = PinSnapshot {
            id: param_id,
            name: "Template".to_string(),
            type_name: "string".to_string(),
            show_as: ShowAs::InputPin,
            category: "Default".to_string(),
            visualizer: Some(Visualizer::ComboBox {
                list_name: self.config.catalog_list_name.clone(),
            }),
            data: codec::encode_string(""),
            min: Vec::new(),
            max: Vec::new(),
            default: Vec::new(),
            read_only: false,
            advanced: false,
            transient: false,
            metadata: Vec::new(),
        };
        let snapshot = FunctionSnapshot {
            id,
            name: "Spawn Entity".to_string(),
            category: "World".to_string(),
            pins: vec![pin],
        };
        let handler: CustomHandler = Arc::new(move |controller, params| {
            let Some(bytes) = params.get(&param_id) else {
                return;
            };
            let name = codec::decode_string(bytes);
            if !name.is_empty() {
                let _ = controller.spawn_from_catalog(&name);
            }
        });
        self.custom_functions.insert(
            id,
            CustomFunction {
                id,
                snapshot,
                handler,
            },
        );
    }

    // -- import --

    /// Re-create entities from a node graph exported on the peer side. Each
    /// child carrying a spawn tag is spawned from the catalog, re-identified
    /// as the imported node, and its pin values restored.
    fn on_node_imported(&mut self, root: ImportedNode) {
        info!(children = root.children.len(), "importing node graph");
        for child in root.children {
            let Some(tag) = child.metadata.get("spawnTag").cloned() else {
                continue;
            };
            let host = Arc::clone(&self.host);
            let mut guard = host.write();
            let Some(key) = self.catalog.spawn(&mut guard, &tag) else {
                warn!(template = %tag, "import skipped, unknown template");
                continue;
            };
            guard.reassign_stable_id(key, child.id);
            drop(guard);

            self.on_entity_spawned(child.id);
            self.populate_node(child.id);

            for pin in child.pins {
                let Some(path) = pin.metadata.get("propertyPath") else {
                    continue;
                };
                let component = pin.metadata.get("component").map(String::as_str);
                let Some(prop_id) = self.properties.by_field(child.id, component, path) else {
                    continue;
                };
                if !pin.data.is_empty() {
                    self.on_pin_value_changed(prop_id, pin.data.clone());
                }
                if pin.show_as != ShowAs::Property {
                    if let Some(prop) = self.properties.get_mut(prop_id) {
                        prop.show_as = pin.show_as;
                    }
                    if !self.pins.contains(&prop_id) {
                        self.pins.push(prop_id);
                    }
                }
            }
        }
        self.send_pins();
    }

    // -- snapshots --

    pub fn snapshot_node(&self, id: Uuid) -> Option<NodeSnapshot> {
        let node = self.graph.get(id)?;
        let mut pins = Vec::new();
        let mut functions = Vec::new();
        let mut metadata = Vec::new();
        let node_type = match &node.kind {
            TreeNodeKind::Folder => "folder",
            TreeNodeKind::Placeholder => "placeholder",
            TreeNodeKind::Entity {
                properties,
                functions: function_ids,
                metadata: meta,
                ..
            } => {
                for root in properties {
                    if let Some(prop) = self.properties.get(*root) {
                        collect_pin_snapshots(prop, &mut pins);
                    }
                }
                functions = function_ids
                    .iter()
                    .filter_map(|f| self.snapshot_binding(*f))
                    .collect();
                metadata = meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                "entity"
            }
            TreeNodeKind::SubEntity { properties, .. } => {
                for root in properties {
                    if let Some(prop) = self.properties.get(*root) {
                        collect_pin_snapshots(prop, &mut pins);
                    }
                }
                "component"
            }
        };
        Some(NodeSnapshot {
            id,
            name: node.name.clone(),
            node_type: node_type.to_string(),
            pins,
            functions,
            children: node
                .children
                .iter()
                .filter_map(|c| self.snapshot_node(*c))
                .collect(),
            metadata,
        })
    }

    fn snapshot_binding(&self, id: Uuid) -> Option<FunctionSnapshot> {
        let binding = self.functions.get(&id)?;
        Some(FunctionSnapshot {
            id: binding.id,
            name: binding.name.clone(),
            category: "Default".to_string(),
            pins: binding
                .params
                .iter()
                .filter_map(|p| self.properties.get(*p))
                .map(PinSnapshot::of)
                .collect(),
        })
    }

    /// Map a graph parent to the peer-visible parent id. Children of our
    /// internal root scope to the peer-assigned root node.
    fn wire_parent(&self, parent: Option<Uuid>) -> Option<Uuid> {
        match parent {
            Some(p) if p == self.graph.root_id() => self.peer_root,
            Some(p) => Some(p),
            None => self.peer_root,
        }
    }
}

struct SubPlan {
    name: String,
    class_name: String,
    descs: Vec<FieldDescriptor>,
    children: Vec<SubPlan>,
}

fn collect_sub_plan(guard: &LiveObjectRegistry, key: ObjectKey) -> Option<SubPlan> {
    let obj = guard.get(key)?;
    let ObjectDetail::SubEntity { name, children, .. } = &obj.detail else {
        return None;
    };
    Some(SubPlan {
        name: name.clone(),
        class_name: obj.class_name.clone(),
        descs: obj.fields.iter().map(|s| s.desc.clone()).collect(),
        children: children
            .iter()
            .filter_map(|c| collect_sub_plan(guard, *c))
            .collect(),
    })
}

#[allow(clippy::too_many_arguments)]
fn build_props(
    owner: &ObjectReference,
    descs: &[FieldDescriptor],
    class_name: &str,
    guard: &LiveObjectRegistry,
    hidden: &CategoryFilter,
    observer: &mut Option<Box<dyn PropertyObserver>>,
    properties: &mut PropertyRegistry,
    parent_category: &str,
) -> Vec<Uuid> {
    let mut roots = Vec::new();
    for desc in descs {
        if !is_field_visible(desc, class_name, hidden) {
            continue;
        }
        let mut ctx = FactoryContext {
            host: guard,
            hidden,
            observer: observer.as_deref_mut(),
        };
        if let Some(prop) = create_property(Some(owner), desc, &mut ctx, parent_category, &[], None)
        {
            roots.push(prop.id);
            properties.insert(prop);
        }
    }
    roots
}

fn collect_pin_snapshots(prop: &PropertyNode, out: &mut Vec<PinSnapshot>) {
    if prop.type_tag != TypeTag::Void {
        out.push(PinSnapshot::of(prop));
    }
    for child in &prop.children {
        collect_pin_snapshots(child, out);
    }
}

/// Cloneable front door for transport callbacks. Everything except pacing
/// defers onto the task queue.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: TaskSender,
    pacer: Arc<FramePacer>,
}

impl BridgeHandle {
    pub fn pacer(&self) -> Arc<FramePacer> {
        Arc::clone(&self.pacer)
    }

    pub fn connected(&self, peer_root: Uuid) {
        self.sender.enqueue(move |c| c.on_connected(peer_root));
    }

    pub fn disconnected(&self) {
        // release a blocked frame source before the tick gets to the task
        self.pacer.notify_disconnect();
        self.sender.enqueue(|c| c.on_disconnected());
    }

    pub fn executed(&self, updates: Vec<(Uuid, Vec<u8>)>) {
        self.pacer.notify_execute();
        self.sender.enqueue(move |c| c.on_executed(updates));
    }

    pub fn entity_spawned(&self, stable_id: Uuid) {
        self.sender.enqueue(move |c| c.on_entity_spawned(stable_id));
    }

    pub fn entity_destroyed(&self, stable_id: Uuid) {
        self.sender
            .enqueue(move |c| c.on_entity_destroyed(stable_id));
    }

    pub fn node_expanded(&self, node_id: Uuid) {
        self.sender.enqueue(move |c| c.populate_node(node_id));
    }

    pub fn node_selected(&self, node_id: Uuid) {
        self.sender.enqueue(move |c| c.populate_node(node_id));
    }

    pub fn node_removed(&self, node_id: Uuid) {
        self.sender.enqueue(move |c| c.on_node_removed(node_id));
    }

    pub fn pin_value_changed(&self, pin_id: Uuid, value: &[u8]) {
        let value = value.to_vec();
        self.sender
            .enqueue(move |c| c.on_pin_value_changed(pin_id, value));
    }

    pub fn show_as_changed(&self, pin_id: Uuid, show_as: ShowAs) {
        self.sender
            .enqueue(move |c| c.on_show_as_changed(pin_id, show_as));
    }

    pub fn function_call(&self, function_id: Uuid, params: Vec<(Uuid, Vec<u8>)>) {
        self.sender
            .enqueue(move |c| c.on_function_call(function_id, params));
    }

    pub fn node_imported(&self, root: ImportedNode) {
        self.sender.enqueue(move |c| c.on_node_imported(root));
    }

    /// Dispatch a decoded peer message
    pub fn apply(&self, message: InboundMessage) {
        match message {
            InboundMessage::Connected { peer_root } => self.connected(peer_root),
            InboundMessage::Disconnected => self.disconnected(),
            InboundMessage::NodeExpanded { node_id } => self.node_expanded(node_id),
            InboundMessage::NodeSelected { node_id } => self.node_selected(node_id),
            InboundMessage::Executed { updates } => self.executed(updates),
            InboundMessage::PinValueChanged { pin_id, value } => {
                self.pin_value_changed(pin_id, &value)
            }
            InboundMessage::PinShowAsChanged { pin_id, show_as } => {
                self.show_as_changed(pin_id, show_as)
            }
            InboundMessage::FunctionCall {
                function_id,
                params,
            } => self.function_call(function_id, params),
            InboundMessage::NodeImported { root } => self.node_imported(root),
            InboundMessage::NodeRemoved { node_id } => self.node_removed(node_id),
        }
    }
}
