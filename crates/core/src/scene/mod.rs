//! Mirrored scene graph
//!
//! A lazily populated tree mirroring the host outliner: folders, entities,
//! and sub-entity chains. Entity nodes reuse the entity's stable id so peer
//! messages can address them directly. Children of an entity are not built
//! until the peer first expands the node; until then a placeholder child
//! marks the node expandable.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::reflect::ObjectReference;

/// Display name of the placeholder child under unexpanded entity nodes
pub const PLACEHOLDER_NAME: &str = "Loading...";

/// Node-kind-specific payload
#[derive(Debug, Clone)]
pub enum TreeNodeKind {
    Folder,
    /// Stand-in child shown before an entity node is expanded
    Placeholder,
    Entity {
        reference: ObjectReference,
        /// Root ids of this entity's registered property trees
        properties: Vec<Uuid>,
        /// Ids of this entity's bridged functions
        functions: Vec<Uuid>,
        metadata: BTreeMap<String, String>,
    },
    SubEntity {
        reference: ObjectReference,
        properties: Vec<Uuid>,
    },
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: Uuid,
    pub name: String,
    pub parent: Option<Uuid>,
    pub children: Vec<Uuid>,
    /// True until the node's children and properties have been populated
    pub needs_reload: bool,
    pub kind: TreeNodeKind,
}

impl TreeNode {
    pub fn is_entity(&self) -> bool {
        matches!(self.kind, TreeNodeKind::Entity { .. })
    }
}

/// Result of detaching a subtree
#[derive(Debug)]
pub struct RemovedSubtree {
    pub parent: Option<Uuid>,
    /// The detached node and all its descendants
    pub nodes: Vec<TreeNode>,
}

/// The bridged outliner tree
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HashMap<Uuid, TreeNode>,
    root_id: Uuid,
    /// Entity nodes waiting for their outliner parent to appear, keyed by
    /// the missing parent's stable id
    pending_children: HashMap<Uuid, Vec<Uuid>>,
}

impl SceneGraph {
    pub fn new(root_label: impl Into<String>) -> Self {
        let root_id = Uuid::new_v4();
        let mut nodes = HashMap::new();
        nodes.insert(
            root_id,
            TreeNode {
                id: root_id,
                name: root_label.into(),
                parent: None,
                children: Vec::new(),
                needs_reload: false,
                kind: TreeNodeKind::Folder,
            },
        );
        Self {
            nodes,
            root_id,
            pending_children: HashMap::new(),
        }
    }

    pub fn root_id(&self) -> Uuid {
        self.root_id
    }

    pub fn get(&self, id: Uuid) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut TreeNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Walk a `/`-separated outliner path from the root, creating folder
    /// nodes as needed. A leading "None" segment and leading slashes are
    /// artifacts of host path formatting and are dropped.
    pub fn find_or_create_folder(&mut self, path: &str) -> Uuid {
        let path = path.strip_prefix("None").unwrap_or(path);
        let path = path.trim_start_matches('/');
        let mut current = self.root_id;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let existing = self.nodes[&current]
                .children
                .iter()
                .copied()
                .find(|child| {
                    self.nodes.get(child).is_some_and(|n| {
                        matches!(n.kind, TreeNodeKind::Folder) && n.name == segment
                    })
                });
            current = match existing {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4();
                    self.nodes.insert(
                        id,
                        TreeNode {
                            id,
                            name: segment.to_string(),
                            parent: Some(current),
                            children: Vec::new(),
                            needs_reload: false,
                            kind: TreeNodeKind::Folder,
                        },
                    );
                    self.attach(current, id);
                    id
                }
            };
        }
        current
    }

    /// Add an entity node under its outliner folder. The node id is the
    /// entity's stable id. `expandable` entities get a placeholder child so
    /// the peer offers expansion before the real children are built.
    pub fn add_entity(
        &mut self,
        folder_path: &str,
        stable_id: Uuid,
        label: &str,
        reference: ObjectReference,
        expandable: bool,
    ) -> Uuid {
        let parent = self.find_or_create_folder(folder_path);
        self.insert_entity(parent, stable_id, label, reference, expandable);
        self.adopt_pending(stable_id);
        stable_id
    }

    /// Add an entity node directly under another entity. When the parent is
    /// not in the graph yet the node is parked until the parent arrives.
    pub fn add_entity_under(
        &mut self,
        parent_entity: Uuid,
        stable_id: Uuid,
        label: &str,
        reference: ObjectReference,
        expandable: bool,
    ) -> Uuid {
        if self.nodes.contains_key(&parent_entity) {
            self.insert_entity(parent_entity, stable_id, label, reference, expandable);
        } else {
            debug!(%stable_id, %parent_entity, "parking entity until its parent appears");
            let node = self.entity_node(None, stable_id, label, reference, expandable);
            self.nodes.insert(stable_id, node);
            self.pending_children
                .entry(parent_entity)
                .or_default()
                .push(stable_id);
        }
        self.adopt_pending(stable_id);
        stable_id
    }

    fn insert_entity(
        &mut self,
        parent: Uuid,
        stable_id: Uuid,
        label: &str,
        reference: ObjectReference,
        expandable: bool,
    ) {
        if self.nodes.contains_key(&stable_id) {
            warn!(%stable_id, "entity node already present, skipping");
            return;
        }
        let node = self.entity_node(Some(parent), stable_id, label, reference, expandable);
        self.nodes.insert(stable_id, node);
        self.attach(parent, stable_id);
    }

    fn entity_node(
        &mut self,
        parent: Option<Uuid>,
        stable_id: Uuid,
        label: &str,
        reference: ObjectReference,
        expandable: bool,
    ) -> TreeNode {
        let mut children = Vec::new();
        if expandable {
            let placeholder = Uuid::new_v4();
            self.nodes.insert(
                placeholder,
                TreeNode {
                    id: placeholder,
                    name: PLACEHOLDER_NAME.to_string(),
                    parent: Some(stable_id),
                    children: Vec::new(),
                    needs_reload: false,
                    kind: TreeNodeKind::Placeholder,
                },
            );
            children.push(placeholder);
        }
        TreeNode {
            id: stable_id,
            name: label.to_string(),
            parent,
            children,
            needs_reload: true,
            kind: TreeNodeKind::Entity {
                reference,
                properties: Vec::new(),
                functions: Vec::new(),
                metadata: BTreeMap::new(),
            },
        }
    }

    fn adopt_pending(&mut self, parent: Uuid) {
        let Some(waiting) = self.pending_children.remove(&parent) else {
            return;
        };
        for child in waiting {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = Some(parent);
                self.attach(parent, child);
            }
        }
    }

    pub fn add_sub_entity(
        &mut self,
        parent: Uuid,
        name: &str,
        reference: ObjectReference,
    ) -> Option<Uuid> {
        if !self.nodes.contains_key(&parent) {
            warn!(%parent, "sub-entity parent not in graph");
            return None;
        }
        let id = Uuid::new_v4();
        self.nodes.insert(
            id,
            TreeNode {
                id,
                name: name.to_string(),
                parent: Some(parent),
                children: Vec::new(),
                needs_reload: true,
                kind: TreeNodeKind::SubEntity {
                    reference,
                    properties: Vec::new(),
                },
            },
        );
        self.attach(parent, id);
        Some(id)
    }

    /// Drop an entity node's placeholder child, if present. Returns the
    /// placeholder's id.
    pub fn remove_placeholder(&mut self, entity: Uuid) -> Option<Uuid> {
        let node = self.nodes.get(&entity)?;
        let placeholder = node.children.iter().copied().find(|c| {
            self.nodes
                .get(c)
                .is_some_and(|n| matches!(n.kind, TreeNodeKind::Placeholder))
        })?;
        self.nodes.remove(&placeholder);
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.children.retain(|c| *c != placeholder);
        }
        Some(placeholder)
    }

    /// Detach a node and its whole subtree
    pub fn remove_subtree(&mut self, id: Uuid) -> Option<RemovedSubtree> {
        let parent = self.nodes.get(&id)?.parent;
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|c| *c != id);
            }
        }
        let mut nodes = Vec::new();
        self.collect_subtree(id, &mut nodes);
        Some(RemovedSubtree { parent, nodes })
    }

    fn collect_subtree(&mut self, id: Uuid, out: &mut Vec<TreeNode>) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for child in node.children.clone() {
            self.collect_subtree(child, out);
        }
        out.push(node);
    }

    /// Drop everything except a fresh root
    pub fn clear(&mut self) {
        let name = self.nodes[&self.root_id].name.clone();
        self.nodes.clear();
        self.pending_children.clear();
        self.nodes.insert(
            self.root_id,
            TreeNode {
                id: self.root_id,
                name,
                parent: None,
                children: Vec::new(),
                needs_reload: false,
                kind: TreeNodeKind::Folder,
            },
        );
    }

    fn attach(&mut self, parent: Uuid, child: Uuid) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            if !node.children.contains(&child) {
                node.children.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::reflect::ObjectTarget;

    use super::*;

    fn entity_ref(id: Uuid) -> ObjectReference {
        ObjectReference::new(ObjectTarget::Entity { stable_id: id })
    }

    #[test]
    fn test_folder_path_parsing() {
        let mut graph = SceneGraph::new("World");
        let a = graph.find_or_create_folder("None/Lighting/Rigs");
        let b = graph.find_or_create_folder("/Lighting/Rigs");
        let c = graph.find_or_create_folder("Lighting/Rigs");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(graph.find_or_create_folder(""), graph.root_id());
        assert_eq!(graph.find_or_create_folder("None"), graph.root_id());

        let lighting = graph.find_or_create_folder("Lighting");
        assert_eq!(graph.get(a).unwrap().parent, Some(lighting));
        // root -> Lighting -> Rigs
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_entity_node_uses_stable_id_and_placeholder() {
        let mut graph = SceneGraph::new("World");
        let id = Uuid::new_v4();
        let node_id = graph.add_entity("Props", id, "Lamp01", entity_ref(id), true);
        assert_eq!(node_id, id);

        let node = graph.get(id).unwrap();
        assert!(node.needs_reload);
        assert_eq!(node.children.len(), 1);
        let child = graph.get(node.children[0]).unwrap();
        assert_eq!(child.name, PLACEHOLDER_NAME);
        let child_id = child.id;

        assert_eq!(graph.remove_placeholder(id), Some(child_id));
        assert!(graph.get(id).unwrap().children.is_empty());
        assert_eq!(graph.remove_placeholder(id), None);
    }

    #[test]
    fn test_parked_child_attaches_when_parent_arrives() {
        let mut graph = SceneGraph::new("World");
        let parent_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();

        graph.add_entity_under(parent_id, child_id, "Wheel", entity_ref(child_id), false);
        assert!(graph.get(child_id).unwrap().parent.is_none());

        graph.add_entity("", parent_id, "Car", entity_ref(parent_id), false);
        let child = graph.get(child_id).unwrap();
        assert_eq!(child.parent, Some(parent_id));
        assert!(graph.get(parent_id).unwrap().children.contains(&child_id));
    }

    #[test]
    fn test_remove_subtree_returns_descendants() {
        let mut graph = SceneGraph::new("World");
        let id = Uuid::new_v4();
        graph.add_entity("", id, "Rig", entity_ref(id), false);
        let sub = graph.add_sub_entity(id, "Lens", entity_ref(id)).unwrap();
        let nested = graph.add_sub_entity(sub, "Glass", entity_ref(id)).unwrap();

        let removed = graph.remove_subtree(id).unwrap();
        assert_eq!(removed.parent, Some(graph.root_id()));
        let ids: Vec<Uuid> = removed.nodes.iter().map(|n| n.id).collect();
        assert!(ids.contains(&id));
        assert!(ids.contains(&sub));
        assert!(ids.contains(&nested));
        assert!(!graph.contains(id));
        assert!(!graph.get(graph.root_id()).unwrap().children.contains(&id));
    }

    #[test]
    fn test_clear_keeps_root() {
        let mut graph = SceneGraph::new("World");
        let id = Uuid::new_v4();
        graph.add_entity("Props", id, "Lamp01", entity_ref(id), true);
        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.get(graph.root_id()).unwrap().name, "World");
    }
}
