use levelforge_common::{NodeId, Transform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the scene.
///
/// Observers (panels, persistence, tests) drain these to learn what changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    Created {
        id: NodeId,
        parent: Option<NodeId>,
    },
    Destroyed {
        id: NodeId,
    },
    Reparented {
        id: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    },
    Renamed {
        id: NodeId,
        old: String,
        new: String,
    },
    TransformUpdated {
        id: NodeId,
        old: Transform,
        new: Transform,
    },
}

/// Errors from scene operations. Every failing operation is a no-op.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} already exists")]
    DuplicateId(NodeId),
    #[error("cannot parent {node} under {parent}: it would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
}

/// A node in the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
}

/// Detached data for one node of a [`Subtree`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub transform: Transform,
}

/// A detached subtree, in pre-order, together with where its root used to sit.
///
/// Produced by [`Scene::destroy_node`] and [`Scene::copy_subtree`], consumed by
/// [`Scene::restore_subtree`].
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    pub nodes: Vec<NodeRecord>,
    /// Sibling index of the root under its parent.
    pub index: usize,
}

impl Subtree {
    pub fn root(&self) -> NodeId {
        self.nodes[0].id
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// Clone the subtree with freshly generated ids, keeping the internal
    /// parent links consistent. The root keeps its original parent.
    pub fn with_fresh_ids(&self) -> Self {
        let remap: BTreeMap<NodeId, NodeId> =
            self.nodes.iter().map(|n| (n.id, NodeId::new())).collect();
        let nodes = self
            .nodes
            .iter()
            .map(|n| NodeRecord {
                id: remap[&n.id],
                name: n.name.clone(),
                parent: n.parent.map(|p| remap.get(&p).copied().unwrap_or(p)),
                transform: n.transform,
            })
            .collect();
        Self {
            nodes,
            index: self.index,
        }
    }

    /// Same subtree with the root placed at `index` among its siblings.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

/// The scene graph.
///
/// Stands in for the host engine's node tree. Nodes are stored in a BTreeMap
/// for deterministic lookup; sibling order lives in `roots` and each node's
/// `children`.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    roots: Vec<NodeId>,
    /// Append-only event log of all mutations.
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    /// Children of `parent`, or the root list when `parent` is `None`.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(p) => self
                .nodes
                .get(&p)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Position of a node among its siblings.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.get(&id)?.parent;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// First node with the given name in pre-order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter_preorder()
            .into_iter()
            .find(|id| self.nodes[id].name == name)
    }

    /// All node ids in pre-order, roots first.
    pub fn iter_preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_preorder(*root, &mut out);
        }
        out
    }

    /// `id` and all of its descendants, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.nodes.contains_key(&id) {
            self.collect_preorder(id, &mut out);
        }
        out
    }

    /// Whether `ancestor` is `node` itself or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    /// Create a node with a fresh id, appended under `parent`.
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        let id = NodeId::new();
        self.create_node_with_id(id, name, parent, transform, None)?;
        Ok(id)
    }

    /// Create a node with a specific id (used by redo). `index` inserts the
    /// node at that sibling position, clamped to the sibling count.
    pub fn create_node_with_id(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        parent: Option<NodeId>,
        transform: Transform,
        index: Option<usize>,
    ) -> Result<(), SceneError> {
        if self.nodes.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::NodeNotFound(p));
            }
        }
        self.nodes.insert(
            id,
            Node {
                name: name.into(),
                parent,
                children: Vec::new(),
                transform,
            },
        );
        self.insert_child(parent, id, index);
        self.event_log.push(SceneEvent::Created { id, parent });
        Ok(())
    }

    /// Copy a subtree without modifying the scene.
    pub fn copy_subtree(&self, id: NodeId) -> Result<Subtree, SceneError> {
        let index = self.index_of(id).ok_or(SceneError::NodeNotFound(id))?;
        let nodes = self
            .descendants(id)
            .into_iter()
            .map(|n| {
                let node = &self.nodes[&n];
                NodeRecord {
                    id: n,
                    name: node.name.clone(),
                    parent: node.parent,
                    transform: node.transform,
                }
            })
            .collect();
        Ok(Subtree { nodes, index })
    }

    /// Remove a node and all of its descendants. Returns the detached subtree
    /// so the removal can be reversed with [`Scene::restore_subtree`].
    pub fn destroy_node(&mut self, id: NodeId) -> Result<Subtree, SceneError> {
        let subtree = self.copy_subtree(id)?;
        let parent = self.nodes[&id].parent;
        self.remove_child(parent, id);
        // Children before parents in the log, mirroring teardown order.
        for record in subtree.nodes.iter().rev() {
            self.nodes.remove(&record.id);
            self.event_log.push(SceneEvent::Destroyed { id: record.id });
        }
        tracing::debug!(node = %id, removed = subtree.nodes.len(), "destroyed subtree");
        Ok(subtree)
    }

    /// Re-insert a detached subtree at its recorded sibling index.
    pub fn restore_subtree(&mut self, subtree: &Subtree) -> Result<(), SceneError> {
        let Some(root) = subtree.nodes.first() else {
            return Ok(());
        };
        if let Some(p) = root.parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::NodeNotFound(p));
            }
        }
        if let Some(clash) = subtree.nodes.iter().find(|n| self.nodes.contains_key(&n.id)) {
            return Err(SceneError::DuplicateId(clash.id));
        }
        for (i, record) in subtree.nodes.iter().enumerate() {
            let index = if i == 0 { Some(subtree.index) } else { None };
            self.create_node_with_id(
                record.id,
                record.name.clone(),
                record.parent,
                record.transform,
                index,
            )?;
        }
        Ok(())
    }

    /// Move a node under `new_parent` (or to the root list). Returns the old
    /// parent and sibling index so the move can be reversed.
    pub fn reparent(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<(Option<NodeId>, usize), SceneError> {
        let old_index = self.index_of(id).ok_or(SceneError::NodeNotFound(id))?;
        if let Some(p) = new_parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::NodeNotFound(p));
            }
            if self.is_ancestor(id, p) {
                return Err(SceneError::Cycle { node: id, parent: p });
            }
        }
        let old_parent = self.nodes[&id].parent;
        self.remove_child(old_parent, id);
        self.insert_child(new_parent, id, index);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = new_parent;
        }
        self.event_log.push(SceneEvent::Reparented {
            id,
            old_parent,
            new_parent,
        });
        tracing::debug!(node = %id, ?old_parent, ?new_parent, "reparented");
        Ok((old_parent, old_index))
    }

    /// Rename a node. Returns the previous name.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<String, SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))?;
        let new = name.into();
        let old = std::mem::replace(&mut node.name, new.clone());
        self.event_log.push(SceneEvent::Renamed {
            id,
            old: old.clone(),
            new,
        });
        Ok(old)
    }

    pub fn transform(&self, id: NodeId) -> Option<Transform> {
        self.nodes.get(&id).map(|n| n.transform)
    }

    /// Update a node's transform. Returns the previous transform.
    pub fn set_transform(&mut self, id: NodeId, new: Transform) -> Result<Transform, SceneError> {
        let node = self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))?;
        let old = node.transform;
        node.transform = new;
        self.event_log
            .push(SceneEvent::TransformUpdated { id, old, new });
        Ok(old)
    }

    /// Deterministic hash of the observable scene state: structure, sibling
    /// order, names and transforms. The event log is not included.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for id in self.iter_preorder() {
            let node = &self.nodes[&id];
            mix(&mut h, id.0.as_bytes());
            match node.parent {
                Some(p) => mix(&mut h, p.0.as_bytes()),
                None => mix(&mut h, &[0]),
            }
            mix(&mut h, node.name.as_bytes());
            mix(&mut h, &(node.children.len() as u64).to_le_bytes());
            let t = node.transform;
            for f in [
                t.position.x,
                t.position.y,
                t.position.z,
                t.rotation.x,
                t.rotation.y,
                t.rotation.z,
                t.rotation.w,
                t.scale.x,
                t.scale.y,
                t.scale.z,
            ] {
                mix(&mut h, &f.to_le_bytes());
            }
        }
        h
    }

    fn collect_preorder(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.collect_preorder(*child, out);
            }
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(p) => self.nodes.get_mut(&p).map(|n| &mut n.children),
        }
    }

    fn insert_child(&mut self, parent: Option<NodeId>, id: NodeId, index: Option<usize>) {
        if let Some(siblings) = self.siblings_mut(parent) {
            let at = index.unwrap_or(siblings.len()).min(siblings.len());
            siblings.insert(at, id);
        }
    }

    fn remove_child(&mut self, parent: Option<NodeId>, id: NodeId) {
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.retain(|c| *c != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn at(x: f32) -> Transform {
        Transform::from_position(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn scene_starts_empty() {
        let s = Scene::new();
        assert_eq!(s.node_count(), 0);
        assert!(s.roots().is_empty());
    }

    #[test]
    fn create_and_destroy() {
        let mut s = Scene::new();
        let id = s.create_node("cube", None, Transform::default()).unwrap();
        assert_eq!(s.node_count(), 1);
        assert_eq!(s.roots(), &[id]);

        let removed = s.destroy_node(id).unwrap();
        assert_eq!(removed.root(), id);
        assert_eq!(s.node_count(), 0);
        assert!(s.roots().is_empty());
    }

    #[test]
    fn create_under_missing_parent_fails() {
        let mut s = Scene::new();
        let ghost = NodeId::new();
        let err = s.create_node("a", Some(ghost), Transform::default()).unwrap_err();
        assert_eq!(err, SceneError::NodeNotFound(ghost));
        assert_eq!(s.node_count(), 0);
        assert!(s.events().is_empty());
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut s = Scene::new();
        let id = s.create_node("a", None, Transform::default()).unwrap();
        let err = s
            .create_node_with_id(id, "b", None, Transform::default(), None)
            .unwrap_err();
        assert_eq!(err, SceneError::DuplicateId(id));
        assert_eq!(s.get(id).unwrap().name, "a");
    }

    #[test]
    fn destroy_removes_subtree_and_restore_puts_it_back() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, at(1.0)).unwrap();
        let b = s.create_node("b", None, at(2.0)).unwrap();
        let child = s.create_node("child", Some(a), at(3.0)).unwrap();
        let grandchild = s.create_node("grandchild", Some(child), at(4.0)).unwrap();
        let before = s.state_hash();

        let removed = s.destroy_node(a).unwrap();
        assert_eq!(removed.ids(), vec![a, child, grandchild]);
        assert_eq!(s.node_count(), 1);
        assert_eq!(s.roots(), &[b]);

        s.restore_subtree(&removed).unwrap();
        assert_eq!(s.roots(), &[a, b]);
        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn restore_into_missing_parent_fails_cleanly() {
        let mut s = Scene::new();
        let p = s.create_node("p", None, Transform::default()).unwrap();
        let c = s.create_node("c", Some(p), Transform::default()).unwrap();
        let sub_c = s.destroy_node(c).unwrap();
        s.destroy_node(p).unwrap();

        assert_eq!(s.restore_subtree(&sub_c), Err(SceneError::NodeNotFound(p)));
        assert_eq!(s.node_count(), 0);
    }

    #[test]
    fn reparent_and_back_restores_order() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, Transform::default()).unwrap();
        let b = s.create_node("b", None, Transform::default()).unwrap();
        let c = s.create_node("c", None, Transform::default()).unwrap();
        let before = s.state_hash();

        let (old_parent, old_index) = s.reparent(b, Some(c), None).unwrap();
        assert_eq!(old_parent, None);
        assert_eq!(old_index, 1);
        assert_eq!(s.roots(), &[a, c]);
        assert_eq!(s.children(Some(c)), &[b]);

        s.reparent(b, old_parent, Some(old_index)).unwrap();
        assert_eq!(s.roots(), &[a, b, c]);
        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, Transform::default()).unwrap();
        let b = s.create_node("b", Some(a), Transform::default()).unwrap();
        let before = s.state_hash();

        assert_eq!(
            s.reparent(a, Some(b), None),
            Err(SceneError::Cycle { node: a, parent: b })
        );
        assert_eq!(
            s.reparent(a, Some(a), None),
            Err(SceneError::Cycle { node: a, parent: a })
        );
        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn rename_and_transform_return_previous_values() {
        let mut s = Scene::new();
        let id = s.create_node("old", None, at(0.0)).unwrap();
        assert_eq!(s.rename(id, "new").unwrap(), "old");
        assert_eq!(s.get(id).unwrap().name, "new");

        let prev = s.set_transform(id, at(5.0)).unwrap();
        assert_eq!(prev, at(0.0));
        assert_eq!(s.transform(id), Some(at(5.0)));
    }

    #[test]
    fn find_by_name_uses_preorder() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, Transform::default()).unwrap();
        let dup_deep = s.create_node("x", Some(a), Transform::default()).unwrap();
        let _dup_root = s.create_node("x", None, Transform::default()).unwrap();
        assert_eq!(s.find_by_name("x"), Some(dup_deep));
        assert_eq!(s.find_by_name("missing"), None);
    }

    #[test]
    fn fresh_ids_keep_internal_links() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, Transform::default()).unwrap();
        let _c = s.create_node("c", Some(a), Transform::default()).unwrap();
        let copy = s.copy_subtree(a).unwrap().with_fresh_ids();

        assert_ne!(copy.root(), a);
        assert_eq!(copy.nodes[0].parent, None);
        assert_eq!(copy.nodes[1].parent, Some(copy.root()));

        s.restore_subtree(&copy.at_index(1)).unwrap();
        assert_eq!(s.node_count(), 4);
        assert_eq!(s.roots().len(), 2);
    }

    #[test]
    fn events_are_recorded() {
        let mut s = Scene::new();
        let id = s.create_node("a", None, Transform::default()).unwrap();
        s.rename(id, "b").unwrap();
        s.destroy_node(id).unwrap();
        assert_eq!(s.events().len(), 3);

        let drained = s.drain_events();
        assert_eq!(drained[2], SceneEvent::Destroyed { id });
        assert!(s.events().is_empty());
    }

    #[test]
    fn state_hash_tracks_sibling_order() {
        let mut s = Scene::new();
        let a = s.create_node("a", None, Transform::default()).unwrap();
        let _b = s.create_node("b", None, Transform::default()).unwrap();
        let before = s.state_hash();
        s.reparent(a, None, None).unwrap();
        assert_ne!(s.state_hash(), before);
    }
}
