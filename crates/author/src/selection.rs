use levelforge_common::NodeId;
use levelforge_kernel::Scene;

/// The editor's ordered selection set. The first entry is the primary
/// selection (the one gizmos attach to).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: Vec<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn primary(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace the selection, dropping duplicates. Returns the previous one.
    pub fn replace(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        let mut next: Vec<NodeId> = Vec::new();
        for id in nodes {
            if !next.contains(&id) {
                next.push(id);
            }
        }
        std::mem::replace(&mut self.nodes, next)
    }

    pub fn clear(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes)
    }

    /// Drop entries that no longer exist in the scene.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.nodes.retain(|id| scene.contains(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelforge_common::Transform;

    #[test]
    fn replace_dedups_and_returns_previous() {
        let mut sel = Selection::new();
        let a = NodeId::new();
        let b = NodeId::new();
        assert!(sel.replace([a, b, a]).is_empty());
        assert_eq!(sel.nodes(), &[a, b]);
        assert_eq!(sel.primary(), Some(a));

        let prev = sel.replace([b]);
        assert_eq!(prev, vec![a, b]);
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn retain_existing_drops_removed_nodes() {
        let mut scene = Scene::new();
        let kept = scene.create_node("kept", None, Transform::default()).unwrap();
        let mut sel = Selection::new();
        sel.replace([kept, NodeId::new()]);
        sel.retain_existing(&scene);
        assert_eq!(sel.nodes(), &[kept]);
    }
}
