//! Built-in editor commands covering what the GUI sends: create, delete,
//! duplicate, reparent, rename, transform and select.

use crate::command::{require_nodes, Command, CommandError};
use crate::context::EditorContext;
use crate::events::{EditorEvent, EditorEventKind};
use levelforge_common::{NodeId, Transform};
use levelforge_kernel::{Scene, Subtree};

/// Drop ids whose ancestor is also in the list, keeping first-seen order.
/// Acting on an ancestor already covers its descendants.
fn top_level(scene: &Scene, ids: &[NodeId]) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    for id in ids {
        if out.contains(id) {
            continue;
        }
        let covered = ids
            .iter()
            .any(|other| other != id && scene.is_ancestor(*other, *id));
        if !covered {
            out.push(*id);
        }
    }
    out
}

fn set_selection(ctx: &mut EditorContext, nodes: Vec<NodeId>) -> Vec<NodeId> {
    let prior = ctx.selection.replace(nodes);
    let current = ctx.selection.nodes().to_vec();
    ctx.notify(EditorEvent::new(EditorEventKind::Selected, current));
    prior
}

/// Check that a set of removed subtrees can be put back.
fn require_restorable(ctx: &EditorContext, subtrees: &[Subtree]) -> Result<(), CommandError> {
    for subtree in subtrees {
        if let Some(parent) = subtree.nodes.first().and_then(|n| n.parent) {
            if !ctx.scene.contains(parent) {
                return Err(CommandError::NodeNotFound(parent));
            }
        }
        if let Some(clash) = subtree.nodes.iter().find(|n| ctx.scene.contains(n.id)) {
            return Err(CommandError::NodeExists(clash.id));
        }
    }
    Ok(())
}

/// Create one node and select it.
#[derive(Debug)]
pub struct CreateNode {
    name: String,
    parent: Option<NodeId>,
    transform: Transform,
    id: Option<NodeId>,
    prior_selection: Vec<NodeId>,
}

impl CreateNode {
    pub fn new(name: impl Into<String>, parent: Option<NodeId>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            transform,
            id: None,
            prior_selection: Vec::new(),
        }
    }

    /// Id of the created node, once applied.
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }
}

impl Command for CreateNode {
    fn label(&self) -> &'static str {
        "Create Node"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        let id = self.id.unwrap_or_default();
        ctx.scene.create_node_with_id(
            id,
            self.name.clone(),
            self.parent,
            self.transform,
            None,
        )?;
        self.id = Some(id);
        ctx.notify(EditorEvent::new(EditorEventKind::Added, vec![id]));
        self.prior_selection = set_selection(ctx, vec![id]);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        let id = self.id.ok_or(CommandError::NotApplied("Create Node"))?;
        let removed = ctx.scene.destroy_node(id)?;
        ctx.notify(EditorEvent::new(EditorEventKind::Removed, removed.ids()));
        set_selection(ctx, std::mem::take(&mut self.prior_selection));
        Ok(())
    }
}

/// Delete nodes together with their subtrees. Deleted nodes leave the
/// selection; undo restores both the subtrees and the prior selection.
#[derive(Debug)]
pub struct DeleteNodes {
    targets: Vec<NodeId>,
    removed: Vec<Subtree>,
    prior_selection: Vec<NodeId>,
}

impl DeleteNodes {
    pub fn new(targets: Vec<NodeId>) -> Self {
        Self {
            targets,
            removed: Vec::new(),
            prior_selection: Vec::new(),
        }
    }
}

impl Command for DeleteNodes {
    fn label(&self) -> &'static str {
        "Delete Nodes"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.targets.is_empty() {
            return Err(CommandError::Empty("Delete Nodes"));
        }
        require_nodes(ctx, &self.targets)?;
        let roots = top_level(&ctx.scene, &self.targets);

        let mut removed = Vec::with_capacity(roots.len());
        for root in roots {
            removed.push(ctx.scene.destroy_node(root)?);
        }
        let ids: Vec<NodeId> = removed.iter().flat_map(|s| s.ids()).collect();
        ctx.notify(EditorEvent::new(EditorEventKind::Removed, ids.clone()));

        let remaining: Vec<NodeId> = ctx
            .selection
            .nodes()
            .iter()
            .copied()
            .filter(|id| !ids.contains(id))
            .collect();
        self.prior_selection = set_selection(ctx, remaining);
        self.removed = removed;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.removed.is_empty() {
            return Err(CommandError::NotApplied("Delete Nodes"));
        }
        require_restorable(ctx, &self.removed)?;
        // Reverse order: each recorded index was taken after the earlier removals.
        for subtree in self.removed.iter().rev() {
            ctx.scene.restore_subtree(subtree)?;
        }
        let ids: Vec<NodeId> = self.removed.iter().flat_map(|s| s.ids()).collect();
        self.removed.clear();
        ctx.notify(EditorEvent::new(EditorEventKind::Added, ids));
        set_selection(ctx, std::mem::take(&mut self.prior_selection));
        Ok(())
    }
}

/// Duplicate N nodes (with their subtrees) as one undoable step. Each copy is
/// placed right after its source and the copies become the selection.
#[derive(Debug)]
pub struct DuplicateNodes {
    sources: Vec<NodeId>,
    copies: Vec<Subtree>,
    prior_selection: Vec<NodeId>,
}

impl DuplicateNodes {
    pub fn new(sources: Vec<NodeId>) -> Self {
        Self {
            sources,
            copies: Vec::new(),
            prior_selection: Vec::new(),
        }
    }

    /// Root ids of the copies, once applied.
    pub fn copies(&self) -> Vec<NodeId> {
        self.copies.iter().map(Subtree::root).collect()
    }
}

impl Command for DuplicateNodes {
    fn label(&self) -> &'static str {
        "Duplicate Nodes"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.copies.is_empty() {
            if self.sources.is_empty() {
                return Err(CommandError::Empty("Duplicate Nodes"));
            }
            require_nodes(ctx, &self.sources)?;
            let sources = top_level(&ctx.scene, &self.sources);
            for source in sources {
                let original = ctx.scene.copy_subtree(source)?;
                let copy = original.with_fresh_ids().at_index(original.index + 1);
                ctx.scene.restore_subtree(&copy)?;
                self.copies.push(copy);
            }
        } else {
            // Redo: same ids, same positions, restored in original order.
            require_restorable(ctx, &self.copies)?;
            for copy in &self.copies {
                ctx.scene.restore_subtree(copy)?;
            }
        }
        let ids: Vec<NodeId> = self.copies.iter().flat_map(|s| s.ids()).collect();
        ctx.notify(EditorEvent::new(EditorEventKind::Added, ids));
        self.prior_selection = set_selection(ctx, self.copies());
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.copies.is_empty() {
            return Err(CommandError::NotApplied("Duplicate Nodes"));
        }
        require_nodes(ctx, &self.copies())?;
        let mut ids = Vec::new();
        for copy in self.copies.iter().rev() {
            ids.extend(ctx.scene.destroy_node(copy.root())?.ids());
        }
        ctx.notify(EditorEvent::new(EditorEventKind::Removed, ids));
        set_selection(ctx, std::mem::take(&mut self.prior_selection));
        Ok(())
    }
}

/// Move nodes under a new parent (or to the scene root).
#[derive(Debug)]
pub struct ReparentNodes {
    targets: Vec<NodeId>,
    new_parent: Option<NodeId>,
    /// (node, old parent, old sibling index), in the order moves happened.
    previous: Vec<(NodeId, Option<NodeId>, usize)>,
}

impl ReparentNodes {
    pub fn new(targets: Vec<NodeId>, new_parent: Option<NodeId>) -> Self {
        Self {
            targets,
            new_parent,
            previous: Vec::new(),
        }
    }
}

impl Command for ReparentNodes {
    fn label(&self) -> &'static str {
        "Reparent Nodes"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.targets.is_empty() {
            return Err(CommandError::Empty("Reparent Nodes"));
        }
        require_nodes(ctx, &self.targets)?;
        if let Some(parent) = self.new_parent {
            require_nodes(ctx, &[parent])?;
            if let Some(node) = self
                .targets
                .iter()
                .find(|t| ctx.scene.is_ancestor(**t, parent))
            {
                return Err(CommandError::Cycle {
                    node: *node,
                    parent,
                });
            }
        }
        let targets = top_level(&ctx.scene, &self.targets);
        let mut previous = Vec::with_capacity(targets.len());
        for target in &targets {
            let (old_parent, old_index) = ctx.scene.reparent(*target, self.new_parent, None)?;
            previous.push((*target, old_parent, old_index));
        }
        self.previous = previous;
        ctx.notify(EditorEvent::new(EditorEventKind::Reparented, targets));
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.previous.is_empty() {
            return Err(CommandError::NotApplied("Reparent Nodes"));
        }
        let nodes: Vec<NodeId> = self.previous.iter().map(|(n, _, _)| *n).collect();
        require_nodes(ctx, &nodes)?;
        let parents: Vec<NodeId> = self.previous.iter().filter_map(|(_, p, _)| *p).collect();
        require_nodes(ctx, &parents)?;
        for (node, old_parent, old_index) in self.previous.iter().rev() {
            ctx.scene.reparent(*node, *old_parent, Some(*old_index))?;
        }
        self.previous.clear();
        ctx.notify(EditorEvent::new(EditorEventKind::Reparented, nodes));
        Ok(())
    }
}

#[derive(Debug)]
pub struct RenameNode {
    id: NodeId,
    name: String,
    previous: Option<String>,
}

impl RenameNode {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            previous: None,
        }
    }
}

impl Command for RenameNode {
    fn label(&self) -> &'static str {
        "Rename Node"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        let old = ctx.scene.rename(self.id, self.name.clone())?;
        self.previous = Some(old);
        ctx.notify(EditorEvent::new(EditorEventKind::Renamed, vec![self.id]));
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        let old = self
            .previous
            .take()
            .ok_or(CommandError::NotApplied("Rename Node"))?;
        if let Err(err) = ctx.scene.rename(self.id, old.clone()) {
            self.previous = Some(old);
            return Err(err.into());
        }
        ctx.notify(EditorEvent::new(EditorEventKind::Renamed, vec![self.id]));
        Ok(())
    }
}

/// Set transforms on one or more nodes in a single step.
#[derive(Debug)]
pub struct TransformNodes {
    changes: Vec<(NodeId, Transform)>,
    previous: Vec<(NodeId, Transform)>,
}

impl TransformNodes {
    pub fn new(changes: Vec<(NodeId, Transform)>) -> Self {
        Self {
            changes,
            previous: Vec::new(),
        }
    }

    pub fn single(id: NodeId, transform: Transform) -> Self {
        Self::new(vec![(id, transform)])
    }
}

impl Command for TransformNodes {
    fn label(&self) -> &'static str {
        "Transform Nodes"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.changes.is_empty() {
            return Err(CommandError::Empty("Transform Nodes"));
        }
        let ids: Vec<NodeId> = self.changes.iter().map(|(id, _)| *id).collect();
        require_nodes(ctx, &ids)?;
        let mut previous = Vec::with_capacity(self.changes.len());
        for (id, transform) in &self.changes {
            previous.push((*id, ctx.scene.set_transform(*id, *transform)?));
        }
        self.previous = previous;
        ctx.notify(EditorEvent::new(EditorEventKind::Transformed, ids));
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        if self.previous.is_empty() {
            return Err(CommandError::NotApplied("Transform Nodes"));
        }
        let ids: Vec<NodeId> = self.previous.iter().map(|(id, _)| *id).collect();
        require_nodes(ctx, &ids)?;
        // Reverse so a node listed twice ends at its original transform.
        for (id, transform) in self.previous.iter().rev() {
            ctx.scene.set_transform(*id, *transform)?;
        }
        self.previous.clear();
        ctx.notify(EditorEvent::new(EditorEventKind::Transformed, ids));
        Ok(())
    }
}

/// Replace the selection.
#[derive(Debug)]
pub struct SelectNodes {
    nodes: Vec<NodeId>,
    prior: Option<Vec<NodeId>>,
}

impl SelectNodes {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes, prior: None }
    }

    pub fn clear() -> Self {
        Self::new(Vec::new())
    }
}

impl Command for SelectNodes {
    fn label(&self) -> &'static str {
        "Select"
    }

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        require_nodes(ctx, &self.nodes)?;
        self.prior = Some(set_selection(ctx, self.nodes.clone()));
        Ok(())
    }

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError> {
        let prior = self.prior.take().ok_or(CommandError::NotApplied("Select"))?;
        // Nodes deleted outside the stack cannot be reselected.
        let prior: Vec<NodeId> = prior.into_iter().filter(|id| ctx.scene.contains(*id)).collect();
        set_selection(ctx, prior);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::CommandStack;
    use glam::Vec3;

    fn at(x: f32) -> Transform {
        Transform::from_position(Vec3::new(x, 0.0, 0.0))
    }

    fn snapshot(ctx: &EditorContext) -> (u64, Vec<NodeId>) {
        (ctx.scene.state_hash(), ctx.selection.nodes().to_vec())
    }

    /// root a (children a1, a2), root b
    fn sample() -> (EditorContext, [NodeId; 4]) {
        let mut ctx = EditorContext::new();
        let a = ctx.scene.create_node("a", None, at(0.0)).unwrap();
        let a1 = ctx.scene.create_node("a1", Some(a), at(1.0)).unwrap();
        let a2 = ctx.scene.create_node("a2", Some(a), at(2.0)).unwrap();
        let b = ctx.scene.create_node("b", None, at(3.0)).unwrap();
        (ctx, [a, a1, a2, b])
    }

    #[test]
    fn create_selects_and_undo_restores_selection() {
        let (mut ctx, [a, ..]) = sample();
        ctx.selection.replace([a]);
        let mut cmd = CreateNode::new("new", Some(a), at(9.0));
        cmd.apply(&mut ctx).unwrap();
        let id = cmd.id().unwrap();
        assert_eq!(ctx.selection.nodes(), &[id]);
        assert_eq!(ctx.scene.children(Some(a)).last(), Some(&id));

        cmd.undo(&mut ctx).unwrap();
        assert!(!ctx.scene.contains(id));
        assert_eq!(ctx.selection.nodes(), &[a]);
    }

    #[test]
    fn delete_subtree_and_undo() {
        let (mut ctx, [a, a1, a2, b]) = sample();
        ctx.selection.replace([a1, b]);
        let before = snapshot(&ctx);

        let mut stack = CommandStack::new();
        // a1 is covered by a; listing it must not break anything.
        stack
            .execute(&mut ctx, DeleteNodes::new(vec![a1, a]))
            .unwrap();
        assert_eq!(ctx.scene.node_count(), 1);
        assert!(!ctx.scene.contains(a2));
        assert_eq!(ctx.selection.nodes(), &[b]);

        stack.undo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), before);

        stack.redo(&mut ctx).unwrap();
        assert_eq!(ctx.scene.node_count(), 1);
    }

    #[test]
    fn delete_multiple_siblings_restores_order() {
        let (mut ctx, [_, a1, a2, _]) = sample();
        let before = snapshot(&ctx);
        let mut cmd = DeleteNodes::new(vec![a2, a1]);
        cmd.apply(&mut ctx).unwrap();
        cmd.undo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn delete_empty_list_is_rejected() {
        let (mut ctx, _) = sample();
        let mut cmd = DeleteNodes::new(Vec::new());
        assert_eq!(cmd.apply(&mut ctx), Err(CommandError::Empty("Delete Nodes")));
    }

    #[test]
    fn delete_with_one_missing_target_changes_nothing() {
        let (mut ctx, [a, ..]) = sample();
        let before = snapshot(&ctx);
        let ghost = NodeId::new();
        let mut cmd = DeleteNodes::new(vec![a, ghost]);
        assert_eq!(cmd.apply(&mut ctx), Err(CommandError::NodeNotFound(ghost)));
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn duplicate_is_one_atomic_step() {
        let (mut ctx, [a, _, _, b]) = sample();
        let before = snapshot(&ctx);
        let mut stack = CommandStack::new();
        stack
            .execute(&mut ctx, DuplicateNodes::new(vec![a, b]))
            .unwrap();
        // a has two children, so 3 + 1 new nodes.
        assert_eq!(ctx.scene.node_count(), 8);
        assert_eq!(ctx.selection.len(), 2);
        let copy_of_a = ctx.selection.nodes()[0];
        assert_eq!(ctx.scene.roots()[1], copy_of_a);
        assert_eq!(ctx.scene.children(Some(copy_of_a)).len(), 2);
        let after = snapshot(&ctx);

        stack.undo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), before);

        stack.redo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), after);
    }

    #[test]
    fn reparent_and_undo_restore_sibling_positions() {
        let (mut ctx, [a, a1, a2, b]) = sample();
        let before = snapshot(&ctx);
        let mut cmd = ReparentNodes::new(vec![a1, a2], Some(b));
        cmd.apply(&mut ctx).unwrap();
        assert_eq!(ctx.scene.children(Some(b)), &[a1, a2]);
        assert!(ctx.scene.children(Some(a)).is_empty());

        cmd.undo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn reparent_into_own_subtree_is_rejected() {
        let (mut ctx, [a, a1, ..]) = sample();
        let before = snapshot(&ctx);
        let mut cmd = ReparentNodes::new(vec![a], Some(a1));
        assert_eq!(
            cmd.apply(&mut ctx),
            Err(CommandError::Cycle { node: a, parent: a1 })
        );
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn reparent_to_root() {
        let (mut ctx, [a, a1, _, b]) = sample();
        let mut cmd = ReparentNodes::new(vec![a1], None);
        cmd.apply(&mut ctx).unwrap();
        assert_eq!(ctx.scene.roots(), &[a, b, a1]);
    }

    #[test]
    fn rename_round_trip() {
        let (mut ctx, [a, ..]) = sample();
        let mut cmd = RenameNode::new(a, "renamed");
        cmd.apply(&mut ctx).unwrap();
        assert_eq!(ctx.scene.get(a).unwrap().name, "renamed");
        cmd.undo(&mut ctx).unwrap();
        assert_eq!(ctx.scene.get(a).unwrap().name, "a");
        assert_eq!(cmd.undo(&mut ctx), Err(CommandError::NotApplied("Rename Node")));
    }

    #[test]
    fn batch_transform_with_repeated_node() {
        let (mut ctx, [a, _, _, b]) = sample();
        let before = snapshot(&ctx);
        let mut cmd = TransformNodes::new(vec![(a, at(10.0)), (b, at(11.0)), (a, at(12.0))]);
        cmd.apply(&mut ctx).unwrap();
        assert_eq!(ctx.scene.transform(a), Some(at(12.0)));
        cmd.undo(&mut ctx).unwrap();
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn select_rejects_missing_nodes() {
        let (mut ctx, [a, ..]) = sample();
        let ghost = NodeId::new();
        let mut cmd = SelectNodes::new(vec![a, ghost]);
        assert_eq!(cmd.apply(&mut ctx), Err(CommandError::NodeNotFound(ghost)));
        assert!(ctx.selection.is_empty());
    }

    #[test]
    fn clear_selection_publishes_empty_selected_event() {
        let (mut ctx, [a, ..]) = sample();
        ctx.selection.replace([a]);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        ctx.bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let mut cmd = SelectNodes::clear();
        cmd.apply(&mut ctx).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![EditorEvent::new(EditorEventKind::Selected, vec![])]
        );
        cmd.undo(&mut ctx).unwrap();
        assert_eq!(ctx.selection.nodes(), &[a]);
    }
}
