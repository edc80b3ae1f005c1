use crate::context::EditorContext;
use levelforge_common::NodeId;
use levelforge_kernel::SceneError;

/// Errors from applying or undoing a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} is still present; cannot restore it")]
    NodeExists(NodeId),
    #[error("cannot parent {node} under {parent}: it would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("{0} has nothing to act on")]
    Empty(&'static str),
    #[error("{0} has not been applied")]
    NotApplied(&'static str),
}

impl From<SceneError> for CommandError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::NodeNotFound(id) => Self::NodeNotFound(id),
            SceneError::DuplicateId(id) => Self::NodeExists(id),
            SceneError::Cycle { node, parent } => Self::Cycle { node, parent },
        }
    }
}

/// A reversible editing operation.
///
/// `apply` must check every precondition before it mutates anything, so an
/// `Err` leaves scene, selection and bus exactly as they were. Commands keep
/// whatever they need to reverse themselves (prior transforms, prior parents,
/// prior selection, removed subtrees). `apply` is called again on redo and must
/// reproduce the original effect, including node ids.
pub trait Command: std::fmt::Debug {
    /// Short human-readable name, shown in undo/redo menus.
    fn label(&self) -> &'static str;

    fn apply(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError>;

    fn undo(&mut self, ctx: &mut EditorContext) -> Result<(), CommandError>;
}

/// Fail with `NodeNotFound` for the first id missing from the scene.
pub(crate) fn require_nodes(ctx: &EditorContext, ids: &[NodeId]) -> Result<(), CommandError> {
    match ids.iter().find(|id| !ctx.scene.contains(**id)) {
        Some(missing) => Err(CommandError::NodeNotFound(*missing)),
        None => Ok(()),
    }
}
