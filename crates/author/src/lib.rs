//! Authoring: reversible editor commands, the undo/redo stack, selection, and
//! the notification bus panels subscribe to.
//!
//! # Invariants
//! - Every command is reversible; undo after apply restores the prior scene
//!   and selection.
//! - A command that fails to apply leaves no trace: no mutation, no stack entry.
//! - Every applied command publishes an event naming the affected nodes.

pub mod command;
pub mod commands;
pub mod context;
pub mod events;
pub mod selection;
pub mod stack;

pub use command::{Command, CommandError};
pub use commands::{
    CreateNode, DeleteNodes, DuplicateNodes, RenameNode, ReparentNodes, SelectNodes,
    TransformNodes,
};
pub use context::EditorContext;
pub use events::{EditorEvent, EditorEventKind, EventBus, SubscriptionId};
pub use selection::Selection;
pub use stack::CommandStack;
