//! Scene kernel: the node-graph primitives the editor core drives, plus the
//! per-frame clock that modules read their delta time from.
//!
//! # Invariants
//! - All scene mutations flow through explicit operations and are logged.
//! - A failed operation leaves the scene untouched.
//! - Sibling order is part of observable state and survives undo.

pub mod clock;
pub mod scene;

pub use clock::{FrameClock, FrameTime};
pub use scene::{Node, NodeRecord, Scene, SceneError, SceneEvent, Subtree};
