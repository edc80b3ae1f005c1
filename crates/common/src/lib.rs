//! Shared identifiers and value types used across the editor crates.

mod change;
mod types;

pub use change::{ChangeKind, FsChange};
pub use types::{NodeId, Transform};
