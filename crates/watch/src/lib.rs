//! File watching for hot reload.
//!
//! The debouncer thread waits for the project to go quiet for the debounce
//! window, collapses the batch to one change per path, and forwards it over a
//! channel. The editor thread drains the channel without blocking.

mod debounce;
mod watcher;

pub use debounce::{coalesce, merge};
pub use watcher::{ChangeFeed, ProjectWatcher, WatchError, translate, translate_batch};
