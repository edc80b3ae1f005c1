//! Script modules: discovery, loading, hot reload, and the play-mode
//! attribute snapshot that puts state back when play ends.
//!
//! # Invariants
//! - A failed load or reimport never disturbs records already loaded.
//! - Transient attributes are never captured; opaque values are skipped
//!   with a warning, never a hard failure.
//! - `save_data` followed by `reload_data(false)` leaves attributes unchanged.

pub mod builtin;
pub mod class;
pub mod config;
pub mod discover;
pub mod error;
pub mod manifest;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod value;

pub use class::{Behaviour, Factory, FieldDecl, ModuleClass, ModuleContext, ModuleRegistry};
pub use config::{CONFIG_FILE, NodeDecl, Project, ProjectConfig};
pub use discover::Discovery;
pub use error::{LoadError, ProjectError, SnapshotError};
pub use manifest::Manifest;
pub use record::{ModuleId, ModuleRecord, ModuleState};
pub use snapshot::{AttributeSnapshot, RestoreReport};
pub use store::{ChangeReport, LoadReport, ModuleStore, PlayMode, UpdateStats};
pub use value::{AttrKind, AttrValue, Attributes, Opaque};
