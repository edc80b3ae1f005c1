//! Developer tooling: read-only inspectors over the scene, loaded modules,
//! and the undo history.

pub mod inspector;

pub use inspector::{
    HistorySummary, ModuleInspector, ModuleRow, ModuleSummary, NodeInfo, SceneInspector,
    SceneSummary,
};
