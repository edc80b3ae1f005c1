use crate::class::{Behaviour, ModuleClass};
use crate::error::SnapshotError;
use crate::manifest::Manifest;
use crate::snapshot::{AttributeSnapshot, RestoreReport};
use crate::value::{AttrValue, Attributes};
use levelforge_common::NodeId;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Handle for a loaded module. Ids are never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a loaded module. Unloading removes the record entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Loaded in edit mode; not receiving callbacks.
    Loaded,
    /// Receiving `on_update` every frame.
    Running,
    /// Play is paused; attributes are kept but no callbacks run.
    Suspended,
}

/// One loaded module file and its live instance.
pub struct ModuleRecord {
    pub(crate) id: ModuleId,
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) class: Rc<ModuleClass>,
    pub(crate) sort: i32,
    /// Load sequence number, breaks ties between equal sort values.
    pub(crate) order: u64,
    pub(crate) node_name: Option<String>,
    pub(crate) node: Option<NodeId>,
    /// Field overrides as last read from the file.
    pub(crate) manifest_fields: BTreeMap<String, AttrValue>,
    pub(crate) attrs: Attributes,
    pub(crate) behaviour: Box<dyn Behaviour>,
    pub(crate) snapshot: Option<AttributeSnapshot>,
    pub(crate) state: ModuleState,
    /// Whether `on_start` has run since the module last entered play.
    pub(crate) started: bool,
}

impl ModuleRecord {
    pub(crate) fn instantiate(id: ModuleId, order: u64, path: PathBuf, manifest: Manifest) -> Self {
        let (behaviour, mut attrs) = manifest.class.instantiate();
        for (field, value) in &manifest.fields {
            attrs.set(field.clone(), value.clone());
        }
        Self {
            id,
            path,
            name: manifest.name,
            class: manifest.class,
            sort: manifest.sort,
            order,
            node_name: manifest.node,
            node: None,
            manifest_fields: manifest.fields,
            attrs,
            behaviour,
            snapshot: None,
            state: ModuleState::Loaded,
            started: false,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &ModuleClass {
        &self.class
    }

    pub fn sort(&self) -> i32 {
        self.sort
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&AttributeSnapshot> {
        self.snapshot.as_ref()
    }

    /// Capture the current attributes as this record's snapshot, replacing
    /// any earlier one. Returns the attributes that had to be skipped.
    pub fn save_data(&mut self) -> Vec<SnapshotError> {
        let (snapshot, skipped) = AttributeSnapshot::capture(&self.class, &self.attrs);
        tracing::debug!(
            module = %self.id,
            name = %self.name,
            captured = snapshot.len(),
            skipped = skipped.len(),
            "saved module data"
        );
        self.snapshot = Some(snapshot);
        skipped
    }

    /// Write the last snapshot back into the live attributes. The snapshot is
    /// kept, so this can be called repeatedly.
    pub fn reload_data(&mut self, remove_differences: bool) -> Result<RestoreReport, SnapshotError> {
        let snapshot = self.snapshot.as_ref().ok_or(SnapshotError::Missing)?;
        let report = snapshot.restore(&self.class, &mut self.attrs, remove_differences);
        tracing::debug!(
            module = %self.id,
            name = %self.name,
            restored = report.restored,
            removed = report.removed.len(),
            skipped = report.skipped.len(),
            "reloaded module data"
        );
        Ok(report)
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("class", &self.class.name())
            .field("sort", &self.sort)
            .field("node", &self.node)
            .field("state", &self.state)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ModuleRegistry;

    struct Idle;
    impl Behaviour for Idle {}

    fn idle() -> Box<dyn Behaviour> {
        Box::new(Idle)
    }

    fn record(src: &str) -> ModuleRecord {
        let mut registry = ModuleRegistry::new();
        registry.register(ModuleClass::new("Lamp", idle).field("lit", false).field("watts", 40i64));
        let path = PathBuf::from("lamp.module.yaml");
        let manifest = Manifest::parse(&path, src, &registry).unwrap();
        ModuleRecord::instantiate(ModuleId(1), 0, path, manifest)
    }

    #[test]
    fn manifest_fields_override_defaults() {
        let rec = record("class: Lamp\nfields:\n  watts: 60\n");
        assert_eq!(rec.attrs().int("watts"), Some(60));
        assert_eq!(rec.attrs().bool("lit"), Some(false));
        assert_eq!(rec.name(), "lamp");
        assert_eq!(rec.state(), ModuleState::Loaded);
        assert_eq!(rec.id().to_string(), "#1");
    }

    #[test]
    fn reload_without_snapshot_is_an_error() {
        let mut rec = record("class: Lamp\n");
        assert_eq!(rec.reload_data(false), Err(SnapshotError::Missing));
    }

    #[test]
    fn save_then_reload_round_trips_mutations() {
        let mut rec = record("class: Lamp\n");
        assert!(rec.save_data().is_empty());
        rec.attrs_mut().set("lit", true);
        rec.attrs_mut().set("flicker", 0.3);

        let report = rec.reload_data(true).unwrap();
        assert_eq!(rec.attrs().bool("lit"), Some(false));
        assert!(!rec.attrs().contains("flicker"));
        assert_eq!(report.removed, vec!["flicker".to_owned()]);

        rec.attrs_mut().set("lit", true);
        rec.reload_data(false).unwrap();
        assert_eq!(rec.attrs().bool("lit"), Some(false));
    }
}
