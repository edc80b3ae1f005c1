use crate::class::{ModuleContext, ModuleRegistry};
use crate::discover::Discovery;
use crate::error::{LoadError, SnapshotError};
use crate::manifest::Manifest;
use crate::record::{ModuleId, ModuleRecord, ModuleState};
use crate::snapshot::{AttributeSnapshot, RestoreReport};
use levelforge_common::{ChangeKind, FsChange};
use levelforge_kernel::{FrameTime, Scene};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Whether the store is dispatching behaviour callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Edit,
    Playing,
    Paused,
}

/// Result of loading every discovered module file.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<ModuleId>,
    pub errors: Vec<LoadError>,
}

/// Result of applying a batch of filesystem changes.
#[derive(Debug, Default)]
pub struct ChangeReport {
    pub loaded: Vec<ModuleId>,
    pub reloaded: Vec<ModuleId>,
    pub unloaded: Vec<ModuleId>,
    pub errors: Vec<LoadError>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
            && self.reloaded.is_empty()
            && self.unloaded.is_empty()
            && self.errors.is_empty()
    }
}

/// Per-frame dispatch statistics.
#[derive(Debug, Clone, Default)]
pub struct UpdateStats {
    pub started: usize,
    pub dispatched: usize,
    pub frame_time: Duration,
}

/// Owns every loaded module and drives their play-mode lifecycle.
///
/// # Invariants
/// - At most one record per file path.
/// - Records outside play mode are `Loaded` and hold no snapshot.
/// - Callbacks run in ascending sort value, ties in load order.
#[derive(Debug)]
pub struct ModuleStore {
    registry: ModuleRegistry,
    discovery: Discovery,
    records: Vec<ModuleRecord>,
    next_id: u64,
    next_order: u64,
    mode: PlayMode,
}

impl ModuleStore {
    pub fn new(registry: ModuleRegistry, discovery: Discovery) -> Self {
        Self {
            registry,
            discovery,
            records: Vec::new(),
            next_id: 1,
            next_order: 0,
            mode: PlayMode::Edit,
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn records(&self) -> &[ModuleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut ModuleRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&ModuleRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    fn position_of_path(&self, path: &Path) -> Option<usize> {
        self.records.iter().position(|r| r.path == path)
    }

    /// Load one module file. Loading while play is active snapshots the new
    /// module and starts it on the next update.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<ModuleId, LoadError> {
        let path = path.as_ref();
        if self.position_of_path(path).is_some() {
            return Err(LoadError::AlreadyLoaded {
                path: path.to_path_buf(),
            });
        }
        let manifest = Manifest::read(path, &self.registry)?;

        let id = ModuleId(self.next_id);
        self.next_id += 1;
        let order = self.next_order;
        self.next_order += 1;

        let mut record = ModuleRecord::instantiate(id, order, path.to_path_buf(), manifest);
        match self.mode {
            PlayMode::Edit => {}
            PlayMode::Playing | PlayMode::Paused => {
                record.save_data();
                record.state = if self.mode == PlayMode::Playing {
                    ModuleState::Running
                } else {
                    ModuleState::Suspended
                };
            }
        }

        tracing::info!(
            module = %id,
            name = %record.name,
            class = record.class.name(),
            path = %path.display(),
            "loaded module"
        );
        self.records.push(record);
        Ok(id)
    }

    /// Load every file the discovery walk yields. Files that are already
    /// loaded are left alone; a failing file does not stop the rest.
    pub fn load_all(&mut self) -> LoadReport {
        let paths: Vec<PathBuf> = self.discovery.iter().collect();
        self.load_paths(paths)
    }

    fn load_paths(&mut self, paths: Vec<PathBuf>) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            if self.position_of_path(&path).is_some() {
                tracing::debug!(path = %path.display(), "already loaded");
                continue;
            }
            match self.load(&path) {
                Ok(id) => report.loaded.push(id),
                Err(err) => {
                    tracing::warn!(%err, "failed to load module");
                    report.errors.push(err);
                }
            }
        }
        report
    }

    /// Remove a record. Its state is discarded, including any snapshot.
    pub fn unload(&mut self, id: ModuleId) -> Option<ModuleRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let record = self.records.remove(index);
        tracing::info!(module = %id, name = %record.name, "unloaded module");
        Some(record)
    }

    pub fn unload_path(&mut self, path: &Path) -> Result<ModuleId, LoadError> {
        let id = self
            .find_by_path(path)
            .map(|r| r.id)
            .ok_or_else(|| LoadError::NotLoaded {
                path: path.to_path_buf(),
            })?;
        self.unload(id);
        Ok(id)
    }

    /// Record ids in callback order.
    pub fn dispatch_order(&self) -> Vec<ModuleId> {
        let mut keyed: Vec<_> = self.records.iter().map(|r| (r.sort, r.order, r.id)).collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Attach modules to scene nodes by name. Returns the modules whose node
    /// name matched nothing; those stay unattached.
    pub fn bind_nodes(&mut self, scene: &Scene) -> Vec<(ModuleId, String)> {
        let mut unresolved = Vec::new();
        for record in &mut self.records {
            let Some(name) = &record.node_name else {
                record.node = None;
                continue;
            };
            record.node = scene.find_by_name(name);
            match record.node {
                Some(node) => tracing::debug!(module = %record.id, %node, "bound module to node"),
                None => {
                    tracing::warn!(module = %record.id, node = %name, "no node with that name");
                    unresolved.push((record.id, name.clone()));
                }
            }
        }
        unresolved
    }

    /// Snapshot every module, then start them. Returns attributes that could
    /// not be captured.
    pub fn enter_play(&mut self, scene: &mut Scene) -> Vec<(ModuleId, SnapshotError)> {
        if self.mode != PlayMode::Edit {
            tracing::warn!(mode = ?self.mode, "enter_play ignored: already in play");
            return Vec::new();
        }
        let mut skipped = Vec::new();
        for record in &mut self.records {
            skipped.extend(record.save_data().into_iter().map(|e| (record.id, e)));
            record.state = ModuleState::Running;
            record.started = false;
        }
        self.mode = PlayMode::Playing;
        tracing::info!(modules = self.records.len(), "entered play mode");

        let started = self.start_pending(scene, FrameTime::default());
        tracing::debug!(started, "started modules");
        skipped
    }

    fn start_pending(&mut self, scene: &mut Scene, time: FrameTime) -> usize {
        let mut started = 0;
        for id in self.dispatch_order() {
            let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
                continue;
            };
            if record.state != ModuleState::Running || record.started {
                continue;
            }
            let mut cx = ModuleContext {
                attrs: &mut record.attrs,
                node: record.node,
                scene: &mut *scene,
                time,
            };
            record.behaviour.on_start(&mut cx);
            record.started = true;
            started += 1;
        }
        started
    }

    /// Run one frame: start any module that has not started yet, then call
    /// `on_update` on every running module in order. Does nothing unless
    /// playing.
    pub fn update(&mut self, scene: &mut Scene, time: FrameTime) -> UpdateStats {
        if self.mode != PlayMode::Playing {
            return UpdateStats::default();
        }
        let _span = tracing::info_span!("module_update", frame = time.frame).entered();
        let frame_start = Instant::now();

        let started = self.start_pending(scene, time);
        let mut dispatched = 0;
        for id in self.dispatch_order() {
            let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
                continue;
            };
            if record.state != ModuleState::Running {
                continue;
            }
            let mut cx = ModuleContext {
                attrs: &mut record.attrs,
                node: record.node,
                scene: &mut *scene,
                time,
            };
            record.behaviour.on_update(&mut cx);
            dispatched += 1;
        }

        let stats = UpdateStats {
            started,
            dispatched,
            frame_time: frame_start.elapsed(),
        };
        tracing::trace!(started, dispatched, "module update complete");
        stats
    }

    pub fn suspend(&mut self) {
        if self.mode != PlayMode::Playing {
            return;
        }
        for record in &mut self.records {
            if record.state == ModuleState::Running {
                record.state = ModuleState::Suspended;
            }
        }
        self.mode = PlayMode::Paused;
        tracing::info!("play suspended");
    }

    pub fn resume(&mut self) {
        if self.mode != PlayMode::Paused {
            return;
        }
        for record in &mut self.records {
            if record.state == ModuleState::Suspended {
                record.state = ModuleState::Running;
            }
        }
        self.mode = PlayMode::Playing;
        tracing::info!("play resumed");
    }

    /// Leave play mode, restoring every module's snapshot.
    pub fn exit_play(&mut self, remove_differences: bool) -> Vec<(ModuleId, RestoreReport)> {
        if self.mode == PlayMode::Edit {
            return Vec::new();
        }
        let mut reports = Vec::new();
        for record in &mut self.records {
            match record.reload_data(remove_differences) {
                Ok(report) => reports.push((record.id, report)),
                Err(err) => tracing::warn!(module = %record.id, %err, "nothing to restore"),
            }
            record.snapshot = None;
            record.state = ModuleState::Loaded;
            record.started = false;
        }
        self.mode = PlayMode::Edit;
        tracing::info!(modules = self.records.len(), remove_differences, "exited play mode");
        reports
    }

    /// Re-read a loaded module's file and swap in a fresh instance.
    ///
    /// Live attribute values carry over except fields whose value in the file
    /// changed, which take the new file value. The play-mode snapshot carries
    /// over with the same exception, so leaving play lands on the edited
    /// values. If the file no longer loads, the old instance stays active.
    pub fn reimport(&mut self, path: &Path) -> Result<ModuleId, LoadError> {
        let index = self.position_of_path(path).ok_or_else(|| LoadError::NotLoaded {
            path: path.to_path_buf(),
        })?;
        let manifest = match Manifest::read(path, &self.registry) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!(%err, "reimport failed, keeping previous instance");
                return Err(err);
            }
        };

        let old = &self.records[index];
        let edited: BTreeSet<String> = old
            .manifest_fields
            .keys()
            .chain(manifest.fields.keys())
            .filter(|k| old.manifest_fields.get(*k) != manifest.fields.get(*k))
            .cloned()
            .collect();
        let (live, _) = AttributeSnapshot::capture(&old.class, &old.attrs);
        let live = live.without(&edited);

        let mut fresh = ModuleRecord::instantiate(old.id, old.order, path.to_path_buf(), manifest);
        live.restore(&fresh.class, &mut fresh.attrs, false);
        // Runtime attributes are absent from a fresh instance, so restore skips them.
        for (name, value) in live.values() {
            if old.class.declared(name).is_none() && !fresh.attrs.contains(name) {
                fresh.attrs.set(name, value.clone());
            }
        }

        fresh.snapshot = old.snapshot.as_ref().map(|snapshot| {
            let mut snapshot = snapshot.clone();
            for name in edited.iter().filter(|n| !fresh.class.is_transient(n)) {
                if let Some(value) = fresh.attrs.get(name) {
                    snapshot.set(name, value.clone());
                }
            }
            snapshot
        });
        fresh.state = old.state;
        fresh.started = false;
        if fresh.node_name == old.node_name {
            fresh.node = old.node;
        } else {
            tracing::warn!(module = %old.id, "node name changed; call bind_nodes to reattach");
        }

        tracing::info!(
            module = %fresh.id,
            name = %fresh.name,
            edited = edited.len(),
            "reimported module"
        );
        let id = fresh.id;
        self.records[index] = fresh;
        Ok(id)
    }

    /// Apply debounced filesystem changes.
    ///
    /// A created or modified module file is loaded, or reimported if it is
    /// already loaded. A removed path unloads the record at that path and
    /// every record below it. A created directory loads every module file
    /// inside it.
    pub fn apply_changes(&mut self, changes: &[FsChange]) -> ChangeReport {
        let mut report = ChangeReport::default();
        for change in changes {
            let path = change.path();
            if self.discovery.is_excluded(path) {
                continue;
            }
            match change.kind {
                ChangeKind::Removed => {
                    let gone: Vec<ModuleId> = self
                        .records
                        .iter()
                        .filter(|r| r.path.starts_with(path))
                        .map(|r| r.id)
                        .collect();
                    for id in gone {
                        self.unload(id);
                        report.unloaded.push(id);
                    }
                }
                ChangeKind::Created if change.is_dir => {
                    let found: Vec<PathBuf> = self.discovery.scan(path).collect();
                    let loaded = self.load_paths(found);
                    report.loaded.extend(loaded.loaded);
                    report.errors.extend(loaded.errors);
                }
                ChangeKind::Modified if change.is_dir => {}
                ChangeKind::Created | ChangeKind::Modified => {
                    if !self.discovery.matches(path) {
                        continue;
                    }
                    let result = if self.position_of_path(path).is_some() {
                        self.reimport(path).map(|id| report.reloaded.push(id))
                    } else {
                        self.load(path).map(|id| report.loaded.push(id))
                    };
                    if let Err(err) = result {
                        tracing::warn!(%err, "change not applied");
                        report.errors.push(err);
                    }
                }
            }
        }
        report
    }
}
