use crate::debounce::merge;
use levelforge_common::{ChangeKind, FsChange};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("cannot watch {}: not a directory", .0.display())]
    InvalidRoot(PathBuf),
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Map one raw notification to zero or more changes. Access and metadata-only
/// events are dropped; renames become a removal plus a creation.
pub fn translate(event: &notify::Event) -> Vec<FsChange> {
    let change = |path: &PathBuf, kind: ChangeKind, is_dir: bool| FsChange {
        path: path.clone(),
        kind,
        is_dir,
    };
    let mut out = Vec::new();
    match event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                let is_dir = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    _ => path.is_dir(),
                };
                out.push(change(path, ChangeKind::Created, is_dir));
            }
        }
        EventKind::Remove(kind) => {
            for path in &event.paths {
                out.push(change(path, ChangeKind::Removed, kind == RemoveKind::Folder));
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => {}
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to]) => {
                out.push(change(from, ChangeKind::Removed, to.is_dir()));
                out.push(change(to, ChangeKind::Created, to.is_dir()));
            }
            (RenameMode::From, paths) => {
                out.extend(paths.iter().map(|p| change(p, ChangeKind::Removed, false)));
            }
            (RenameMode::To, paths) => {
                out.extend(paths.iter().map(|p| change(p, ChangeKind::Created, p.is_dir())));
            }
            (_, paths) => {
                for path in paths {
                    let kind = if path.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Removed
                    };
                    out.push(change(path, kind, path.is_dir()));
                }
            }
        },
        EventKind::Modify(_) => {
            for path in &event.paths {
                out.push(change(path, ChangeKind::Modified, path.is_dir()));
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
    out
}

/// Translate one debounced batch and collapse it to one change per path.
pub fn translate_batch<'a>(events: impl IntoIterator<Item = &'a notify::Event>) -> Vec<FsChange> {
    merge(events.into_iter().flat_map(translate))
}

/// Receiving end of the batch channel.
///
/// The debouncer thread sends one batch per quiet period; `poll` runs on the
/// editor thread and merges whatever batches have arrived.
#[derive(Debug)]
pub struct ChangeFeed {
    rx: mpsc::Receiver<Vec<FsChange>>,
    disconnected: bool,
}

impl ChangeFeed {
    pub fn channel() -> (mpsc::Sender<Vec<FsChange>>, Self) {
        let (tx, rx) = mpsc::channel();
        let feed = Self {
            rx,
            disconnected: false,
        };
        (tx, feed)
    }

    /// Drain the channel without blocking.
    pub fn poll(&mut self) -> Vec<FsChange> {
        let mut batches = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(batch) => batches.push(batch),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::warn!("change feed disconnected");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        let changes = merge(batches.into_iter().flatten());
        for change in &changes {
            tracing::trace!(path = %change.path.display(), kind = ?change.kind, "fs change");
        }
        changes
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Recursive, debounced watch over a project root feeding a [`ChangeFeed`].
pub struct ProjectWatcher {
    _watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    root: PathBuf,
    feed: ChangeFeed,
}

impl ProjectWatcher {
    pub fn new(root: &Path, window: Duration) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::InvalidRoot(root.to_path_buf()));
        }
        let (tx, feed) = ChangeFeed::channel();
        let mut debouncer = new_debouncer(window, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let batch = translate_batch(events.iter().map(|e| &e.event));
                    if !batch.is_empty() {
                        // The receiver only goes away when the watcher is dropped.
                        let _ = tx.send(batch);
                    }
                }
                Err(errors) => {
                    for err in errors {
                        tracing::warn!(%err, "file watcher error");
                    }
                }
            }
        })?;
        debouncer.watch(root, RecursiveMode::Recursive)?;
        tracing::info!(root = %root.display(), window_ms = window.as_millis() as u64, "watching project");

        Ok(Self {
            _watcher: debouncer,
            root: root.to_path_buf(),
            feed,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn poll(&mut self) -> Vec<FsChange> {
        self.feed.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::Event;
    use notify::event::DataChange;

    #[test]
    fn translates_basic_events() {
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path("a.module.yaml".into());
        assert_eq!(
            translate(&created),
            vec![FsChange::file("a.module.yaml", ChangeKind::Created)]
        );

        let removed = Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("props".into());
        assert_eq!(translate(&removed), vec![FsChange::dir("props", ChangeKind::Removed)]);

        let written = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("missing/a.module.yaml".into());
        assert_eq!(
            translate(&written),
            vec![FsChange::file("missing/a.module.yaml", ChangeKind::Modified)]
        );
    }

    #[test]
    fn rename_splits_into_remove_and_create() {
        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("old.module.yaml".into())
            .add_path("new.module.yaml".into());
        assert_eq!(
            translate(&rename),
            vec![
                FsChange::file("old.module.yaml", ChangeKind::Removed),
                FsChange::file("new.module.yaml", ChangeKind::Created),
            ]
        );
    }

    #[test]
    fn access_and_metadata_are_ignored() {
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path("a".into());
        assert!(translate(&access).is_empty());
        let meta = Event::new(EventKind::Modify(ModifyKind::Metadata(
            notify::event::MetadataKind::Permissions,
        )))
        .add_path("a".into());
        assert!(translate(&meta).is_empty());
    }

    #[test]
    fn batch_collapses_repeated_writes() {
        let write = || {
            Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path("a.module.yaml".into())
        };
        let events: Vec<Event> = (0..5).map(|_| write()).collect();
        assert_eq!(
            translate_batch(&events),
            vec![FsChange::file("a.module.yaml", ChangeKind::Modified)]
        );
    }

    #[test]
    fn feed_merges_batches_sent_from_another_thread() {
        let (tx, mut feed) = ChangeFeed::channel();
        let sender = std::thread::spawn(move || {
            tx.send(vec![FsChange::file("a.module.yaml", ChangeKind::Created)]).unwrap();
            tx.send(vec![
                FsChange::file("a.module.yaml", ChangeKind::Modified),
                FsChange::file("b.module.yaml", ChangeKind::Removed),
            ])
            .unwrap();
        });
        sender.join().unwrap();

        assert_eq!(
            feed.poll(),
            vec![
                FsChange::file("a.module.yaml", ChangeKind::Created),
                FsChange::file("b.module.yaml", ChangeKind::Removed),
            ]
        );
        assert!(feed.is_disconnected());
        assert!(feed.poll().is_empty());
    }

    #[test]
    fn watcher_rejects_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ProjectWatcher::new(&tmp.path().join("nope"), Duration::from_millis(10));
        assert!(matches!(err, Err(WatchError::InvalidRoot(_))));
    }
}
