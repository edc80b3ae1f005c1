use crate::value::AttrKind;
use std::path::{Path, PathBuf};

/// A module file could not be imported or instantiated.
///
/// A failed load never touches records that are already loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("{} does not name a module class", .path.display())]
    MissingClass { path: PathBuf },
    #[error("{}: unknown module class `{class}`", .path.display())]
    UnknownClass { path: PathBuf, class: String },
    #[error("{}: class `{class}` declares no field `{field}`", .path.display())]
    UnknownField {
        path: PathBuf,
        class: String,
        field: String,
    },
    #[error("{}: field `{field}` expects a {expected} value", .path.display())]
    FieldType {
        path: PathBuf,
        field: String,
        expected: AttrKind,
    },
    #[error("{} is already loaded", .path.display())]
    AlreadyLoaded { path: PathBuf },
    #[error("{} is not loaded", .path.display())]
    NotLoaded { path: PathBuf },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::MissingClass { path }
            | Self::UnknownClass { path, .. }
            | Self::UnknownField { path, .. }
            | Self::FieldType { path, .. }
            | Self::AlreadyLoaded { path }
            | Self::NotLoaded { path } => path,
        }
    }
}

/// A single attribute could not be captured or restored. These are recovered
/// by skipping the attribute; the rest of the snapshot proceeds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("attribute `{attr}` holds a live {type_name} handle and cannot be captured")]
    NotReconstructible {
        attr: String,
        type_name: &'static str,
    },
    #[error("attribute `{attr}` changed from {snapshot} to {current}; keeping the current value")]
    KindChanged {
        attr: String,
        snapshot: AttrKind,
        current: AttrKind,
    },
    #[error("no snapshot has been taken")]
    Missing,
}

/// Startup failures: the project cannot be opened at all.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project root {} is not a directory", .0.display())]
    InvalidRoot(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}
