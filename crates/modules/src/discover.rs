use crate::config::{ALWAYS_EXCLUDED, DEFAULT_SUFFIXES, ProjectConfig};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Finds module files under a project root.
///
/// The walk is lazy and sorted by file name within each directory, so two
/// walks over an unchanged tree yield the same sequence. Build-artifact
/// directories are never entered.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    suffixes: Vec<String>,
    excluded: Vec<String>,
}

impl Discovery {
    /// Discovery with the default suffixes and exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| (*s).to_owned()).collect(),
            excluded: ALWAYS_EXCLUDED.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        let mut discovery = Self::new(root);
        discovery.suffixes = config.module_suffixes.clone();
        discovery.excluded.extend(config.exclude_dirs.iter().cloned());
        discovery
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` names a module file by suffix.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.suffixes
            .iter()
            .any(|s| name.len() > s.len() && name.ends_with(s.as_str()))
    }

    /// Whether `path` lies inside an excluded directory below the root.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .any(|c| self.excluded.iter().any(|e| c.as_os_str() == e.as_str()))
    }

    /// Walk the whole project. Each call starts a fresh walk.
    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.scan(&self.root)
    }

    /// Walk one directory below the root, e.g. a newly created folder.
    pub fn scan<'a>(&'a self, dir: &Path) -> impl Iterator<Item = PathBuf> + use<'a> {
        WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !self.skip_dir(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(%err, "skipping unreadable entry during discovery");
                    None
                }
            })
            .filter(move |e| e.file_type().is_file() && self.matches(e.path()))
            .map(DirEntry::into_path)
    }

    fn skip_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| self.excluded.iter().any(|e| e == n))
    }
}
