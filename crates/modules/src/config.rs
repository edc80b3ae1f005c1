//! Project configuration, read from an optional `levelforge.yaml` at the
//! project root.

use crate::discover::Discovery;
use crate::error::ProjectError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "levelforge.yaml";

/// Suffixes recognised as module files when the config names none.
pub const DEFAULT_SUFFIXES: &[&str] = &[".module.yaml", ".module.yml"];

/// Build-artifact directories never scanned for modules.
pub const ALWAYS_EXCLUDED: &[&str] = &["target", "build", ".git"];

/// A scene node declared by the project, built when play starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDecl {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub module_suffixes: Vec<String>,
    /// Extra directory names skipped during discovery.
    pub exclude_dirs: Vec<String>,
    /// Quiet period before a burst of file events is applied.
    pub debounce_ms: u64,
    pub nodes: Vec<NodeDecl>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            module_suffixes: DEFAULT_SUFFIXES.iter().map(|s| (*s).to_owned()).collect(),
            exclude_dirs: Vec::new(),
            debounce_ms: 250,
            nodes: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_yaml(path: &Path, source: &str) -> Result<Self, ProjectError> {
        // An empty file deserializes as unit, not a mapping.
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml::from_str(source).map_err(|e| ProjectError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if config.module_suffixes.is_empty() {
            config.module_suffixes = Self::default().module_suffixes;
        }
        Ok(config)
    }
}

/// An opened project directory.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
}

impl Project {
    /// Open `root`, reading its config file if one exists.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ProjectError::InvalidRoot(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|source| ProjectError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let config_path = root.join(CONFIG_FILE);
        let config = if config_path.is_file() {
            let source = std::fs::read_to_string(&config_path).map_err(|source| ProjectError::Io {
                path: config_path.clone(),
                source,
            })?;
            ProjectConfig::from_yaml(&config_path, &source)?
        } else {
            ProjectConfig::default()
        };

        tracing::info!(root = %root.display(), name = ?config.name, "opened project");
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn name(&self) -> String {
        self.config.name.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_owned())
        })
    }

    pub fn discovery(&self) -> Discovery {
        Discovery::from_config(&self.root, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::open(tmp.path()).unwrap();
        assert_eq!(project.config(), &ProjectConfig::default());
        assert_eq!(project.config().debounce(), Duration::from_millis(250));
        assert!(project.root().is_absolute());
    }

    #[test]
    fn reads_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "name: arena\nexclude_dirs: [scratch]\ndebounce_ms: 50\nnodes:\n  - name: Fan\n    position: [0, 2, 0]\n  - name: Blades\n    parent: Fan\n",
        )
        .unwrap();
        let project = Project::open(tmp.path()).unwrap();
        let config = project.config();
        assert_eq!(project.name(), "arena");
        assert_eq!(config.exclude_dirs, vec!["scratch".to_owned()]);
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.module_suffixes.len(), 2);
        assert_eq!(config.nodes[0].position, [0.0, 2.0, 0.0]);
        assert_eq!(config.nodes[1].parent.as_deref(), Some("Fan"));
    }

    #[test]
    fn empty_config_file_is_default() {
        let config = ProjectConfig::from_yaml(Path::new(CONFIG_FILE), "\n").unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn bad_config_is_rejected() {
        let err = ProjectConfig::from_yaml(Path::new(CONFIG_FILE), "debounce: fast\n").unwrap_err();
        assert!(matches!(err, ProjectError::Config { .. }));
    }

    #[test]
    fn root_must_be_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(Project::open(&file), Err(ProjectError::InvalidRoot(_))));
        assert!(matches!(
            Project::open(tmp.path().join("missing")),
            Err(ProjectError::InvalidRoot(_))
        ));
    }
}
