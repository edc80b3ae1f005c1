//! Module files: small YAML manifests that name a registered class and
//! override its field defaults.
//!
//! ```yaml
//! class: Spinner
//! name: fan          # optional, defaults to the file stem
//! sort: 2            # update order, ascending
//! node: Fan Blades   # optional scene node to attach to
//! fields:
//!   speed: 180
//!   axis: [0, 0, 1]
//! ```

use crate::class::{ModuleClass, ModuleRegistry};
use crate::error::LoadError;
use crate::value::AttrValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    class: Option<String>,
    name: Option<String>,
    #[serde(default)]
    sort: i32,
    node: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, serde_yaml::Value>,
}

/// A validated module file, ready to instantiate.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub class: Rc<ModuleClass>,
    pub name: String,
    pub sort: i32,
    pub node: Option<String>,
    /// Field overrides, already converted to the declared kinds.
    pub fields: BTreeMap<String, AttrValue>,
}

impl Manifest {
    /// Read and validate a module file against the registry.
    pub fn read(path: &Path, registry: &ModuleRegistry) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &source, registry)
    }

    pub fn parse(path: &Path, source: &str, registry: &ModuleRegistry) -> Result<Self, LoadError> {
        let raw: RawManifest = serde_yaml::from_str(source).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let class_name = raw
            .class
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LoadError::MissingClass {
                path: path.to_path_buf(),
            })?;
        let class = registry
            .get(&class_name)
            .ok_or_else(|| LoadError::UnknownClass {
                path: path.to_path_buf(),
                class: class_name.clone(),
            })?;

        let mut fields = BTreeMap::new();
        for (field, literal) in &raw.fields {
            let decl = class.declared(field).ok_or_else(|| LoadError::UnknownField {
                path: path.to_path_buf(),
                class: class_name.clone(),
                field: field.clone(),
            })?;
            let expected = decl.default.kind();
            let value = AttrValue::from_yaml(literal, expected).ok_or_else(|| {
                LoadError::FieldType {
                    path: path.to_path_buf(),
                    field: field.clone(),
                    expected,
                }
            })?;
            fields.insert(field.clone(), value);
        }

        let name = raw.name.unwrap_or_else(|| default_name(path));
        Ok(Self {
            class,
            name,
            sort: raw.sort,
            node: raw.node,
            fields,
        })
    }
}

/// File name with the module suffix stripped: `enemies/grunt.module.yaml`
/// becomes `grunt`.
fn default_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => file,
    }
}
