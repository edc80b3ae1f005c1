use crate::class::ModuleClass;
use crate::error::SnapshotError;
use crate::value::{AttrValue, Attributes};
use std::collections::{BTreeMap, BTreeSet};

/// Captured attribute state of one module instance.
///
/// `values` holds every serializable, reconstructible attribute. `names` holds
/// every attribute name present at capture time, transient ones included, so
/// a later restore can tell which attributes appeared afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSnapshot {
    values: BTreeMap<String, AttrValue>,
    names: BTreeSet<String>,
}

/// Outcome of restoring a snapshot into an instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub restored: usize,
    /// Attributes deleted because they did not exist at capture time.
    pub removed: Vec<String>,
    pub skipped: Vec<SnapshotError>,
}

impl AttributeSnapshot {
    /// Capture `attrs`, leaving out the class's transient fields. Attributes
    /// that cannot be reconstructed are skipped and reported.
    pub fn capture(class: &ModuleClass, attrs: &Attributes) -> (Self, Vec<SnapshotError>) {
        let mut snapshot = Self::default();
        let mut skipped = Vec::new();
        for (name, value) in attrs.iter() {
            snapshot.names.insert(name.to_owned());
            if class.is_transient(name) {
                continue;
            }
            if !value.is_reconstructible() {
                let type_name = match value {
                    AttrValue::Opaque(handle) => handle.type_name(),
                    _ => "nested",
                };
                let err = SnapshotError::NotReconstructible {
                    attr: name.to_owned(),
                    type_name,
                };
                tracing::warn!(class = class.name(), %err, "skipping attribute");
                skipped.push(err);
                continue;
            }
            snapshot.values.insert(name.to_owned(), value.clone());
        }
        (snapshot, skipped)
    }

    /// Write captured values back into `attrs`.
    ///
    /// Only attributes the instance still has are overwritten. A declared
    /// field whose class now declares a different type is skipped with a
    /// warning; undeclared attributes are always overwritten. With
    /// `remove_differences`, attributes absent at capture time are deleted.
    pub fn restore(
        &self,
        class: &ModuleClass,
        attrs: &mut Attributes,
        remove_differences: bool,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        for (name, value) in &self.values {
            if !attrs.contains(name) {
                continue;
            }
            if let Some(field) = class.declared(name) {
                let expected = field.default.kind();
                if value.kind() != expected {
                    let err = SnapshotError::KindChanged {
                        attr: name.clone(),
                        snapshot: value.kind(),
                        current: expected,
                    };
                    tracing::warn!(class = class.name(), %err, "skipping attribute");
                    report.skipped.push(err);
                    continue;
                }
            }
            attrs.set(name.clone(), value.clone());
            report.restored += 1;
        }

        if remove_differences {
            let added: Vec<String> = attrs
                .names()
                .filter(|n| !self.names.contains(*n))
                .map(str::to_owned)
                .collect();
            for name in &added {
                attrs.remove(name);
            }
            report.removed = added;
        }
        report
    }

    /// Copy of this snapshot without the values for `names`. The names stay
    /// recorded as present.
    pub fn without(&self, names: &BTreeSet<String>) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(k, _)| !names.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            names: self.names.clone(),
        }
    }

    /// Replace one captured value, recording the name as present.
    pub(crate) fn set(&mut self, name: &str, value: AttrValue) {
        self.names.insert(name.to_owned());
        self.values.insert(name.to_owned(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names present on the instance when the snapshot was captured.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }
}
