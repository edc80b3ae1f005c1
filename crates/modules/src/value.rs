use glam::Vec3;
use levelforge_common::NodeId;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// The kind of an attribute value, used to check that a snapshot still fits
/// the instance it is restored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Bool,
    Int,
    Float,
    Text,
    Vec3,
    Node,
    List,
    Opaque,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Vec3 => "vec3",
            Self::Node => "node",
            Self::List => "list",
            Self::Opaque => "opaque handle",
        };
        f.write_str(name)
    }
}

/// A live handle (engine object, GPU resource, open file) stored on a module.
///
/// Opaque values can be read back by the module that stored them but cannot be
/// captured in a snapshot.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    handle: Rc<dyn Any>,
}

impl Opaque {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            handle: Rc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

/// A module attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vec3(Vec3),
    Node(NodeId),
    List(Vec<AttrValue>),
    Opaque(Opaque),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Bool(_) => AttrKind::Bool,
            Self::Int(_) => AttrKind::Int,
            Self::Float(_) => AttrKind::Float,
            Self::Text(_) => AttrKind::Text,
            Self::Vec3(_) => AttrKind::Vec3,
            Self::Node(_) => AttrKind::Node,
            Self::List(_) => AttrKind::List,
            Self::Opaque(_) => AttrKind::Opaque,
        }
    }

    /// Whether the value can be captured and rebuilt later. Lists are
    /// reconstructible only if every element is.
    pub fn is_reconstructible(&self) -> bool {
        match self {
            Self::Opaque(_) => false,
            Self::List(items) => items.iter().all(Self::is_reconstructible),
            _ => true,
        }
    }

    /// Convert a manifest literal into a value of the expected kind.
    /// Integers are accepted where floats are expected.
    pub fn from_yaml(value: &serde_yaml::Value, kind: AttrKind) -> Option<Self> {
        match kind {
            AttrKind::Bool => value.as_bool().map(Self::Bool),
            AttrKind::Int => value.as_i64().map(Self::Int),
            AttrKind::Float => value.as_f64().map(Self::Float),
            AttrKind::Text => value.as_str().map(|s| Self::Text(s.to_owned())),
            AttrKind::Vec3 => {
                let seq = value.as_sequence()?;
                if seq.len() != 3 {
                    return None;
                }
                let mut xyz = [0.0f32; 3];
                for (slot, item) in xyz.iter_mut().zip(seq) {
                    *slot = item.as_f64()? as f32;
                }
                Some(Self::Vec3(Vec3::from_array(xyz)))
            }
            AttrKind::List => value
                .as_sequence()?
                .iter()
                .map(Self::infer_yaml)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            AttrKind::Node | AttrKind::Opaque => None,
        }
    }

    /// Convert a manifest literal without a declared kind (list elements).
    fn infer_yaml(value: &serde_yaml::Value) -> Option<Self> {
        use serde_yaml::Value;
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(Self::infer_yaml)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec3> for AttrValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Opaque> for AttrValue {
    fn from(v: Opaque) -> Self {
        Self::Opaque(v)
    }
}

impl From<NodeId> for AttrValue {
    fn from(v: NodeId) -> Self {
        Self::Node(v)
    }
}

/// The live attribute set of a module instance.
///
/// Declared fields are populated at instantiation; behaviours may add and
/// remove further attributes while running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set an attribute, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(AttrValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(AttrValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(AttrValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(AttrValue::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.values.get(name) {
            Some(AttrValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }
}
