use crate::value::{AttrValue, Attributes};
use levelforge_common::{NodeId, Transform};
use levelforge_kernel::{FrameTime, Scene};
use std::collections::BTreeMap;
use std::rc::Rc;

/// What a behaviour sees during a callback: its own attributes, the node it is
/// attached to, the scene, and the frame timing.
pub struct ModuleContext<'a> {
    pub attrs: &'a mut Attributes,
    pub node: Option<NodeId>,
    pub scene: &'a mut Scene,
    pub time: FrameTime,
}

impl ModuleContext<'_> {
    /// Edit the attached node's transform in place. Returns false when the
    /// module is unattached or its node is gone.
    pub fn update_transform(&mut self, f: impl FnOnce(&mut Transform)) -> bool {
        let Some(node) = self.node else {
            return false;
        };
        let Some(mut transform) = self.scene.transform(node) else {
            return false;
        };
        f(&mut transform);
        self.scene.set_transform(node, transform).is_ok()
    }
}

/// Code half of a module. Data lives in the instance's [`Attributes`], so the
/// behaviour itself stays stateless and can be swapped on reload.
pub trait Behaviour {
    fn on_start(&mut self, _cx: &mut ModuleContext<'_>) {}

    fn on_update(&mut self, _cx: &mut ModuleContext<'_>) {}
}

pub type Factory = fn() -> Box<dyn Behaviour>;

/// A field declared by a module class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub default: AttrValue,
    /// Transient fields are infrastructure (engine handles, caches) and are
    /// never captured or restored.
    pub serializable: bool,
}

/// A registered module type: its declared fields and how to build its
/// behaviour.
#[derive(Debug, Clone)]
pub struct ModuleClass {
    name: String,
    version: u32,
    fields: Vec<FieldDecl>,
    factory: Factory,
}

impl ModuleClass {
    pub fn new(name: impl Into<String>, factory: Factory) -> Self {
        Self {
            name: name.into(),
            version: 1,
            fields: Vec::new(),
            factory,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Declare a serializable field with its default value.
    pub fn field(mut self, name: impl Into<String>, default: impl Into<AttrValue>) -> Self {
        self.push_field(name.into(), default.into(), true);
        self
    }

    /// Declare a transient (non-serializable) field.
    pub fn transient(mut self, name: impl Into<String>, default: impl Into<AttrValue>) -> Self {
        self.push_field(name.into(), default.into(), false);
        self
    }

    fn push_field(&mut self, name: String, default: AttrValue, serializable: bool) {
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldDecl {
            name,
            default,
            serializable,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn declared(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_transient(&self, name: &str) -> bool {
        self.declared(name).is_some_and(|f| !f.serializable)
    }

    /// Build a fresh behaviour plus attributes holding every declared default.
    pub fn instantiate(&self) -> (Box<dyn Behaviour>, Attributes) {
        let mut attrs = Attributes::new();
        for field in &self.fields {
            attrs.set(field.name.clone(), field.default.clone());
        }
        ((self.factory)(), attrs)
    }
}

/// Maps stable class names to module classes. Populated at startup; module
/// files refer to classes by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    classes: BTreeMap<String, Rc<ModuleClass>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing (and returning) any class of the same name.
    pub fn register(&mut self, class: ModuleClass) -> Option<Rc<ModuleClass>> {
        tracing::debug!(class = class.name(), version = class.version(), "registered module class");
        self.classes.insert(class.name.clone(), Rc::new(class))
    }

    pub fn get(&self, name: &str) -> Option<Rc<ModuleClass>> {
        self.classes.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrKind;
    use glam::Vec3;

    struct Idle;
    impl Behaviour for Idle {}

    fn idle() -> Box<dyn Behaviour> {
        Box::new(Idle)
    }

    #[test]
    fn instantiate_fills_declared_defaults() {
        let class = ModuleClass::new("Door", idle)
            .field("open", false)
            .field("speed", 1.5)
            .transient("cache", 0i64);
        let (_, attrs) = class.instantiate();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.bool("open"), Some(false));
        assert!(class.is_transient("cache"));
        assert!(!class.is_transient("speed"));
        assert!(!class.is_transient("undeclared"));
    }

    #[test]
    fn redeclaring_a_field_replaces_it() {
        let class = ModuleClass::new("Door", idle)
            .field("speed", 1.5)
            .transient("speed", 2i64);
        assert_eq!(class.fields().len(), 1);
        assert_eq!(class.declared("speed").unwrap().default.kind(), AttrKind::Int);
    }

    #[test]
    fn registry_replaces_by_name() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register(ModuleClass::new("Door", idle)).is_none());
        let old = registry
            .register(ModuleClass::new("Door", idle).with_version(2))
            .unwrap();
        assert_eq!(old.version(), 1);
        assert_eq!(registry.get("Door").unwrap().version(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Window").is_none());
    }

    #[test]
    fn update_transform_requires_live_node() {
        let mut scene = Scene::new();
        let node = scene.create_node("n", None, Transform::default()).unwrap();
        let mut attrs = Attributes::new();
        let mut cx = ModuleContext {
            attrs: &mut attrs,
            node: Some(node),
            scene: &mut scene,
            time: FrameTime::default(),
        };
        assert!(cx.update_transform(|t| t.position = Vec3::X));
        cx.node = None;
        assert!(!cx.update_transform(|t| t.position = Vec3::Y));
        assert_eq!(scene.transform(node).unwrap().position, Vec3::X);
    }
}
