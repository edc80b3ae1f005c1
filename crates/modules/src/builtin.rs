//! Stock module classes available to every project.

use crate::class::{Behaviour, ModuleClass, ModuleContext, ModuleRegistry};
use glam::{Quat, Vec3};

/// Rotates its node about `axis` at `speed` degrees per second.
struct Spinner;

impl Behaviour for Spinner {
    fn on_update(&mut self, cx: &mut ModuleContext<'_>) {
        let speed = cx.attrs.float("speed").unwrap_or(0.0) as f32;
        let axis = cx.attrs.vec3("axis").unwrap_or(Vec3::Y).normalize_or_zero();
        if axis == Vec3::ZERO {
            return;
        }
        let step = Quat::from_axis_angle(axis, (speed * cx.time.delta).to_radians());
        cx.update_transform(|t| t.rotation = (step * t.rotation).normalize());
    }
}

/// Moves its node by `velocity` units per second and tracks the distance
/// covered in `travelled`.
struct Mover;

impl Behaviour for Mover {
    fn on_start(&mut self, cx: &mut ModuleContext<'_>) {
        cx.attrs.set("travelled", 0.0);
    }

    fn on_update(&mut self, cx: &mut ModuleContext<'_>) {
        let velocity = cx.attrs.vec3("velocity").unwrap_or(Vec3::ZERO);
        let step = velocity * cx.time.delta;
        if cx.update_transform(|t| t.position += step) {
            let travelled = cx.attrs.float("travelled").unwrap_or(0.0);
            cx.attrs.set("travelled", travelled + f64::from(step.length()));
        }
    }
}

/// Counts frames into `ticks` and records `first_frame`, an attribute that
/// only exists once play has started.
struct Counter;

impl Behaviour for Counter {
    fn on_start(&mut self, cx: &mut ModuleContext<'_>) {
        cx.attrs.set("first_frame", cx.time.frame as i64);
    }

    fn on_update(&mut self, cx: &mut ModuleContext<'_>) {
        let step = cx.attrs.int("step").unwrap_or(1);
        let ticks = cx.attrs.int("ticks").unwrap_or(0);
        cx.attrs.set("ticks", ticks + step);
    }
}

fn new_spinner() -> Box<dyn Behaviour> {
    Box::new(Spinner)
}

fn new_mover() -> Box<dyn Behaviour> {
    Box::new(Mover)
}

fn new_counter() -> Box<dyn Behaviour> {
    Box::new(Counter)
}

pub fn spinner() -> ModuleClass {
    ModuleClass::new("Spinner", new_spinner)
        .field("speed", 90.0)
        .field("axis", Vec3::Y)
}

pub fn mover() -> ModuleClass {
    ModuleClass::new("Mover", new_mover).field("velocity", Vec3::ZERO)
}

pub fn counter() -> ModuleClass {
    ModuleClass::new("Counter", new_counter)
        .field("ticks", 0i64)
        .field("step", 1i64)
}

pub fn register_builtins(registry: &mut ModuleRegistry) {
    registry.register(spinner());
    registry.register(mover());
    registry.register(counter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelforge_common::Transform;
    use levelforge_kernel::{FrameTime, Scene};

    fn frame(delta: f32) -> FrameTime {
        FrameTime {
            frame: 1,
            delta,
            elapsed: f64::from(delta),
        }
    }

    #[test]
    fn mover_advances_node_and_tracks_distance() {
        let mut scene = Scene::new();
        let node = scene.create_node("crate", None, Transform::default()).unwrap();
        let (mut behaviour, mut attrs) = mover().instantiate();
        attrs.set("velocity", Vec3::new(2.0, 0.0, 0.0));

        let mut cx = ModuleContext {
            attrs: &mut attrs,
            node: Some(node),
            scene: &mut scene,
            time: frame(0.5),
        };
        behaviour.on_start(&mut cx);
        behaviour.on_update(&mut cx);
        behaviour.on_update(&mut cx);

        assert_eq!(scene.transform(node).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(attrs.float("travelled"), Some(2.0));
    }

    #[test]
    fn spinner_rotates_about_axis() {
        let mut scene = Scene::new();
        let node = scene.create_node("fan", None, Transform::default()).unwrap();
        let (mut behaviour, mut attrs) = spinner().instantiate();

        let mut cx = ModuleContext {
            attrs: &mut attrs,
            node: Some(node),
            scene: &mut scene,
            time: frame(1.0),
        };
        behaviour.on_update(&mut cx);

        let rotation = scene.transform(node).unwrap().rotation;
        let expected = Quat::from_rotation_y(90f32.to_radians());
        assert!(rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn counter_adds_play_time_attribute() {
        let mut scene = Scene::new();
        let (mut behaviour, mut attrs) = counter().instantiate();
        attrs.set("step", 2i64);
        let mut cx = ModuleContext {
            attrs: &mut attrs,
            node: None,
            scene: &mut scene,
            time: frame(0.1),
        };
        behaviour.on_start(&mut cx);
        behaviour.on_update(&mut cx);
        assert_eq!(attrs.int("ticks"), Some(2));
        assert_eq!(attrs.int("first_frame"), Some(1));
    }

    #[test]
    fn builtins_register_by_name() {
        let mut registry = ModuleRegistry::new();
        register_builtins(&mut registry);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Counter", "Mover", "Spinner"]);
    }
}
