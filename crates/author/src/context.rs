use crate::events::{EditorEvent, EditorEventKind, EventBus};
use crate::selection::Selection;
use levelforge_kernel::Scene;

/// Everything a command may touch, passed explicitly instead of living in a
/// global editor object.
#[derive(Debug, Default)]
pub struct EditorContext {
    pub scene: Scene,
    pub selection: Selection,
    pub bus: EventBus,
}

impl EditorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    /// Publish an event. Empty node lists are dropped, except for selection
    /// changes where an empty list means "nothing selected".
    pub(crate) fn notify(&mut self, event: EditorEvent) {
        if !event.nodes.is_empty() || event.kind == EditorEventKind::Selected {
            self.bus.publish(&event);
        }
    }
}
