use levelforge_common::NodeId;

/// What happened to the nodes named by an [`EditorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorEventKind {
    Added,
    Removed,
    Selected,
    Renamed,
    Reparented,
    Transformed,
}

impl EditorEventKind {
    /// Stable event name used by panels that subscribe by string.
    pub fn name(self) -> &'static str {
        match self {
            Self::Added => "object-added",
            Self::Removed => "object-removed",
            Self::Selected => "object-selected",
            Self::Renamed => "object-renamed",
            Self::Reparented => "object-reparented",
            Self::Transformed => "object-transformed",
        }
    }
}

/// A notification published after a command changes editor state.
///
/// For `Selected`, `nodes` is the full new selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorEvent {
    pub kind: EditorEventKind,
    pub nodes: Vec<NodeId>,
}

impl EditorEvent {
    pub fn new(kind: EditorEventKind, nodes: Vec<NodeId>) -> Self {
        Self { kind, nodes }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&EditorEvent)>;

/// Outbound notification channel. Subscribers are called synchronously, in
/// subscription order, on the thread that publishes.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
    published: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, f: impl FnMut(&EditorEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn publish(&mut self, event: &EditorEvent) {
        tracing::trace!(event = event.name(), nodes = event.nodes.len(), "publish");
        self.published += 1;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total events published since creation.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("published", &self.published)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_receive_events_in_order() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&log);
        let second = Rc::clone(&log);
        bus.subscribe(move |e| first.borrow_mut().push(("first", e.name())));
        bus.subscribe(move |e| second.borrow_mut().push(("second", e.name())));

        bus.publish(&EditorEvent::new(EditorEventKind::Added, vec![NodeId::new()]));

        assert_eq!(
            *log.borrow(),
            vec![("first", "object-added"), ("second", "object-added")]
        );
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| *c.borrow_mut() += 1);

        bus.publish(&EditorEvent::new(EditorEventKind::Removed, vec![]));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&EditorEvent::new(EditorEventKind::Removed, vec![]));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
