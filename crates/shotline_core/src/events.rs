use crate::editing::TrimOutcome;
use crate::types::TimeUs;
use std::fmt;
use uuid::Uuid;

/// Notifications the editor sends to its host after each change.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ClipAdded { clip_id: Uuid },
    ClipRemoved { clip_id: Uuid },
    ClipTrimmed { clip_id: Uuid, outcome: TrimOutcome },
    TrackReordered { track_id: Uuid },
    OverlapFixed { clip_id: Uuid, new_start_us: TimeUs },
    Undone { description: String },
    Redone { description: String },
    VersionSaved { version: u32 },
    VersionRestored { version: u32 },
    TransitionsChanged,
    /// Sent after every re-analysis, even when the result did not change.
    ConflictsUpdated { total: usize, errors: usize },
}

pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&EngineEvent)>;

/// Subscribers owned by one editor instance.
#[derive(Default)]
pub struct EventBus {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if no listener had that id.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &EngineEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_every_subscriber() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        bus.subscribe(move |e| first.borrow_mut().push(("first", e.clone())));
        let second = Rc::clone(&seen);
        bus.subscribe(move |e| second.borrow_mut().push(("second", e.clone())));

        bus.emit(&EngineEvent::TransitionsChanged);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[0].0, "first");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = bus.subscribe(move |_| *counter.borrow_mut() += 1);

        bus.emit(&EngineEvent::VersionSaved { version: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&EngineEvent::VersionSaved { version: 2 });

        assert_eq!(*count.borrow(), 1);
        assert!(bus.is_empty());
    }
}
