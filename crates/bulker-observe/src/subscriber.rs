use std::sync::Mutex;

use crate::event::Event;

/// Receives every run event as it happens.
pub trait Subscribe: Send + Sync {
    fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str;
}

/// Default subscriber: writes events through `tracing`.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn on_event(&self, event: &Event) {
        event.log();
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}

/// Keeps a copy of every event; used by tests to assert on run behaviour.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, kind: crate::EventKind) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl Subscribe for Recorder {
    fn on_event(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
