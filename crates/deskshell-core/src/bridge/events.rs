//! Notifications pushed from the host to the front-end without a request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

pub const WINDOW_MAXIMIZED_EVENT: &str = "window:maximized";
pub const WINDOW_FOCUS_EVENT: &str = "window:focus";
pub const SHOW_ABOUT_EVENT: &str = "show-about";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
    WindowMaximized(bool),
    WindowFocus(bool),
    ShowAbout,
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::WindowMaximized(_) => WINDOW_MAXIMIZED_EVENT,
            PushEvent::WindowFocus(_) => WINDOW_FOCUS_EVENT,
            PushEvent::ShowAbout => SHOW_ABOUT_EVENT,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            PushEvent::WindowMaximized(state) | PushEvent::WindowFocus(state) => {
                Value::Bool(*state)
            }
            PushEvent::ShowAbout => Value::Null,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &str, _payload: Value) {}
}

pub fn push_event(sink: &dyn EventSink, event: PushEvent) {
    sink.emit(event.name(), event.payload());
}

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Front-end side listener registry keyed by event name.
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn on_window_maximized<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on(WINDOW_MAXIMIZED_EVENT, move |payload| {
            if let Some(maximized) = payload.as_bool() {
                callback(maximized);
            }
        });
    }

    pub fn on_window_focus<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on(WINDOW_FOCUS_EVENT, move |payload| {
            if let Some(focused) = payload.as_bool() {
                callback(focused);
            }
        });
    }

    pub fn on_show_about<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(SHOW_ABOUT_EVENT, move |_| callback());
    }

    pub fn remove_all_listeners(&self, event: &str) {
        self.lock().remove(event);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for EventHub {
    fn emit(&self, event: &str, payload: Value) {
        // Listeners run outside the lock so they may register or remove others.
        let listeners = self.lock().get(event).cloned().unwrap_or_default();
        for listener in listeners {
            listener(&payload);
        }
    }
}

/// Turns raw window resize notifications into maximize state changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximizeTracker {
    last: Option<bool>,
}

impl MaximizeTracker {
    pub fn new(initially_maximized: bool) -> Self {
        Self {
            last: Some(initially_maximized),
        }
    }

    pub fn observe(&mut self, maximized: bool) -> Option<PushEvent> {
        if self.last == Some(maximized) {
            return None;
        }
        self.last = Some(maximized);
        Some(PushEvent::WindowMaximized(maximized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hub_delivers_typed_payloads() {
        let hub = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let maximized = Arc::clone(&seen);
        hub.on_window_maximized(move |state| maximized.lock().unwrap().push(("max", state)));
        let focus = Arc::clone(&seen);
        hub.on_window_focus(move |state| focus.lock().unwrap().push(("focus", state)));

        push_event(&hub, PushEvent::WindowMaximized(true));
        push_event(&hub, PushEvent::WindowFocus(false));
        hub.emit(WINDOW_FOCUS_EVENT, Value::String("garbage".into()));

        assert_eq!(*seen.lock().unwrap(), [("max", true), ("focus", false)]);
    }

    #[test]
    fn remove_all_listeners_only_touches_one_event() {
        let hub = EventHub::new();
        let about = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&about);
        hub.on_show_about(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hub.on_window_focus(|_| {});

        push_event(&hub, PushEvent::ShowAbout);
        hub.remove_all_listeners(SHOW_ABOUT_EVENT);
        push_event(&hub, PushEvent::ShowAbout);

        assert_eq!(about.load(Ordering::SeqCst), 1);
        assert_eq!(hub.listener_count(SHOW_ABOUT_EVENT), 0);
        assert_eq!(hub.listener_count(WINDOW_FOCUS_EVENT), 1);
    }

    #[test]
    fn tracker_reports_only_edges() {
        let mut tracker = MaximizeTracker::new(false);
        assert_eq!(tracker.observe(false), None);
        assert_eq!(tracker.observe(true), Some(PushEvent::WindowMaximized(true)));
        assert_eq!(tracker.observe(true), None);
        assert_eq!(tracker.observe(false), Some(PushEvent::WindowMaximized(false)));

        let mut fresh = MaximizeTracker::default();
        assert_eq!(fresh.observe(false), Some(PushEvent::WindowMaximized(false)));
    }
}
