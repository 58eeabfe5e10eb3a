use std::sync::OnceLock;

use super::{Listener, SessionEvent};

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

/// Registry holding all registered event listeners.
///
/// Use [`register_event_listeners`] to configure listeners at process
/// startup.
pub struct EventRegistry {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventRegistry {
    fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener to receive events.
    ///
    /// Listeners are called in the order they are registered.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    fn dispatch(&self, event: &SessionEvent) {
        for listener in &self.listeners {
            listener.handle(event);
        }
    }
}

/// Register event listeners at process startup.
///
/// Call this once during initialization to configure which listeners should
/// handle session events. If not called, events are silently ignored.
///
/// # Example
///
/// ```rust,ignore
/// use airlock::register_event_listeners;
/// use airlock::events::listeners::LoggingListener;
///
/// fn main() {
///     register_event_listeners(|registry| {
///         registry
///             .listen(LoggingListener::new())
///             .listen(TransportReloader::new());
///     });
///
///     // start server...
/// }
/// ```
///
/// # Panics
///
/// Does not panic, but logs a warning if called more than once. Only the
/// first call takes effect.
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::new();
    f(&mut registry);
    if REGISTRY.set(registry).is_err() {
        log::warn!(
            target: "airlock",
            "register_event_listeners called more than once, ignoring"
        );
    }
}

/// Dispatch an event to all registered listeners.
///
/// If no listeners are registered, this is a no-op.
pub fn dispatch(event: SessionEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.dispatch(&event);
    }
}
