use crate::events::{Listener, SessionEvent};

/// Logs all session events using the `log` crate.
///
/// Events carry unique ids and usernames but never tokens, so the output is
/// safe for ordinary log sinks.
///
/// # Example
///
/// ```rust,ignore
/// use airlock::register_event_listeners;
/// use airlock::events::listeners::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::new());
/// });
/// ```
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Creates a new logging listener at INFO level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    /// Creates a new logging listener at the specified level.
    #[must_use]
    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for LoggingListener {
    fn handle(&self, event: &SessionEvent) {
        log::log!(
            target: "airlock::events",
            self.level,
            "event={} {:?}",
            event.name(),
            event
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_logging_listener_new() {
        let listener = LoggingListener::new();
        assert_eq!(listener.level, log::Level::Info);
    }

    #[test]
    fn test_logging_listener_with_level() {
        let listener = LoggingListener::with_level(log::Level::Debug);
        assert_eq!(listener.level, log::Level::Debug);
    }

    #[test]
    fn test_logging_listener_handle() {
        let listener = LoggingListener::new();
        let event = SessionEvent::Created {
            unique_id: "fNX9kGJK2a".to_owned(),
            username: "alice".to_owned(),
            at: Utc::now(),
        };

        // should not panic
        listener.handle(&event);
    }
}
