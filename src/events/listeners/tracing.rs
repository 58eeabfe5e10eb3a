use crate::events::{Listener, SessionEvent};

/// Emits session events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
///
/// # Example
///
/// ```rust,ignore
/// use airlock::register_event_listeners;
/// use airlock::events::listeners::TracingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(TracingListener);
/// });
/// ```
pub struct TracingListener;

impl Listener for TracingListener {
    fn handle(&self, event: &SessionEvent) {
        tracing::info!(
            target: "airlock::events",
            event_name = event.name(),
            ?event,
            "session event"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_tracing_listener_handle() {
        let listener = TracingListener;
        let event = SessionEvent::Expired {
            unique_id: "fNX9kGJK2a".to_owned(),
            username: "alice".to_owned(),
            at: Utc::now(),
        };

        // should not panic
        listener.handle(&event);
    }
}
