use super::SessionEvent;

/// Trait for handling session events.
///
/// Listeners run synchronously on the thread performing the store operation,
/// after the store has released its internal lock, so calling back into the
/// store from a listener is safe. Long-running work belongs on a channel or
/// task of the listener's own.
///
/// # Example
///
/// ```rust,ignore
/// use airlock::events::{Listener, SessionEvent};
///
/// struct AuditTrail;
///
/// impl Listener for AuditTrail {
///     fn handle(&self, event: &SessionEvent) {
///         if let SessionEvent::BulkRevoked { username, count, .. } = event {
///             // append to the audit log
///         }
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    /// Handle a session event.
    ///
    /// This method is called for every event dispatched. Filter by matching
    /// on the event variant to handle specific events.
    fn handle(&self, event: &SessionEvent);
}
