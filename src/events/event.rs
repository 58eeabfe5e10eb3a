use chrono::{DateTime, Utc};

/// Session lifecycle events emitted by the store.
///
/// Events are always fired from the store's mutating operations. If no
/// listeners are registered, they are silently ignored. Register listeners
/// via [`register_event_listeners`](crate::register_event_listeners).
///
/// Tokens never appear in events; sessions are identified by their unique
/// id, which is safe to log.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was created after successful primary authentication.
    Created {
        unique_id: String,
        username: String,
        at: DateTime<Utc>,
    },
    /// A session was removed explicitly (logout or administrative delete).
    Removed {
        unique_id: String,
        username: String,
        at: DateTime<Utc>,
    },
    /// A session was removed by the idle-timeout sweep.
    Expired {
        unique_id: String,
        username: String,
        at: DateTime<Utc>,
    },
    /// All of a user's sessions (or all but one) were revoked, typically on
    /// a password change or account deletion.
    BulkRevoked {
        username: String,
        count: usize,
        at: DateTime<Utc>,
    },
    /// The mutual-TLS acceptance flag toggled; listening sockets must be
    /// recreated with the new policy.
    TransportReloadRequested { at: DateTime<Utc> },
}

impl SessionEvent {
    /// Returns a dot-separated event name for logging/tracing.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "session.created",
            Self::Removed { .. } => "session.removed",
            Self::Expired { .. } => "session.expired",
            Self::BulkRevoked { .. } => "session.bulk_revoked",
            Self::TransportReloadRequested { .. } => "transport.reload_requested",
        }
    }

    /// Returns the timestamp when this event occurred.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Created { at, .. }
            | Self::Removed { at, .. }
            | Self::Expired { at, .. }
            | Self::BulkRevoked { at, .. }
            | Self::TransportReloadRequested { at } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let now = Utc::now();

        assert_eq!(
            SessionEvent::Created {
                unique_id: "fNX9kGJK2a".to_owned(),
                username: "alice".to_owned(),
                at: now,
            }
            .name(),
            "session.created"
        );

        assert_eq!(
            SessionEvent::Expired {
                unique_id: "fNX9kGJK2a".to_owned(),
                username: "alice".to_owned(),
                at: now,
            }
            .name(),
            "session.expired"
        );

        assert_eq!(
            SessionEvent::BulkRevoked {
                username: "alice".to_owned(),
                count: 3,
                at: now,
            }
            .name(),
            "session.bulk_revoked"
        );

        assert_eq!(
            SessionEvent::TransportReloadRequested { at: now }.name(),
            "transport.reload_requested"
        );
    }

    #[test]
    fn test_event_timestamp() {
        let now = Utc::now();
        let event = SessionEvent::Removed {
            unique_id: "fNX9kGJK2a".to_owned(),
            username: "alice".to_owned(),
            at: now,
        };
        assert_eq!(event.timestamp(), now);
    }
}
