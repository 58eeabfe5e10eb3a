//! Session management core for an embedded management-controller web service.
//!
//! `airlock` owns the collection of live authenticated sessions: it generates
//! their tokens from the OS entropy source, authenticates presented bearer
//! tokens in constant time, expires idle sessions with a lazy coalesced sweep,
//! revokes sessions in bulk on credential changes, and exposes a dirty-flag
//! contract an external writer uses to persist the durable subset across
//! restarts. The HTTP layer, resource rendering, and transport are external
//! collaborators; this crate is the trust boundary they lean on.
//!
//! # Quick start
//!
//! ```rust
//! use airlock::{Persistence, SessionStore};
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! let store = SessionStore::new();
//! let session = store
//!     .create_session(
//!         "admin",
//!         IpAddr::V4(Ipv4Addr::LOCALHOST),
//!         None,
//!         Persistence::Timeout,
//!         false,
//!     )
//!     .unwrap();
//!
//! let found = store.authenticate_by_token(session.session_token().expose_secret());
//! assert!(found.is_some());
//! ```

pub mod config;
pub mod crypto;
pub mod events;
#[cfg(feature = "resource-locks")]
pub mod locks;
pub mod persist;
pub mod session;

pub use config::StoreConfig;
pub use crypto::{SecretString, SESSION_TOKEN_LENGTH, UNIQUE_ID_LENGTH};
pub use events::register_event_listeners;
#[cfg(feature = "resource-locks")]
pub use locks::LockRegistry;
pub use persist::{PersistenceAdapter, StoreDocument};
pub use session::{AuthMethods, Persistence, Session, SessionStore, UserInfo};

use std::fmt;

/// Errors surfaced by the session core.
///
/// A lookup miss is not an error; operations that can come back empty return
/// `Option`. Malformed persisted records are recovered locally by discarding
/// the record, never by failing the whole restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The secure random source failed. Fatal to the operation that asked
    /// for a token; never retried against a degraded entropy source.
    EntropyExhausted,
    /// A freshly generated token or unique id collided with a live session.
    /// Insertion is aborted rather than overwriting another principal's
    /// session.
    DuplicateToken,
    /// The durable persistence adapter failed to load or save.
    Persistence(String),
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EntropyExhausted => write!(f, "Secure random source failed"),
            SessionError::DuplicateToken => {
                write!(f, "Generated token collides with a live session")
            }
            SessionError::Persistence(msg) => write!(f, "Persistence error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SessionError::EntropyExhausted.to_string(),
            "Secure random source failed"
        );
        assert_eq!(
            SessionError::Persistence("disk full".to_owned()).to_string(),
            "Persistence error: disk full"
        );
    }
}
