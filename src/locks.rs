//! Cooperative resource locks bound to sessions.
//!
//! Some deployments let a session take cooperative locks on hardware
//! resources, keyed by the session's unique id. Those locks must not outlive
//! the session: the store releases them in the same critical section as
//! every removal path (logout, idle expiry, bulk revocation).
//!
//! Enabled with the `resource-locks` feature. Register an implementation via
//! [`SessionStore::set_lock_registry`](crate::SessionStore::set_lock_registry).

#[cfg(any(test, feature = "mocks"))]
use std::sync::Arc;

#[cfg(any(test, feature = "mocks"))]
use parking_lot::Mutex;

/// A registry of cooperative locks keyed by session unique id.
pub trait LockRegistry: Send + Sync {
    /// Releases every lock owned by the session with this unique id.
    ///
    /// Called with the store's internal lock held; implementations must not
    /// call back into the store.
    fn release_all(&self, unique_id: &str);
}

/// Records released unique ids, for tests.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Default)]
pub struct MockLockRegistry {
    pub released: Arc<Mutex<Vec<String>>>,
}

#[cfg(any(test, feature = "mocks"))]
impl MockLockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `release_all` was called for this unique id.
    #[must_use]
    pub fn was_released(&self, unique_id: &str) -> bool {
        self.released.lock().iter().any(|id| id == unique_id)
    }
}

#[cfg(any(test, feature = "mocks"))]
impl LockRegistry for MockLockRegistry {
    fn release_all(&self, unique_id: &str) {
        self.released.lock().push(unique_id.to_owned());
    }
}
