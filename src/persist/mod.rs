//! Durable persistence for the session store.
//!
//! The store never performs I/O. It raises a dirty flag
//! ([`SessionStore::needs_persist`](crate::SessionStore::needs_persist))
//! whenever its durable subset changes, and an external writer (on a timer,
//! on shutdown, or wherever the embedding process prefers) calls [`flush`]
//! to write it out through a [`PersistenceAdapter`]. On startup, [`restore`]
//! loads whatever the previous process left behind.
//!
//! Only [`Persistence::Timeout`](crate::Persistence::Timeout) sessions ever
//! reach the durable form.

mod adapter;
mod file_store;
#[cfg(any(test, feature = "mocks"))]
mod mock;

pub use adapter::PersistenceAdapter;
pub use file_store::FileAdapter;
#[cfg(any(test, feature = "mocks"))]
pub use mock::MockAdapter;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SessionError, SessionStore};

/// Revision written by [`SessionStore::export`](crate::SessionStore::export).
pub const CURRENT_REVISION: u32 = 1;

/// The durable form of the store.
///
/// The outer shape is typed; the session records stay generic values because
/// their reader is deliberately tolerant: a malformed record is discarded
/// individually instead of poisoning the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Format revision, for forward-compatible readers.
    #[serde(default)]
    pub revision: u32,
    /// Idle timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Accepted authentication mechanisms, in their persisted form.
    #[serde(default, rename = "auth_config", skip_serializing_if = "Option::is_none")]
    pub auth_methods: Option<Value>,
    /// Persisted session records.
    #[serde(default)]
    pub sessions: Vec<Value>,
}

/// Writes the store's durable subset out if anything changed.
///
/// Returns `true` if a save happened, `false` if the store was clean. The
/// dirty flag is cleared only after the save succeeds; one writer at a time
/// is assumed, matching the single-execution-context model the store is
/// built for.
///
/// # Errors
///
/// Propagates the adapter's failure; the dirty flag stays raised so the next
/// flush retries.
pub async fn flush(
    store: &SessionStore,
    adapter: &dyn PersistenceAdapter,
) -> Result<bool, SessionError> {
    if !store.needs_persist() {
        return Ok(false);
    }
    let document = store.export();
    adapter.save(&document).await?;
    store.mark_persisted();
    Ok(true)
}

/// Loads the previous process's durable state into the store.
///
/// Returns the number of sessions restored; zero when the adapter has
/// nothing saved (first boot). Restored sessions start a fresh idle window.
///
/// # Errors
///
/// Propagates the adapter's failure to read storage. A present-but-garbled
/// document is the adapter's concern and is typically treated as absent.
pub async fn restore(
    store: &SessionStore,
    adapter: &dyn PersistenceAdapter,
) -> Result<usize, SessionError> {
    match adapter.load().await? {
        Some(document) => Ok(store.import(&document)),
        None => Ok(0),
    }
}
