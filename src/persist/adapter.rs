//! Persistence adapter trait.

use async_trait::async_trait;

use super::StoreDocument;
use crate::SessionError;

/// Storage backend for the store's durable subset.
///
/// Implementations provide different storage locations:
/// - [`FileAdapter`](super::FileAdapter): a JSON file on local storage
/// - [`MockAdapter`](super::MockAdapter): in-memory, for tests (`mocks` feature)
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Loads the saved document, or `None` when nothing has ever been saved.
    async fn load(&self) -> Result<Option<StoreDocument>, SessionError>;

    /// Saves the document, replacing whatever was saved before.
    async fn save(&self, document: &StoreDocument) -> Result<(), SessionError>;
}
