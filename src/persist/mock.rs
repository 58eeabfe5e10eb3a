use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::adapter::PersistenceAdapter;
use super::StoreDocument;
use crate::SessionError;

/// In-memory persistence adapter for tests.
///
/// Exposes its state so assertions can inspect what was saved and how often.
#[derive(Clone, Default)]
pub struct MockAdapter {
    pub document: Arc<Mutex<Option<StoreDocument>>>,
    saves: Arc<Mutex<usize>>,
    failing: Arc<Mutex<bool>>,
}

impl MockAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn fail_saves(&self, failing: bool) {
        *self.failing.lock() = failing;
    }
}

#[async_trait]
impl PersistenceAdapter for MockAdapter {
    async fn load(&self) -> Result<Option<StoreDocument>, SessionError> {
        Ok(self.document.lock().clone())
    }

    async fn save(&self, document: &StoreDocument) -> Result<(), SessionError> {
        if *self.failing.lock() {
            return Err(SessionError::Persistence(
                "mock adapter failing on purpose".to_owned(),
            ));
        }
        *self.document.lock() = Some(document.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
