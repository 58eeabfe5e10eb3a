//! File-based persistence.
//!
//! Stores the durable document as a single JSON file.

use std::path::PathBuf;

use async_trait::async_trait;

use super::adapter::PersistenceAdapter;
use super::StoreDocument;
use crate::SessionError;

/// File-based persistence adapter.
///
/// The document is written as pretty-printed JSON. It contains live bearer
/// tokens, so on Unix the file is restricted to owner read/write.
///
/// # Example
///
/// ```rust,ignore
/// use airlock::persist::FileAdapter;
///
/// let adapter = FileAdapter::new("/var/lib/airlock/sessions.json");
/// ```
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    /// Creates a new file adapter for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PersistenceAdapter for FileAdapter {
    async fn load(&self) -> Result<Option<StoreDocument>, SessionError> {
        if !self.path.exists() {
            // First boot.
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            SessionError::Persistence(format!(
                "Failed to read session store {}: {e}",
                self.path.display()
            ))
        })?;

        match serde_json::from_str(&content) {
            Ok(document) => Ok(Some(document)),
            Err(error) => {
                // A garbled file must not keep the service from booting;
                // losing the old sessions is the recovery.
                log::warn!(
                    target: "airlock::persist",
                    "discarding unreadable session store {}: {error}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, document: &StoreDocument) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(document).map_err(|e| {
            SessionError::Persistence(format!("Failed to serialize session store: {e}"))
        })?;

        std::fs::write(&self.path, content).map_err(|e| {
            SessionError::Persistence(format!(
                "Failed to write session store {}: {e}",
                self.path.display()
            ))
        })?;

        // The document holds live bearer tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| {
                    SessionError::Persistence(format!(
                        "Failed to restrict session store {}: {e}",
                        self.path.display()
                    ))
                },
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use crate::crypto::generate_token;
    use crate::persist::CURRENT_REVISION;

    use super::*;

    fn temp_path() -> PathBuf {
        env::temp_dir().join(format!(
            "airlock_persist_test_{}.json",
            generate_token(8).unwrap()
        ))
    }

    fn cleanup(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
    }

    fn sample_document() -> StoreDocument {
        StoreDocument {
            revision: CURRENT_REVISION,
            timeout: Some(1800),
            auth_methods: None,
            sessions: vec![serde_json::json!({
                "unique_id": "fNX9kGJK2a",
                "session_token": "vtcBkKKrpPyxBBCGxPzq",
                "csrf_token": "Xyn0PqEbWhbQxQnBs1Fn",
                "username": "alice",
                "client_ip": "192.0.2.7",
            })],
        }
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let path = temp_path();
        let adapter = FileAdapter::new(&path);

        assert!(adapter.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let path = temp_path();
        let adapter = FileAdapter::new(&path);

        adapter.save(&sample_document()).await.unwrap();
        let loaded = adapter.load().await.unwrap().unwrap();

        assert_eq!(loaded.revision, CURRENT_REVISION);
        assert_eq!(loaded.timeout, Some(1800));
        assert_eq!(loaded.sessions.len(), 1);
        assert_eq!(loaded.sessions[0]["username"], "alice");

        cleanup(&path);
    }

    #[tokio::test]
    async fn test_garbled_file_loads_as_empty() {
        let path = temp_path();
        std::fs::write(&path, "{not json").unwrap();

        let adapter = FileAdapter::new(&path);
        assert!(adapter.load().await.unwrap().is_none());

        cleanup(&path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path();
        let adapter = FileAdapter::new(&path);
        adapter.save(&sample_document()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        cleanup(&path);
    }
}
