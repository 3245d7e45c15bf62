use crate::adapters::memory::{LedgerSnapshot, MemoryStore};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Loads and saves a whole [`MemoryStore`] as one JSON document through a
/// [`Storage`] backend.
#[derive(Debug, Clone)]
pub struct SnapshotFile<S: Storage> {
    storage: S,
    file_name: String,
}

impl<S: Storage> SnapshotFile<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// An absent file yields an empty store.
    pub async fn load(&self) -> Result<MemoryStore> {
        if !self.storage.exists(&self.file_name).await? {
            tracing::info!("📂 No snapshot at {}, starting empty", self.file_name);
            return Ok(MemoryStore::new());
        }

        let data = self.storage.read_file(&self.file_name).await?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&data)?;
        tracing::debug!(
            "📂 Loaded snapshot: {} records, {} bank entries, {} pools, {} members",
            snapshot.records.len(),
            snapshot.bank_entries.len(),
            snapshot.pools.len(),
            snapshot.pool_members.len()
        );
        MemoryStore::from_snapshot(snapshot)
    }

    pub async fn save(&self, store: &MemoryStore) -> Result<()> {
        let snapshot = store.snapshot().await;
        let data = serde_json::to_vec_pretty(&snapshot)?;
        tracing::debug!("💾 Writing snapshot ({} bytes) to {}", data.len(), self.file_name);
        self.storage.write_file(&self.file_name, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::LedgerError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .await
                .get(path)
                .cloned()
                .ok_or_else(|| LedgerError::StorageError {
                    message: format!("missing {path}"),
                })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.files.lock().await.contains_key(path))
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let file = SnapshotFile::new(MockStorage::default(), "ledger.json");
        let store = file.load().await.unwrap();
        assert_eq!(store.snapshot().await.pools.len(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let storage = MockStorage::default();
        storage.write_file("ledger.json", b"not json").await.unwrap();
        let file = SnapshotFile::new(storage, "ledger.json");
        assert!(matches!(
            file.load().await,
            Err(LedgerError::SerializationError(_))
        ));
    }
}
