use crate::error::StorageError;
use crate::{AccountRecord, Storage};
use async_trait::async_trait;
use core_types::AccountId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// An in-memory [`Storage`] implementation.
///
/// Commits replace the whole record under a write lock, which gives the
/// per-account atomicity the trait demands for free. `fail_next_commit`
/// lets a test exercise the engine's rollback path.
pub struct MemoryStore {
    records: RwLock<HashMap<AccountId, AccountRecord>>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Arms a one-shot commit failure.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshot of a single stored record, for assertions.
    pub async fn get(&self, account_id: AccountId) -> Option<AccountRecord> {
        self.records.read().await.get(&account_id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn commit(&self, record: AccountRecord) -> Result<(), StorageError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }
        self.records
            .write()
            .await
            .insert(record.account_id(), record);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<AccountRecord>, StorageError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
