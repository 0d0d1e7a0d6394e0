//! Registry holding the active storage backend

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::traits::{FileStorage, StorageError, StorageResult};

/// Handle to the storage backend the application runs against.
///
/// Thread-safe and async-compatible using tokio's RwLock. Clones share the same slot, so the
/// host registers once at startup and hands clones to whatever needs storage.
#[derive(Clone)]
pub struct StorageRegistry {
    slot: Arc<RwLock<Option<Arc<dyn FileStorage>>>>,
}

impl StorageRegistry {
    /// Create a registry with no backend registered
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Register the active backend. Replaces any previous registration.
    pub async fn register(&self, storage: Arc<dyn FileStorage>) {
        let mut slot = self.slot.write().await;
        if let Some(ref previous) = *slot {
            tracing::warn!(
                previous = %previous.backend_type(),
                replacement = %storage.backend_type(),
                "Replacing registered storage backend"
            );
        }
        *slot = Some(storage);
    }

    /// Get the registered backend
    pub async fn get(&self) -> StorageResult<Arc<dyn FileStorage>> {
        let slot = self.slot.read().await;
        slot.clone().ok_or(StorageError::NotConfigured)
    }

    /// Remove the registered backend
    pub async fn clear(&self) {
        self.slot.write().await.take();
    }

    pub async fn is_configured(&self) -> bool {
        self.slot.read().await.is_some()
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry").finish_non_exhaustive()
    }
}
