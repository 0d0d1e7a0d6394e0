#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{FileStorage, StorageBackend, StorageRegistry, StorageResult};
#[cfg(any(not(feature = "storage-s3"), not(feature = "storage-local")))]
use crate::StorageError;
use s3vfs_core::{backend_from_settings, Settings};
use std::sync::Arc;

/// Create a storage backend from the settings under `prefix`.
///
/// `backend` selects the implementation (`s3` when unset).
pub async fn create_storage(settings: &Settings, prefix: &str) -> StorageResult<Arc<dyn FileStorage>> {
    let backend = backend_from_settings(settings, prefix)?;

    match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let storage = S3Storage::from_settings(settings, prefix).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::BackendUnavailable(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::from_settings(settings, prefix).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::BackendUnavailable(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Build the configured backend and register it. Call once at startup.
pub async fn configure(
    registry: &StorageRegistry,
    settings: &Settings,
    prefix: &str,
) -> StorageResult<Arc<dyn FileStorage>> {
    let storage = create_storage(settings, prefix).await?;

    tracing::info!(
        backend = %storage.backend_type(),
        prefix = %prefix,
        "Storage backend registered"
    );

    registry.register(storage.clone()).await;
    Ok(storage)
}
