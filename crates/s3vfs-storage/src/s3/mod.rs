//! S3-compatible object storage backend

pub mod client;

pub use client::{ListPage, ObjectClient, S3Client};

use async_trait::async_trait;
use bytes::Bytes;
use s3vfs_core::{ExtensionPolicy, Settings, StorageConfig};
use std::sync::Arc;
use std::time::Duration;

use crate::keys;
use crate::traits::{FileHandle, FileStorage, StorageResult};
use crate::StorageBackend;

/// S3 storage implementation
///
/// Every operation delegates to one [`ObjectClient`] created at construction and shared for
/// the adapter's lifetime.
#[derive(Clone)]
pub struct S3Storage {
    client: Arc<dyn ObjectClient>,
    config: Arc<StorageConfig>,
}

impl S3Storage {
    /// Read the S3 options under `prefix` and build a configured adapter.
    pub async fn from_settings(settings: &Settings, prefix: &str) -> StorageResult<Self> {
        let config = StorageConfig::from_settings(settings, prefix)?;
        Self::new(config).await
    }

    /// Create a new S3Storage instance with its own SDK client
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let client = S3Client::from_config(&config).await?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build the adapter around an existing client.
    pub fn with_client(config: StorageConfig, client: Arc<dyn ObjectClient>) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Every key under `prefix`, following continuation tokens until the last page.
    async fn list_all(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_page(prefix, continuation.as_deref())
                .await?;
            keys.extend(page.keys);

            match page.next_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(keys)
    }

    /// First key that starts with `prefix`, if any.
    ///
    /// A prefix probe rather than an existence check: `photo` matches `photo.png`. Use
    /// [`FileStorage::exists`] to test a specific key.
    pub async fn first_key_with_prefix(&self, prefix: &str) -> StorageResult<Option<String>> {
        let page = self.client.list_page(prefix, None).await?;
        Ok(page.keys.into_iter().next())
    }

    async fn upload(&self, key: &str, body: Bytes) -> StorageResult<()> {
        self.client
            .put_object(key, body, keys::content_type_for(key))
            .await
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn save(
        &self,
        file: FileHandle<'_>,
        folder: Option<&str>,
        randomize: bool,
        extensions: Option<&ExtensionPolicy>,
    ) -> StorageResult<String> {
        let policy = extensions.unwrap_or(&self.config.extensions);
        let filename = keys::upload_filename(file.filename(), policy, randomize)?;
        let key = keys::object_key(folder, &filename);

        let body = file.read_to_bytes().await?;
        self.upload(&key, body).await?;

        Ok(filename)
    }

    async fn save_image(
        &self,
        file: FileHandle<'_>,
        folder: Option<&str>,
        extension: &str,
    ) -> StorageResult<String> {
        let filename = keys::image_filename(extension)?;
        let key = keys::object_key(folder, &filename);

        let body = file.read_to_bytes().await?;
        self.upload(&key, body).await?;

        Ok(filename)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client.delete_object(key).await
    }

    async fn delete_many(&self, folder: &str) -> StorageResult<bool> {
        let keys = self.list_all(folder).await?;
        if keys.is_empty() {
            return Ok(false);
        }

        for key in &keys {
            self.client.delete_object(key).await?;
        }

        tracing::info!(
            bucket = %self.client.bucket(),
            prefix = %folder,
            count = keys.len(),
            "S3 prefix deleted"
        );

        Ok(true)
    }

    async fn exists(&self, key: &str) -> StorageResult<Option<String>> {
        if self.client.head_object(key).await? {
            Ok(Some(key.to_string()))
        } else {
            Ok(None)
        }
    }

    async fn list_objects(&self, folder: &str) -> StorageResult<Vec<String>> {
        self.list_all(folder).await
    }

    async fn ensure_directory(&self, folder: &str) -> StorageResult<String> {
        let marker = keys::folder_prefix(Some(folder));
        keys::validate_key(&marker)?;
        self.upload(&marker, Bytes::new()).await?;
        Ok(marker)
    }

    async fn try_url(
        &self,
        filename: &str,
        folder: Option<&str>,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let key = keys::object_key(folder, filename);
        self.client.presign_get(&key, expires_in).await
    }

    fn extensions(&self) -> &ExtensionPolicy {
        &self.config.extensions
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
