use crate::keys;
use crate::traits::{FileHandle, FileStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use s3vfs_core::{ExtensionPolicy, LocalStorageConfig, Settings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Keys map to paths below `base_path`. Directories are real directories and show up in
/// listings as `dir/` keys, matching the S3 marker convention.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    extensions: ExtensionPolicy,
}

impl LocalStorage {
    /// Create a new LocalStorage instance, creating `base_path` if needed.
    pub async fn new(config: LocalStorageConfig) -> StorageResult<Self> {
        let base_path = PathBuf::from(&config.base_path);

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: config.base_url,
            extensions: config.extensions,
        })
    }

    /// Read the local options under `prefix` and build the backend.
    pub async fn from_settings(settings: &Settings, prefix: &str) -> StorageResult<Self> {
        let config = LocalStorageConfig::from_settings(settings, prefix)?;
        Self::new(config).await
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        keys::validate_key(storage_key)?;

        let path = self.base_path.join(storage_key.trim_end_matches('/'));

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to canonicalize base path {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        // The deepest existing entry on the path must resolve inside the base
        let mut current = path.as_path();
        loop {
            if std::fs::symlink_metadata(current).is_ok() {
                let inside = current
                    .canonicalize()
                    .map(|canonical| canonical.starts_with(&base_canonical))
                    .unwrap_or(false);
                if !inside {
                    return Err(StorageError::InvalidKey(
                        "Storage key resolves outside storage directory".to_string(),
                    ));
                }
                break;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(path)
    }

    fn path_to_key(&self, path: &Path, is_dir: bool) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let mut key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_dir {
            key.push('/');
        }
        Some(key)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_file(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to create file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::BackendError(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::BackendError(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    /// Every file and directory below the base path, as sorted keys.
    async fn walk(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_dir = entry.file_type().await?.is_dir();
                if let Some(key) = self.path_to_key(&path, is_dir) {
                    keys.push(key);
                }
                if is_dir {
                    pending.push(path);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn save(
        &self,
        file: FileHandle<'_>,
        folder: Option<&str>,
        randomize: bool,
        extensions: Option<&ExtensionPolicy>,
    ) -> StorageResult<String> {
        let policy = extensions.unwrap_or(&self.extensions);
        let filename = keys::upload_filename(file.filename(), policy, randomize)?;
        let key = keys::object_key(folder, &filename);
        self.key_to_path(&key)?;

        let data = file.read_to_bytes().await?;
        self.write_file(&key, data).await?;

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
        self.key_to_path(&key)?;

        let data = file.read_to_bytes().await?;
        self.write_file(&key, data).await?;

        Ok(filename)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        let result = if storage_key.ends_with('/') {
            fs::remove_dir(&path).await
        } else {
            fs::remove_file(&path).await
        };

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path.display(),
                key = %storage_key,
                "Local storage delete failed"
            );
            StorageError::BackendError(format!("Failed to delete {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn delete_many(&self, folder: &str) -> StorageResult<bool> {
        let mut matched = self.list_objects(folder).await?;
        if matched.is_empty() {
            return Ok(false);
        }

        // Reverse lexical order visits `a/b/c` before `a/b/` before `a/`
        matched.reverse();
        for key in &matched {
            self.delete(key).await?;
        }

        Ok(true)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<Option<String>> {
        let path = self.key_to_path(storage_key)?;

        let found = match fs::metadata(&path).await {
            Ok(meta) => meta.is_dir() == storage_key.ends_with('/'),
            Err(_) => false,
        };

        Ok(found.then(|| storage_key.to_string()))
    }

    async fn list_objects(&self, folder: &str) -> StorageResult<Vec<String>> {
        let keys = self.walk().await?;
        Ok(keys.into_iter().filter(|k| k.starts_with(folder)).collect())
    }

    async fn ensure_directory(&self, folder: &str) -> StorageResult<String> {
        let marker = keys::folder_prefix(Some(folder));
        let path = self.key_to_path(&marker)?;
        fs::create_dir_all(&path).await?;
        Ok(marker)
    }

    async fn try_url(
        &self,
        filename: &str,
        folder: Option<&str>,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        if self.base_url.is_empty() {
            return Err(StorageError::BackendError(
                "base_url is not configured for local storage".to_string(),
            ));
        }

        let key = keys::object_key(folder, filename);
        self.key_to_path(&key)?;
        Ok(self.generate_url(&key))
    }

    fn extensions(&self) -> &ExtensionPolicy {
        &self.extensions
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
