//! Storage abstraction trait
//!
//! This module defines the FileStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use s3vfs_core::{ConfigError, ExtensionPolicy};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("File not allowed: {filename}")]
    FileNotAllowed { filename: String },

    #[error("No storage backend has been registered")]
    NotConfigured,

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[cfg(feature = "storage-s3")]
    #[error("S3 error: {0}")]
    S3(#[source] Box<aws_sdk_s3::Error>),

    #[error("Presign failed: {0}")]
    Presign(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(feature = "storage-s3")]
impl StorageError {
    /// Wrap any SDK operation error, keeping it as the error source.
    pub fn s3<E>(err: E) -> Self
    where
        aws_sdk_s3::Error: From<E>,
    {
        StorageError::S3(Box::new(aws_sdk_s3::Error::from(err)))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An uploaded file: the original filename plus a borrowed byte stream.
///
/// The stream is only borrowed, so a backend can read it during the upload call but cannot
/// keep it afterwards.
pub struct FileHandle<'a> {
    filename: String,
    reader: &'a mut (dyn AsyncRead + Send + Unpin),
}

impl<'a> FileHandle<'a> {
    pub fn new(filename: impl Into<String>, reader: &'a mut (dyn AsyncRead + Send + Unpin)) -> Self {
        Self {
            filename: filename.into(),
            reader,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Drain the stream into memory.
    pub async fn read_to_bytes(self) -> StorageResult<Bytes> {
        let mut buffer = Vec::new();
        self.reader.read_to_end(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for FileHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait so application
/// code can be written once against it and the backend picked from settings at startup.
///
/// **Key format:** `folder/filename`, or just `filename` when no folder is given. See the
/// crate root documentation.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Upload a file and return its final filename.
    ///
    /// The extension is checked against `extensions` (or the backend's configured policy)
    /// before anything is written; a rejected file fails with `FileNotAllowed`. With
    /// `randomize` the stored name is a fresh UUID carrying the original extension.
    async fn save(
        &self,
        file: FileHandle<'_>,
        folder: Option<&str>,
        randomize: bool,
        extensions: Option<&ExtensionPolicy>,
    ) -> StorageResult<String>;

    /// Upload an image under a generated `<uuid>.<extension>` name.
    ///
    /// `extension` must be one of `jpg`, `jpeg`, `png` or `webp`. The caller's filename is
    /// never used.
    async fn save_image(
        &self,
        file: FileHandle<'_>,
        folder: Option<&str>,
        extension: &str,
    ) -> StorageResult<String>;

    /// Delete the object stored at exactly `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Delete every object under `folder`.
    ///
    /// Returns `false` when nothing matched. Not atomic: a failure part-way leaves the
    /// objects deleted so far deleted.
    async fn delete_many(&self, folder: &str) -> StorageResult<bool>;

    /// Exact-key existence check. Returns the key when the object exists.
    async fn exists(&self, key: &str) -> StorageResult<Option<String>>;

    /// All keys starting with `folder`, across every page of results.
    async fn list_objects(&self, folder: &str) -> StorageResult<Vec<String>>;

    /// Create the `folder/` directory marker and return it.
    async fn ensure_directory(&self, folder: &str) -> StorageResult<String>;

    /// Generate a time-limited download URL for `folder/filename`.
    async fn try_url(
        &self,
        filename: &str,
        folder: Option<&str>,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Fail-soft variant of [`try_url`](Self::try_url).
    ///
    /// Unlike every other operation, URL generation never fails the caller: signing and
    /// credential errors are logged and turned into `None`, so a page can render without a
    /// link. Use `try_url` when the failure reason matters.
    async fn url(
        &self,
        filename: &str,
        folder: Option<&str>,
        expires_in: Duration,
    ) -> Option<String> {
        match self.try_url(filename, folder, expires_in).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    filename = %filename,
                    folder = ?folder,
                    backend = %self.backend_type(),
                    "Failed to generate download URL"
                );
                None
            }
        }
    }

    /// Extension policy used when `save` is called without one
    fn extensions(&self) -> &ExtensionPolicy;

    /// Check a filename against `extensions`, or the configured policy when `None`.
    fn filename_allowed(&self, filename: &str, extensions: Option<&ExtensionPolicy>) -> bool {
        extensions
            .unwrap_or_else(|| self.extensions())
            .allows_filename(filename)
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
