//! s3vfs storage library
//!
//! A uniform file-storage interface ([`FileStorage`]) with pluggable backends: an
//! S3-compatible object store and the local filesystem.
//!
//! # Object key format
//!
//! Files are addressed by `folder/filename`. A missing or empty folder means the file lives
//! at the bucket (or base directory) root. "Directories" are a naming convention only; the
//! S3 backend materialises them as zero-byte `folder/` marker objects.
//!
//! Key generation is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{configure, create_storage};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use registry::StorageRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::{ListPage, ObjectClient, S3Client, S3Storage};
pub use s3vfs_core::{ExtensionPolicy, StorageBackend};
pub use traits::{FileHandle, FileStorage, StorageError, StorageResult};
