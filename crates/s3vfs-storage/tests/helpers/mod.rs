//! Test helpers: in-memory object client and settings builders.
//!
//! Run from workspace root: `cargo test -p s3vfs-storage`.

#![allow(dead_code)]

pub mod mock_client;

use s3vfs_core::{Settings, StorageConfig};
use s3vfs_storage::S3Storage;
use std::sync::Arc;

pub use mock_client::MockObjectClient;

/// Settings prefix used throughout the tests.
pub const PREFIX: &str = "storage.";

/// Build a settings map, prefixing every key with [`PREFIX`].
pub fn settings(pairs: &[(&str, &str)]) -> Settings {
    pairs
        .iter()
        .map(|(k, v)| (format!("{}{}", PREFIX, k), v.to_string()))
        .collect()
}

/// The smallest settings map an S3 backend accepts.
pub fn s3_settings() -> Settings {
    settings(&[("aws.bucket_name", "media"), ("base_path", "/files")])
}

/// S3 adapter over a fresh mock client, plus a handle to the mock for assertions.
pub fn s3_storage(settings: &Settings) -> (S3Storage, Arc<MockObjectClient>) {
    let config = StorageConfig::from_settings(settings, PREFIX).expect("valid test settings");
    let client = Arc::new(MockObjectClient::new(&config.bucket_name));
    let storage = S3Storage::with_client(config, client.clone());
    (storage, client)
}
