//! s3vfs core library
//!
//! Configuration plumbing shared by every storage backend: the settings reader, typed
//! backend configuration, the extension allow-list policy and configuration errors.

pub mod config;
pub mod constants;
pub mod error;
pub mod extensions;
pub mod settings;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    backend_from_settings, ConnectionOptions, Credentials, LocalStorageConfig, StorageConfig,
};
pub use error::ConfigError;
pub use extensions::ExtensionPolicy;
pub use settings::{load_settings_file, read_settings, OptionSpec, ResolvedSettings, Settings};
pub use storage_types::StorageBackend;
