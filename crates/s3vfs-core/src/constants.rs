//! Shared constants

/// Prefix under which storage settings are looked up
pub const DEFAULT_SETTINGS_PREFIX: &str = "storage.";

/// Default lifetime of a generated download URL, in seconds
pub const DEFAULT_URL_EXPIRATION_SECS: u64 = 3600;

/// Extension used by `save_image` when the caller does not pick one
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// Region used for signing when neither settings nor the environment name one
pub const FALLBACK_REGION: &str = "us-east-1";
