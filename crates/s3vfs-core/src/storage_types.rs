use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ConfigError;

/// Storage backend types
///
/// Selected with the `backend` setting; defined in core because configuration needs it
/// before any backend crate code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" | "s3v4" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(ConfigError::invalid(
                "backend",
                s,
                "expected one of: s3, local",
            )),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
