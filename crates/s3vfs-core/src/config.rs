//! Configuration module
//!
//! Typed storage configuration built from a flat settings map. The S3 options mirror the
//! settings keys one to one (`aws.bucket_name`, `aws.port`, ...); the local backend only
//! needs a base path, a base URL and an extension policy.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::extensions::ExtensionPolicy;
use crate::settings::{read_settings, OptionSpec, ResolvedSettings, Settings};
use crate::storage_types::StorageBackend;

// Defaults
const ACL: &str = "public-read";
const NUM_RETRIES: usize = 1;
const TIMEOUT_SECS: u64 = 5;
const SIGNATURE_VERSION: &str = "s3v4";

/// Options read by the S3 backend, in the order they are resolved.
pub const S3_OPTIONS: &[OptionSpec] = &[
    OptionSpec::required("aws.bucket_name"),
    OptionSpec::optional("aws.acl", Some(ACL)),
    OptionSpec::required("base_path"),
    OptionSpec::optional("base_url", Some("")),
    OptionSpec::optional("extensions", Some("default")),
    // S3 connection options
    OptionSpec::optional("aws.access_key", None),
    OptionSpec::optional("aws.secret_key", None),
    OptionSpec::optional("aws.use_path_style", Some("false")),
    OptionSpec::optional("aws.is_secure", Some("true")),
    OptionSpec::optional("aws.host", None),
    OptionSpec::optional("aws.port", None),
    OptionSpec::optional("aws.region", None),
    OptionSpec::optional("aws.num_retries", Some("1")),
    OptionSpec::optional("aws.timeout", Some("5")),
    OptionSpec::optional("aws.signature_version", Some(SIGNATURE_VERSION)),
];

/// Options read by the local filesystem backend.
pub const LOCAL_OPTIONS: &[OptionSpec] = &[
    OptionSpec::required("base_path"),
    OptionSpec::optional("base_url", Some("")),
    OptionSpec::optional("extensions", Some("default")),
];

const BACKEND_OPTIONS: &[OptionSpec] = &[OptionSpec::optional("backend", Some("s3"))];

/// Signature versions the S3 client can produce.
pub const SUPPORTED_SIGNATURE_VERSIONS: &[&str] = &["s3v4", "v4"];

/// Read which backend the settings select (`backend`, default `s3`).
pub fn backend_from_settings(
    settings: &Settings,
    prefix: &str,
) -> Result<StorageBackend, ConfigError> {
    let resolved = read_settings(settings, BACKEND_OPTIONS, prefix)?;
    resolved.get("backend").unwrap_or("s3").parse()
}

/// Static credentials. Both halves must be present to be used.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Credentials {
    /// Returns the key pair when both halves are configured.
    pub fn static_pair(&self) -> Option<(&str, &str)> {
        match (self.access_key.as_deref(), self.secret_key.as_deref()) {
            (Some(access), Some(secret)) => Some((access, secret)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Connection options handed to the S3 client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub region: Option<String>,
    pub num_retries: usize,
    pub timeout: Duration,
    pub use_path_style: bool,
    pub is_secure: bool,
    pub signature_version: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            region: None,
            num_retries: NUM_RETRIES,
            timeout: Duration::from_secs(TIMEOUT_SECS),
            use_path_style: false,
            is_secure: true,
            signature_version: Some(SIGNATURE_VERSION.to_string()),
        }
    }
}

impl ConnectionOptions {
    /// Custom endpoint built from host and port; `None` without a host or without any port.
    ///
    /// A host given without a scheme gets `https://` or `http://` depending on `is_secure`.
    /// A host that already names a port (`http://minio:9000`) is a complete endpoint and is
    /// used as given; the port setting is not appended to it.
    pub fn endpoint_url(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim().trim_end_matches('/');

        let (scheme, authority) = match host.split_once("://") {
            Some((scheme, rest)) => (scheme.to_string(), rest),
            None => {
                let scheme = if self.is_secure { "https" } else { "http" };
                (scheme.to_string(), host)
            }
        };

        if authority_has_port(authority) {
            return Some(format!("{}://{}", scheme, authority));
        }

        let port = self.port?;
        Some(format!("{}://{}:{}", scheme, authority, port))
    }
}

/// `true` if `authority` (`host[:port][/path]`) ends its host part with `:<digits>`.
fn authority_has_port(authority: &str) -> bool {
    let host_port = authority.split('/').next().unwrap_or_default();
    match host_port.rsplit_once(':') {
        // A bare IPv6 literal has colons but no port outside the brackets
        Some((host, port)) => {
            !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit())
                && (!host.contains(':') || host.ends_with(']'))
        }
        None => false,
    }
}

/// S3 backend configuration. Built once at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket_name: String,
    pub acl: String,
    pub base_path: String,
    pub base_url: String,
    pub extensions: ExtensionPolicy,
    pub credentials: Credentials,
    pub connection: ConnectionOptions,
}

impl StorageConfig {
    /// Build the S3 configuration from `settings` using keys under `prefix`.
    pub fn from_settings(settings: &Settings, prefix: &str) -> Result<Self, ConfigError> {
        let resolved = read_settings(settings, S3_OPTIONS, prefix)?;
        let config = Self::from_resolved(&resolved)?;
        config.validate()?;
        Ok(config)
    }

    fn from_resolved(resolved: &ResolvedSettings) -> Result<Self, ConfigError> {
        let extensions = resolved
            .get("extensions")
            .unwrap_or("default")
            .parse::<ExtensionPolicy>()
            .unwrap_or_default();

        let connection = ConnectionOptions {
            host: resolved.get_non_empty("aws.host").map(String::from),
            port: resolved.get_parsed::<u16>("aws.port")?,
            region: resolved.get_non_empty("aws.region").map(String::from),
            num_retries: resolved
                .get_parsed::<usize>("aws.num_retries")?
                .unwrap_or(NUM_RETRIES),
            timeout: Duration::from_secs(
                resolved
                    .get_parsed::<u64>("aws.timeout")?
                    .unwrap_or(TIMEOUT_SECS),
            ),
            use_path_style: resolved.get_bool("aws.use_path_style")?.unwrap_or(false),
            is_secure: resolved.get_bool("aws.is_secure")?.unwrap_or(true),
            signature_version: resolved
                .get_non_empty("aws.signature_version")
                .map(|v| v.trim().to_lowercase()),
        };

        Ok(StorageConfig {
            bucket_name: resolved.require("aws.bucket_name")?.to_string(),
            acl: resolved.get("aws.acl").unwrap_or(ACL).to_string(),
            base_path: resolved.require("base_path")?.to_string(),
            base_url: resolved.get("base_url").unwrap_or_default().to_string(),
            extensions,
            credentials: Credentials {
                access_key: resolved.get_non_empty("aws.access_key").map(String::from),
                secret_key: resolved.get_non_empty("aws.secret_key").map(String::from),
            },
            connection,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "aws.bucket_name",
                &self.bucket_name,
                "bucket name must not be empty",
            ));
        }

        if self.connection.timeout.is_zero() {
            return Err(ConfigError::invalid(
                "aws.timeout",
                "0",
                "timeout must be at least one second",
            ));
        }

        if let Some(ref version) = self.connection.signature_version {
            if !SUPPORTED_SIGNATURE_VERSIONS.contains(&version.as_str()) {
                return Err(ConfigError::invalid(
                    "aws.signature_version",
                    version,
                    "only SigV4 signing (s3v4) is supported",
                ));
            }
        }

        Ok(())
    }
}

/// Local filesystem backend configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalStorageConfig {
    pub base_path: String,
    pub base_url: String,
    pub extensions: ExtensionPolicy,
}

impl LocalStorageConfig {
    pub fn from_settings(settings: &Settings, prefix: &str) -> Result<Self, ConfigError> {
        let resolved = read_settings(settings, LOCAL_OPTIONS, prefix)?;

        let base_path = resolved.require("base_path")?.to_string();
        if base_path.trim().is_empty() {
            return Err(ConfigError::invalid(
                "base_path",
                base_path,
                "base path must not be empty",
            ));
        }

        Ok(LocalStorageConfig {
            base_path,
            base_url: resolved.get("base_url").unwrap_or_default().to_string(),
            extensions: resolved
                .get("extensions")
                .unwrap_or("default")
                .parse::<ExtensionPolicy>()
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        pairs
            .iter()
            .map(|(k, v)| (format!("storage.{}", k), v.to_string()))
            .collect()
    }

    fn minimal() -> Settings {
        settings(&[("aws.bucket_name", "media"), ("base_path", "/files")])
    }

    #[test]
    fn test_defaults_for_absent_optional_keys() {
        let config = StorageConfig::from_settings(&minimal(), "storage.").unwrap();

        assert_eq!(config.bucket_name, "media");
        assert_eq!(config.base_path, "/files");
        assert_eq!(config.acl, "public-read");
        assert_eq!(config.base_url, "");
        assert_eq!(config.extensions, ExtensionPolicy::default());
        assert_eq!(config.credentials, Credentials::default());
        assert_eq!(config.connection, ConnectionOptions::default());
        assert_eq!(config.connection.num_retries, 1);
        assert_eq!(config.connection.timeout, Duration::from_secs(5));
        assert!(config.connection.is_secure);
        assert!(!config.connection.use_path_style);
        assert_eq!(config.connection.signature_version.as_deref(), Some("s3v4"));
    }

    #[test]
    fn test_every_required_key_is_enforced() {
        for missing in ["aws.bucket_name", "base_path"] {
            let mut s = minimal();
            s.remove(&format!("storage.{}", missing));
            let err = StorageConfig::from_settings(&s, "storage.").unwrap_err();
            assert_eq!(err, ConfigError::missing(format!("storage.{}", missing)));
        }
    }

    #[test]
    fn test_full_settings() {
        let s = settings(&[
            ("aws.bucket_name", "media"),
            ("aws.acl", "private"),
            ("base_path", "/files"),
            ("base_url", "https://cdn.example.com"),
            ("extensions", "png,jpg"),
            ("aws.access_key", "AKIDEXAMPLE"),
            ("aws.secret_key", "secret"),
            ("aws.use_path_style", "true"),
            ("aws.is_secure", "false"),
            ("aws.host", "localhost"),
            ("aws.port", "9000"),
            ("aws.region", "eu-west-1"),
            ("aws.num_retries", "3"),
            ("aws.timeout", "30"),
        ]);
        let config = StorageConfig::from_settings(&s, "storage.").unwrap();

        assert_eq!(config.acl, "private");
        assert_eq!(
            config.extensions,
            "jpg,png".parse::<ExtensionPolicy>().unwrap()
        );
        assert_eq!(
            config.credentials.static_pair(),
            Some(("AKIDEXAMPLE", "secret"))
        );
        assert_eq!(config.connection.port, Some(9000));
        assert_eq!(config.connection.num_retries, 3);
        assert_eq!(config.connection.timeout, Duration::from_secs(30));
        assert_eq!(
            config.connection.endpoint_url().as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut s = minimal();
        s.insert("storage.aws.port".into(), "nine-thousand".into());
        let err = StorageConfig::from_settings(&s, "storage.").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "aws.port"));
    }

    #[test]
    fn test_unsupported_signature_version_rejected() {
        let mut s = minimal();
        s.insert("storage.aws.signature_version".into(), "s3".into());
        let err = StorageConfig::from_settings(&s, "storage.").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == "aws.signature_version")
        );
    }

    #[test]
    fn test_endpoint_requires_host_and_port() {
        let mut options = ConnectionOptions {
            host: Some("minio.internal".into()),
            ..Default::default()
        };
        assert_eq!(options.endpoint_url(), None);

        options.port = Some(9000);
        assert_eq!(
            options.endpoint_url().as_deref(),
            Some("https://minio.internal:9000")
        );

        options.host = Some("http://minio.internal/".into());
        assert_eq!(
            options.endpoint_url().as_deref(),
            Some("http://minio.internal:9000")
        );

        options.host = None;
        assert_eq!(options.endpoint_url(), None);
    }

    #[test]
    fn test_endpoint_host_with_port_used_as_given() {
        let mut options = ConnectionOptions {
            host: Some("http://minio:9000".into()),
            port: Some(9000),
            ..Default::default()
        };
        assert_eq!(options.endpoint_url().as_deref(), Some("http://minio:9000"));

        options.port = None;
        assert_eq!(options.endpoint_url().as_deref(), Some("http://minio:9000"));

        options.host = Some("minio:9100/".into());
        options.is_secure = false;
        assert_eq!(options.endpoint_url().as_deref(), Some("http://minio:9100"));

        options.host = Some("[::1]:9000".into());
        assert_eq!(options.endpoint_url().as_deref(), Some("http://[::1]:9000"));

        options.host = Some("[::1]".into());
        options.port = Some(9000);
        assert_eq!(options.endpoint_url().as_deref(), Some("http://[::1]:9000"));
    }

    #[test]
    fn test_empty_extensions_setting_uses_default_policy() {
        let mut s = minimal();
        s.insert("storage.extensions".into(), "".into());
        let config = StorageConfig::from_settings(&s, "storage.").unwrap();
        assert_eq!(config.extensions, ExtensionPolicy::default());
    }

    #[test]
    fn test_empty_host_treated_as_unset() {
        let mut s = minimal();
        s.insert("storage.aws.host".into(), "".into());
        s.insert("storage.aws.port".into(), "9000".into());
        let config = StorageConfig::from_settings(&s, "storage.").unwrap();
        assert_eq!(config.connection.host, None);
        assert_eq!(config.connection.endpoint_url(), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = Credentials {
            access_key: Some("AKIDEXAMPLE".into()),
            secret_key: Some("super-secret".into()),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_static_pair_needs_both_halves() {
        let credentials = Credentials {
            access_key: Some("AKIDEXAMPLE".into()),
            secret_key: None,
        };
        assert_eq!(credentials.static_pair(), None);
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(
            backend_from_settings(&minimal(), "storage.").unwrap(),
            StorageBackend::S3
        );

        let mut s = minimal();
        s.insert("storage.backend".into(), "local".into());
        assert_eq!(
            backend_from_settings(&s, "storage.").unwrap(),
            StorageBackend::Local
        );

        s.insert("storage.backend".into(), "ftp".into());
        assert!(backend_from_settings(&s, "storage.").is_err());
    }

    #[test]
    fn test_local_config() {
        let s = settings(&[("base_path", "/var/lib/s3vfs"), ("extensions", "images")]);
        let config = LocalStorageConfig::from_settings(&s, "storage.").unwrap();
        assert_eq!(config.base_path, "/var/lib/s3vfs");
        assert_eq!(config.base_url, "");
        assert!(config.extensions.allows_filename("a.png"));

        let err = LocalStorageConfig::from_settings(&Settings::new(), "storage.").unwrap_err();
        assert_eq!(err, ConfigError::missing("storage.base_path"));
    }
}
