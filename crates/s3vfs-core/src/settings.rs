//! Settings reader
//!
//! Extracts typed configuration values from a flat key-value settings source. Every
//! backend declares the options it understands as a list of [`OptionSpec`]s; the reader
//! looks each one up under a common prefix (e.g. `storage.`) and returns the values keyed
//! by the unprefixed option name.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// Flat settings source, e.g. `storage.aws.bucket_name -> media`
pub type Settings = HashMap<String, String>;

/// Declaration of a single configuration option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub key: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl OptionSpec {
    pub const fn required(key: &'static str) -> Self {
        Self {
            key,
            required: true,
            default: None,
        }
    }

    pub const fn optional(key: &'static str, default: Option<&'static str>) -> Self {
        Self {
            key,
            required: false,
            default,
        }
    }
}

/// Values resolved by [`read_settings`], keyed by unprefixed option name.
///
/// Optional options without a default resolve to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSettings {
    values: BTreeMap<String, Option<String>>,
}

impl ResolvedSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    /// Like [`get`](Self::get) but treats an empty value as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::missing(key))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get_non_empty(key)
            .map(|value| {
                parse_bool(value)
                    .ok_or_else(|| ConfigError::invalid(key, value, "expected a boolean"))
            })
            .transpose()
    }

    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_non_empty(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
            })
            .transpose()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Resolve `specs` against `settings`, looking each key up as `prefix + key`.
///
/// Fails on the first required option that is absent; nothing is returned in that case.
pub fn read_settings(
    settings: &Settings,
    specs: &[OptionSpec],
    prefix: &str,
) -> Result<ResolvedSettings, ConfigError> {
    let mut values = BTreeMap::new();

    for spec in specs {
        let full_key = format!("{}{}", prefix, spec.key);
        let value = match settings.get(&full_key) {
            Some(value) => Some(value.clone()),
            None if spec.required => return Err(ConfigError::missing(full_key)),
            None => spec.default.map(String::from),
        };
        values.insert(spec.key.to_string(), value);
    }

    Ok(ResolvedSettings { values })
}

/// Load a dotenv-style settings file (`storage.aws.bucket_name=media` per line).
pub fn load_settings_file(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let source_error = |reason: String| ConfigError::Source {
        path: path.display().to_string(),
        reason,
    };

    let iter = dotenvy::from_path_iter(path).map_err(|e| source_error(e.to_string()))?;

    let mut settings = Settings::new();
    for item in iter {
        let (key, value) = item.map_err(|e| source_error(e.to_string()))?;
        settings.insert(key, value);
    }

    Ok(settings)
}

/// Parse the boolean spellings accepted in settings files.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "y" | "t" | "1" => Some(true),
        "false" | "no" | "off" | "n" | "f" | "0" => Some(false),
        _ => None,
    }
}
