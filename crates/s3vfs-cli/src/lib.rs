use anyhow::{bail, Context};
use s3vfs_core::{load_settings_file, Settings};
use std::path::Path;

/// Parse a `key=value` override. The value may itself contain `=`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=value: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Build the settings map: the settings file first, then `--set` overrides on top.
pub fn load_settings(file: Option<&Path>, overrides: &[(String, String)]) -> anyhow::Result<Settings> {
    let mut settings = match file {
        Some(path) => load_settings_file(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?,
        None => Settings::new(),
    };

    settings.extend(overrides.iter().cloned());

    if settings.is_empty() {
        bail!("No settings given. Pass --settings <file> or --set key=value");
    }

    Ok(settings)
}

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
