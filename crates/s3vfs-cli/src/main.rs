//! s3vfs: command-line front end for the configured storage backend.
//!
//! Settings come from a dotenv-style file (`--settings`) and `--set key=value` overrides.
//! Every command prints JSON on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use s3vfs_cli::{init_tracing, load_settings, parse_key_val};
use s3vfs_core::constants::{
    DEFAULT_IMAGE_EXTENSION, DEFAULT_SETTINGS_PREFIX, DEFAULT_URL_EXPIRATION_SECS,
};
use s3vfs_storage::{configure, ExtensionPolicy, FileHandle, StorageRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "s3vfs", about = "S3-compatible file storage CLI")]
struct Cli {
    /// Settings file with `key=value` lines
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Prefix of the storage settings keys
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PREFIX)]
    prefix: String,
    /// Override a setting (repeatable)
    #[arg(long = "set", global = true, value_parser = parse_key_val)]
    overrides: Vec<(String, String)>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Destination folder
        #[arg(long)]
        folder: Option<String>,
        /// Store under a random UUID name, keeping the extension
        #[arg(long)]
        randomize: bool,
        /// Filename to store under instead of the local file name
        #[arg(long)]
        name: Option<String>,
        /// Extension policy for this upload, e.g. `images,pdf`
        #[arg(long)]
        extensions: Option<String>,
    },
    /// Upload an image under a generated name
    UploadImage {
        /// Path to the image
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
        /// One of jpg, jpeg, png, webp
        #[arg(long, default_value = DEFAULT_IMAGE_EXTENSION)]
        extension: String,
    },
    /// Delete one object
    Delete { key: String },
    /// Delete every object under a folder
    DeleteMany { folder: String },
    /// Check whether an object exists
    Exists { key: String },
    /// List objects under a prefix
    List {
        #[arg(default_value = "")]
        folder: String,
    },
    /// Create a directory marker
    Mkdir { folder: String },
    /// Generate a download URL
    Url {
        filename: String,
        #[arg(long)]
        folder: Option<String>,
        /// Expiration in seconds
        #[arg(long, default_value_t = DEFAULT_URL_EXPIRATION_SECS)]
        expires: u64,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

async fn open(path: &Path) -> anyhow::Result<tokio::fs::File> {
    tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref(), &cli.overrides)?;
    tracing::debug!(count = settings.len(), prefix = %cli.prefix, "Settings loaded");
    let registry = StorageRegistry::new();
    configure(&registry, &settings, &cli.prefix)
        .await
        .context("Failed to configure storage backend")?;
    let storage = registry.get().await?;

    match cli.command {
        Commands::Upload {
            file,
            folder,
            randomize,
            name,
            extensions,
        } => {
            let filename = match name {
                Some(name) => name,
                None => file_name(&file)?,
            };
            let policy = extensions.map(|e| e.parse::<ExtensionPolicy>().unwrap_or_default());

            let mut reader = open(&file).await?;
            let stored = storage
                .save(
                    FileHandle::new(filename, &mut reader),
                    folder.as_deref(),
                    randomize,
                    policy.as_ref(),
                )
                .await?;
            print_json(&serde_json::json!({ "filename": stored, "folder": folder }))?;
        }
        Commands::UploadImage {
            file,
            folder,
            extension,
        } => {
            let filename = file_name(&file)?;
            let mut reader = open(&file).await?;
            let stored = storage
                .save_image(
                    FileHandle::new(filename, &mut reader),
                    folder.as_deref(),
                    &extension,
                )
                .await?;
            print_json(&serde_json::json!({ "filename": stored, "folder": folder }))?;
        }
        Commands::Delete { key } => {
            storage.delete(&key).await?;
            print_json(&serde_json::json!({ "success": true, "key": key }))?;
        }
        Commands::DeleteMany { folder } => {
            let deleted = storage.delete_many(&folder).await?;
            print_json(&serde_json::json!({ "deleted": deleted, "folder": folder }))?;
        }
        Commands::Exists { key } => {
            let found = storage.exists(&key).await?;
            print_json(&serde_json::json!({ "exists": found.is_some(), "key": found }))?;
        }
        Commands::List { folder } => {
            let keys = storage.list_objects(&folder).await?;
            print_json(&keys)?;
        }
        Commands::Mkdir { folder } => {
            let marker = storage.ensure_directory(&folder).await?;
            print_json(&serde_json::json!({ "directory": marker }))?;
        }
        Commands::Url {
            filename,
            folder,
            expires,
        } => {
            let url = storage
                .try_url(&filename, folder.as_deref(), Duration::from_secs(expires))
                .await?;
            print_json(&serde_json::json!({ "url": url, "expires_in": expires }))?;
        }
    }

    Ok(())
}
