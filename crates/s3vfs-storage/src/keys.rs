//! Shared key and filename generation for storage backends.
//!
//! Key format: `{folder}/{filename}`, or `{filename}` without a folder.

use s3vfs_core::extensions::{extension_of, IMAGE_UPLOAD_EXTENSIONS};
use s3vfs_core::ExtensionPolicy;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Folder prefix for object keys: empty, or the folder with exactly one trailing `/`.
pub fn folder_prefix(folder: Option<&str>) -> String {
    match folder.map(|f| f.trim_end_matches('/')) {
        Some(f) if !f.is_empty() => format!("{}/", f),
        _ => String::new(),
    }
}

/// Generate the object key for `filename` inside `folder`.
pub fn object_key(folder: Option<&str>, filename: &str) -> String {
    format!("{}{}", folder_prefix(folder), filename)
}

/// Reject keys that could escape a base directory.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Fresh UUID filename carrying `filename`'s (lower-cased) extension.
pub fn random_filename(filename: &str) -> String {
    match extension_of(filename) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// Validate `filename` against `policy` and produce the name to store it under.
///
/// Runs before any backend call so a rejected file never leaves partial state behind.
pub fn upload_filename(
    filename: &str,
    policy: &ExtensionPolicy,
    randomize: bool,
) -> StorageResult<String> {
    if !policy.allows_filename(filename) {
        tracing::debug!(filename = %filename, policy = %policy, "Upload rejected by extension policy");
        return Err(StorageError::FileNotAllowed {
            filename: filename.to_string(),
        });
    }

    let name = if randomize {
        random_filename(filename)
    } else {
        filename.to_string()
    };
    validate_key(&name)?;
    Ok(name)
}

/// Generated `<uuid>.<extension>` name for `save_image`.
pub fn image_filename(extension: &str) -> StorageResult<String> {
    if !IMAGE_UPLOAD_EXTENSIONS.contains(&extension) {
        return Err(StorageError::FileNotAllowed {
            filename: format!("*.{}", extension),
        });
    }
    Ok(format!("{}.{}", Uuid::new_v4(), extension))
}

/// Best-effort Content-Type for an object key, from its extension.
pub fn content_type_for(key: &str) -> &'static str {
    let Some(extension) = extension_of(key) else {
        return "application/octet-stream";
    };

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "rtf" => "application/rtf",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        // Text and data
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        // Archives
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_prefix() {
        assert_eq!(folder_prefix(None), "");
        assert_eq!(folder_prefix(Some("")), "");
        assert_eq!(folder_prefix(Some("avatars")), "avatars/");
        assert_eq!(folder_prefix(Some("avatars/")), "avatars/");
        assert_eq!(folder_prefix(Some("a/b")), "a/b/");
    }

    #[test]
    fn test_object_key() {
        assert_eq!(object_key(Some("avatars"), "photo.png"), "avatars/photo.png");
        assert_eq!(object_key(None, "photo.png"), "photo.png");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("avatars/photo.png").is_ok());
        assert!(validate_key("..hidden.png").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../../etc/passwd").is_err());
    }

    #[test]
    fn test_random_filename_keeps_extension() {
        let name = random_filename("Holiday Photo.PNG");
        assert!(name.ends_with(".png"));
        assert_ne!(name, "Holiday Photo.PNG");
        assert!(Uuid::parse_str(name.trim_end_matches(".png")).is_ok());

        let other = random_filename("Holiday Photo.PNG");
        assert_ne!(name, other);
    }

    #[test]
    fn test_random_filename_without_extension() {
        let name = random_filename("Makefile");
        assert!(Uuid::parse_str(&name).is_ok());
    }

    #[test]
    fn test_upload_filename() {
        let policy: ExtensionPolicy = "png,jpg".parse().unwrap();

        assert_eq!(upload_filename("photo.png", &policy, false).unwrap(), "photo.png");
        assert!(matches!(
            upload_filename("notes.txt", &policy, false),
            Err(StorageError::FileNotAllowed { .. })
        ));
        assert!(matches!(
            upload_filename("../photo.png", &policy, false),
            Err(StorageError::InvalidKey(_))
        ));
        // Randomizing discards the unsafe name entirely
        assert!(upload_filename("../photo.png", &policy, true).is_ok());
    }

    #[test]
    fn test_image_filename() {
        for ext in ["jpg", "jpeg", "png", "webp"] {
            let name = image_filename(ext).unwrap();
            assert!(name.ends_with(&format!(".{}", ext)));
        }
        for ext in ["gif", "PNG", "", "svg"] {
            assert!(matches!(
                image_filename(ext),
                Err(StorageError::FileNotAllowed { .. })
            ));
        }
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("data.json"), "application/json");
        assert_eq!(content_type_for("folder/"), "application/octet-stream");
        assert_eq!(content_type_for("blob.xyz"), "application/octet-stream");
    }
}
