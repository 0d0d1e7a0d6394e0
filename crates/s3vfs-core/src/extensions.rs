//! Extension allow-list policy
//!
//! A policy string is a list of tokens separated by `,`, `+` or whitespace. Each token is
//! either the name of an extension group (`images`, `documents`, ...) or a literal
//! extension (`png`, `.pdf`). `any` allows every filename. An empty string selects the
//! `default` group.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

pub const TEXT: &[&str] = &["txt"];
pub const DOCUMENTS: &[&str] = &[
    "rtf", "odf", "ods", "gnumeric", "abw", "doc", "docx", "xls", "xlsx",
];
pub const IMAGES: &[&str] = &["jpg", "jpe", "jpeg", "png", "gif", "svg", "bmp", "tiff", "webp"];
pub const AUDIO: &[&str] = &["wav", "mp3", "aac", "ogg", "oga", "flac"];
pub const DATA: &[&str] = &["csv", "ini", "json", "plist", "xml", "yaml", "yml"];
pub const SCRIPTS: &[&str] = &["js", "php", "pl", "py", "rb", "sh"];
pub const ARCHIVES: &[&str] = &["gz", "bz2", "zip", "tar", "tgz", "txz", "7z"];
pub const EXECUTABLES: &[&str] = &["so", "exe", "dll"];

/// Extensions accepted by `save_image`
pub const IMAGE_UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn group(name: &str) -> Option<Vec<&'static str>> {
    let exts: Vec<&'static str> = match name {
        "text" => TEXT.to_vec(),
        "documents" => DOCUMENTS.to_vec(),
        "images" => IMAGES.to_vec(),
        "audio" => AUDIO.to_vec(),
        "data" => DATA.to_vec(),
        "scripts" => SCRIPTS.to_vec(),
        "archives" => ARCHIVES.to_vec(),
        "executables" => EXECUTABLES.to_vec(),
        "default" => [TEXT, DOCUMENTS, IMAGES, DATA].concat(),
        _ => return None,
    };
    Some(exts)
}

/// Lower-cased extension of `filename` without the dot, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Resolved set of extensions a backend accepts for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    Any,
    Allowed(BTreeSet<String>),
}

impl ExtensionPolicy {
    pub fn allows_extension(&self, extension: &str) -> bool {
        match self {
            ExtensionPolicy::Any => true,
            ExtensionPolicy::Allowed(set) => {
                set.contains(extension.trim_start_matches('.').to_lowercase().as_str())
            }
        }
    }

    /// Check a filename against the policy. Files without an extension only pass `Any`.
    pub fn allows_filename(&self, filename: &str) -> bool {
        match self {
            ExtensionPolicy::Any => true,
            ExtensionPolicy::Allowed(_) => extension_of(filename)
                .map(|ext| self.allows_extension(&ext))
                .unwrap_or(false),
        }
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        "default".parse().unwrap_or(ExtensionPolicy::Any)
    }
}

impl FromStr for ExtensionPolicy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut allowed = BTreeSet::new();

        let tokens: Vec<String> = s
            .split(|c: char| c == ',' || c == '+' || c.is_whitespace())
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        // No tokens selects the default group
        if tokens.is_empty() {
            return Ok(ExtensionPolicy::default());
        }

        for token in tokens {
            if token == "any" {
                return Ok(ExtensionPolicy::Any);
            }
            match group(&token) {
                Some(exts) => allowed.extend(exts.into_iter().map(String::from)),
                None => {
                    allowed.insert(token);
                }
            }
        }

        Ok(ExtensionPolicy::Allowed(allowed))
    }
}

impl Display for ExtensionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExtensionPolicy::Any => write!(f, "any"),
            ExtensionPolicy::Allowed(set) => {
                let list: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}
