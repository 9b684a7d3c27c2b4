//! Acceptance rules for uploaded documents.
//!
//! The same rule runs on the server (inside the upload handler) and in the clients before a
//! request is ever sent, so a file the client keeps is a file the server will take.

use mime_guess::mime;
use serde::{Deserialize, Serialize};

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = ["application/pdf", "text/plain"];

/// Filename extensions accepted under [`TypePolicy::Permissive`] (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 2] = [".pdf", ".txt"];

/// Message returned to callers when a file is refused because of its type.
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Only .txt and .pdf files are allowed";

/// How strictly the declared type of an upload is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypePolicy {
    /// Accept when either the declared content type or the filename extension matches.
    #[default]
    Permissive,
    /// Accept on the declared content type alone.
    Strict,
}

impl TypePolicy {
    /// Decide whether a file with this declared content type and name may be stored.
    pub fn allows(self, content_type: Option<&str>, filename: &str) -> bool {
        let type_ok = content_type.is_some_and(is_allowed_content_type);
        match self {
            TypePolicy::Strict => type_ok,
            TypePolicy::Permissive => type_ok || has_allowed_extension(filename),
        }
    }
}

/// Compare on the MIME essence, so `text/plain; charset=utf-8` counts as `text/plain`.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_ascii_lowercase(),
        Err(_) => content_type.trim().to_ascii_lowercase(),
    };
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

pub fn has_allowed_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
