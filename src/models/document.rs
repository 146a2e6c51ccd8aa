use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// File extensions the ingestion pipeline can parse.
pub const ACCEPTED_EXTENSIONS: &[&str] =
    &[".pdf", ".epub", ".mobi", ".azw", ".azw3", ".txt", ".md"];

/// Uploads above this size are rejected before any request is made.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A document indexed into the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentInfo {
    pub filename: String,
    /// Number of embedded chunks the document was split into
    #[serde(default)]
    pub chunk_count: u32,
}

impl DocumentInfo {
    /// Check a file against the accepted extensions and size limit.
    pub fn validate_upload(filename: &str, size: u64) -> Result<(), ValidationError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ValidationError::UnsupportedExtension {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    extension
                },
                accepted: ACCEPTED_EXTENSIONS.join(", "),
            });
        }

        if size > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                size_bytes: size,
                limit_bytes: MAX_UPLOAD_BYTES,
            });
        }

        Ok(())
    }

    /// MIME type to report for an accepted file name.
    ///
    /// The Kindle formats have no registered type and go up untyped.
    pub fn mime_for(filename: &str) -> Option<&'static str> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some("application/pdf")
        } else if lower.ends_with(".epub") {
            Some("application/epub+zip")
        } else if lower.ends_with(".txt") {
            Some("text/plain")
        } else if lower.ends_with(".md") {
            Some("text/markdown")
        } else {
            None
        }
    }
}
