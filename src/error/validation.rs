//! Input and configuration errors caught before any request is made.

use std::path::PathBuf;

use thiserror::Error;

/// User input rejected locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type {extension}; accepted: {accepted}")]
    UnsupportedExtension { extension: String, accepted: String },

    #[error("File is {size_bytes} bytes; the limit is {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("Invalid date '{input}', expected YYYY-MM-DD")]
    InvalidDate { input: String },
}

/// Configuration that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
