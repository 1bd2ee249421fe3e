//! Error types for the file and catalog boundary.

use std::path::PathBuf;

/// Errors that can occur while loading, extracting or writing schemas.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error (reading/writing schema or SQL files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A declared or snapshot file could not be parsed.
    #[error("Failed to parse '{path}': {message}")]
    ParseError {
        /// Path to the file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The schema directory does not exist or is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// The schema directory holds both YAML and JSON files.
    #[error("Mixed YAML and JSON files in schema directory {0}")]
    MixedFormats(PathBuf),

    /// The schema directory holds neither YAML nor JSON files.
    #[error("No YAML or JSON files found in {0}")]
    NoSchemaFiles(PathBuf),

    /// Two declared files describe the same schema.
    #[error("Schema '{name}' is declared in both '{first}' and '{second}'")]
    DuplicateSchema {
        /// Schema name.
        name: String,
        /// File that declared it first.
        first: PathBuf,
        /// File that declared it again.
        second: PathBuf,
    },

    /// No snapshot exists for the requested catalog.
    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),

    /// Output to stdout needs exactly one schema.
    #[error("--output-dir is required when extracting {0} schemas")]
    AmbiguousOutput(usize),
}

impl SyncError {
    /// Returns true for errors caused by how the tool was invoked.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::NotADirectory(_) | Self::MixedFormats(_) | Self::NoSchemaFiles(_)
        )
    }
}

/// Result type for boundary operations.
pub type Result<T> = std::result::Result<T, SyncError>;
