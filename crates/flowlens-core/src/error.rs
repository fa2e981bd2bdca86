//! Error types for document loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while loading a metadata document.
///
/// Only whole-document failures surface here. Problems inside a single
/// file record (missing step, missing columns, dangling inputs) are
/// absorbed by defaults and never become errors.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DocumentError {
    /// Creates an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
