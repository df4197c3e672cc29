//! Error taxonomy for a sync run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while syncing recordings.
///
/// Everything except [`SyncError::Download`] aborts the run. Download
/// failures are logged by the pipeline and processing moves on.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to list {resource}: {message}")]
    Listing {
        resource: String,
        status: Option<u16>,
        message: String,
    },

    #[error("invalid value: {0}")]
    Validation(String),

    #[error("failed to download {url}: {message}")]
    Download {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("cache file {} is unusable: {message}", .path.display())]
    CacheCorrupt { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
