//! Error types surfaced at the persistence and import boundaries
//!
//! Navigation and editing guards never produce errors; they are no-ops.
//! Only IO, parsing and validation failures reach the caller.

use std::path::PathBuf;

/// Errors returned by the presenter library
#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    /// Reading or writing a file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or song file was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but does not describe a valid presentation
    #[error("invalid presentation document: {0}")]
    InvalidDocument(String),

    /// A song file could not be turned into a usable song
    #[error("failed to import song {path:?}: {reason}")]
    SongImport { path: PathBuf, reason: String },

    /// The song file extension is not one we know how to parse
    #[error("unsupported song format: {0}")]
    UnsupportedSongFormat(String),
}

impl PresenterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PresenterError>;
