//! Centralized error types for mailpdf.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailpdf library.
///
/// Only setup failures (archive, output root, backend start) are meant to
/// reach the caller of a run. Folder, message and attachment failures are
/// caught at their stage boundary and surface as warnings and counters.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive path does not exist.
    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// The archive was attached but the mail session cannot see it.
    #[error("Archive could not be located after attaching it: {0}")]
    ArchiveNotLocated(PathBuf),

    /// The output root could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mail store refused an operation (corrupt folder, unreadable message, ...).
    #[error("Mail store error: {0}")]
    Store(String),

    /// The rendering backend failed.
    #[error("Rendering backend error: {0}")]
    Backend(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a store error with a formatted message.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Shorthand for a backend error with a formatted message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ExportError`
/// when no path context is available (rare, prefer `ExportError::io`).
impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
