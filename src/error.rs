//! Centralized error types for process-pst.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the process-pst library.
#[derive(Error, Debug)]
pub enum PstError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox file does not exist.
    #[error("Mailbox not found: {0}")]
    MailboxNotFound(PathBuf),

    /// The file could not be opened as a mailbox container.
    #[error("Could not open mailbox '{path}': {reason}")]
    InvalidMailbox { path: PathBuf, reason: String },

    /// An item inside the mailbox could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The output directory is already present; exports never merge.
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),

    /// A recipient row carries a type other than To, CC or BCC.
    #[error("Unknown recipient type {0}")]
    UnknownRecipientType(i32),

    /// The read-back worker pool could not be started.
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Writing the XML loadfile failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Convenience alias for `Result<T, PstError>`.
pub type Result<T> = std::result::Result<T, PstError>;

impl PstError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Decode` variant from anything printable.
    pub fn decode(reason: impl std::fmt::Display) -> Self {
        Self::Decode(reason.to_string())
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `PstError::io`).
impl From<std::io::Error> for PstError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
