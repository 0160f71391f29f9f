//! The one error type shared by every comicshelf crate.
//!
//! Variants stay coarse enough that a front end can map them onto a status
//! code with [`Error::http_status`] without matching on message text.

use std::fmt;
use std::path::Path;

/// Failures raised by the archive reader, scanner, store and service layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lookup by id missed.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// "issue", "series", "scan run" and so on.
        entity: String,
        id: String,
    },

    /// The file is not a supported comic container, or it is corrupt.
    #[error("Unreadable archive {path}: {reason}")]
    UnreadableArchive {
        /// Path of the archive on disk.
        path: String,
        /// What went wrong while opening or reading it.
        reason: String,
    },

    /// A page index outside the archive's page list was requested.
    #[error("Page {index} not found (archive has {page_count} pages)")]
    PageNotFound {
        /// The requested zero-based page index.
        index: usize,
        /// Number of pages the archive actually has.
        page_count: usize,
    },

    /// A configured library root is missing or cannot be read.
    #[error("Library root unavailable {path}: {reason}")]
    RootDirectoryUnavailable {
        /// The root directory that failed.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// Two discovered files claimed the same issue during reconciliation.
    #[error("Reconciliation conflict: {0}")]
    ReconciliationConflict(String),

    /// A scan is already in progress; the trigger was a no-op.
    #[error("A library scan is already running")]
    ScanAlreadyRunning,

    /// Bad caller input or configuration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// rusqlite, r2d2 or row-mapping failure.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem failure outside archive decoding.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A worker panicked or an invariant broke.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code a front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::PageNotFound { .. } => 404,
            Error::UnreadableArchive { .. } => 422,
            Error::RootDirectoryUnavailable { .. } => 503,
            Error::ReconciliationConflict(_) => 409,
            Error::ScanAlreadyRunning => 409,
            Error::Validation(_) => 400,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// True for errors that describe a missing resource rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::PageNotFound { .. })
    }

    /// `not_found("issue", id)` reads better than the struct literal.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Tag a decode failure with the archive it came from.
    pub fn unreadable(path: &Path, reason: impl fmt::Display) -> Self {
        Error::UnreadableArchive {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn root_unavailable(path: &Path, reason: impl fmt::Display) -> Self {
        Error::RootDirectoryUnavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
