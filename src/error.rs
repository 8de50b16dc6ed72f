//! Global error handling for mediasort
//!
//! Every failure a file can hit on its way from the source tree into the
//! archive maps to one variant here. Per-file failures are collected by the
//! pipeline into [`OrganizeError::Failed`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Global error type for mediasort operations
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// Source file could not be stat'ed or read
    #[error("source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing, renaming or stamping the destination file failed
    #[error("failed to write {}: {source}", .path.display())]
    DestinationWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Destination directories could not be created
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The metadata extractor failed for a file
    #[error("metadata extraction failed for {}: {reason}", .path.display())]
    MetadataExtractionFailed { path: PathBuf, reason: String },

    /// The metadata extractor could not be started at all
    #[error("metadata extractor unavailable: {0}")]
    MetadataInit(String),

    /// Neither metadata nor filesystem times produced a timestamp
    #[error("could not resolve a timestamp for {}: {reason}", .path.display())]
    TimestampUnresolved { path: PathBuf, reason: String },

    /// The directory traversal itself failed
    #[error("walk failed: {0}")]
    WalkFailed(#[from] walkdir::Error),

    /// Destination still disagrees with the source after a delete and rewrite
    #[error(
        "integrity check failed for {}: expected {expected} bytes, found {found}",
        .path.display()
    )]
    CopyIntegrity {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// One or more files failed during a run
    #[error("{} file(s) failed, first: {}", .failures.len(), first_failure(.failures))]
    Failed { failures: Vec<TaskFailure> },
}

/// Specialized Result type for mediasort operations
pub type Result<T> = std::result::Result<T, OrganizeError>;

/// A single per-file failure recorded by the pipeline
#[derive(Debug)]
pub struct TaskFailure {
    /// Path being processed, if the failure is tied to one
    pub path: Option<PathBuf>,
    /// What went wrong
    pub error: OrganizeError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

fn first_failure(failures: &[TaskFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

impl OrganizeError {
    /// Failures collected by the pipeline, empty for any other variant
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            OrganizeError::Failed { failures } => failures,
            _ => &[],
        }
    }
}

// Allow converting OrganizeError to io::Error for the binary's main
impl From<OrganizeError> for io::Error {
    fn from(err: OrganizeError) -> Self {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    }
}
