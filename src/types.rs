/*!
 * Core types and data structures for mediasort
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset};

/// One discovered file awaiting timestamp resolution and copy
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Absolute source path
    pub path: PathBuf,
    /// Size in bytes at discovery time
    pub size: u64,
    /// Modification time at discovery time
    pub modified: Option<SystemTime>,
}

/// Candidate timestamp fields reported by the metadata extractor, keyed by tag name
pub type TimestampFields = HashMap<String, String>;

/// Filesystem times for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatTimes {
    /// Last modification time
    pub modified: Option<SystemTime>,
    /// Creation time, when the platform and filesystem report one
    pub birth: Option<SystemTime>,
}

/// Which tier produced a resolved timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampSource {
    /// An embedded metadata field, by tag name
    Metadata(String),
    /// Filesystem creation time
    BirthTime,
    /// Filesystem modification time
    ModifyTime,
}

/// The best-guess capture time for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    /// The point in time, with the offset it was expressed in
    pub time: DateTime<FixedOffset>,
    /// Where it came from
    pub source: TimestampSource,
}

/// What a copy operation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Destination was absent and has been written
    Copied { destination: PathBuf, bytes: u64 },
    /// Destination already held a file of the same size
    AlreadyPresent { destination: PathBuf },
    /// A stale destination was deleted and rewritten
    Replaced { destination: PathBuf, bytes: u64 },
}

impl CopyOutcome {
    /// Destination path touched by the operation
    pub fn destination(&self) -> &PathBuf {
        match self {
            CopyOutcome::Copied { destination, .. }
            | CopyOutcome::AlreadyPresent { destination }
            | CopyOutcome::Replaced { destination, .. } => destination,
        }
    }
}

/// What happened to a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The file went through the copy operation
    Copy(CopyOutcome),
    /// The file was skipped by policy
    Skipped,
}
