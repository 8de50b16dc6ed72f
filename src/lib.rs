/*!
 * mediasort - Copy photos and videos into a date-organized archive
 *
 * This library walks a source tree, dates every file from its embedded
 * capture metadata (or filesystem times when there is none) and copies it
 * into `<dst>/YYYY/MM/DD/HHMMSS_<md5><ext>`, skipping content that is
 * already archived.
 */

pub mod config;
pub mod copier;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod types;
pub mod utils;
pub mod walker;

#[cfg(test)]
mod testing;

// Re-export main components for easier access
pub use config::{Args, Config, MetadataFailurePolicy};
pub use copier::{Copier, DestinationKey};
pub use error::{OrganizeError, Result, TaskFailure};
pub use metadata::{ExifToolPool, FsStat, MetadataSource, StatSource};
pub use pipeline::PipelineContext;
pub use report::{ReportFormat, Reporter, RunReport};
pub use resolver::Resolver;
pub use types::{CopyOutcome, FileTask, ResolvedTimestamp, StatTimes, TimestampSource};
pub use walker::{Discovery, Walker};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
