/*!
 * Collaborators that report candidate timestamps for a file
 *
 * Embedded capture fields come from a [`MetadataSource`], filesystem times
 * from a [`StatSource`]. Both are traits so the resolver can be driven by
 * stubs in tests.
 */

mod exiftool_pool;
mod stat;

use std::path::Path;

pub use exiftool_pool::ExifToolPool;
pub use stat::FsStat;

use crate::error::Result;
use crate::types::{StatTimes, TimestampFields};

/// Metadata tags consulted by the resolver, highest priority first
pub const TIMESTAMP_FIELDS: [&str; 3] = ["CreateDate", "ModifyDate", "FileModifyDate"];

/// Source of embedded timestamp fields
pub trait MetadataSource: Send + Sync {
    /// Extract candidate timestamp fields for `path`
    fn extract_timestamp_fields(&self, path: &Path) -> Result<TimestampFields>;
}

/// Source of filesystem timestamps
pub trait StatSource: Send + Sync {
    /// Modification and (optional) birth time for `path`
    fn stat_times(&self, path: &Path) -> Result<StatTimes>;
}
