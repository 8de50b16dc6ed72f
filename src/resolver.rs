/*!
 * Timestamp resolution
 *
 * A file's timestamp comes from the first tier that yields one:
 *
 * 1. embedded metadata fields, in [`TIMESTAMP_FIELDS`] order
 * 2. filesystem birth time
 * 3. filesystem modification time
 */

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::MetadataFailurePolicy;
use crate::error::{OrganizeError, Result};
use crate::metadata::{MetadataSource, StatSource, TIMESTAMP_FIELDS};
use crate::types::{ResolvedTimestamp, TimestampFields, TimestampSource};

/// Layout with an explicit zone offset, tried first; fractional seconds optional
const LAYOUT_WITH_OFFSET: &str = "%Y:%m:%d %H:%M:%S%.f%:z";
/// Layout without offset; values are taken as UTC
const LAYOUT_WITHOUT_OFFSET: &str = "%Y:%m:%d %H:%M:%S%.f";

/// Resolves the capture time of a file
#[derive(Clone)]
pub struct Resolver {
    metadata: Arc<dyn MetadataSource>,
    stat: Arc<dyn StatSource>,
    policy: MetadataFailurePolicy,
}

impl Resolver {
    /// Create a resolver over the given collaborators
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        stat: Arc<dyn StatSource>,
        policy: MetadataFailurePolicy,
    ) -> Self {
        Self {
            metadata,
            stat,
            policy,
        }
    }

    /// Resolve the timestamp of `path`
    ///
    /// Returns `Ok(None)` only when metadata extraction failed and the policy
    /// is [`MetadataFailurePolicy::Skip`].
    pub fn resolve(&self, path: &Path) -> Result<Option<ResolvedTimestamp>> {
        let fields = match self.metadata.extract_timestamp_fields(path) {
            Ok(fields) => fields,
            Err(err) => match self.policy {
                MetadataFailurePolicy::Fallback => {
                    warn!(path = %path.display(), error = %err, "metadata unavailable, using filesystem times");
                    TimestampFields::new()
                }
                MetadataFailurePolicy::Skip => {
                    warn!(path = %path.display(), error = %err, "metadata unavailable, skipping file");
                    return Ok(None);
                }
                MetadataFailurePolicy::Abort => return Err(err),
            },
        };

        if let Some(resolved) = from_fields(&fields) {
            return Ok(Some(resolved));
        }
        if !fields.is_empty() {
            debug!(path = %path.display(), ?fields, "no parseable metadata timestamp");
        }

        let unresolved = |reason: String| OrganizeError::TimestampUnresolved {
            path: path.to_path_buf(),
            reason,
        };
        let times = self
            .stat
            .stat_times(path)
            .map_err(|e| unresolved(e.to_string()))?;

        let resolved = match (times.birth, times.modified) {
            (Some(birth), _) => ResolvedTimestamp {
                time: local_time(birth),
                source: TimestampSource::BirthTime,
            },
            (None, Some(modified)) => ResolvedTimestamp {
                time: local_time(modified),
                source: TimestampSource::ModifyTime,
            },
            (None, None) => {
                return Err(unresolved(
                    "no metadata and no filesystem times".to_string(),
                ))
            }
        };
        Ok(Some(resolved))
    }
}

/// First field, in priority order, whose value parses
fn from_fields(fields: &TimestampFields) -> Option<ResolvedTimestamp> {
    TIMESTAMP_FIELDS.iter().find_map(|field| {
        let value = fields.get(*field)?;
        let time = parse_timestamp(value)?;
        Some(ResolvedTimestamp {
            time,
            source: TimestampSource::Metadata(field.to_string()),
        })
    })
}

/// Parse an exiftool date string, with or without a zone offset
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let zoned = match value.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };
    DateTime::parse_from_str(&zoned, LAYOUT_WITH_OFFSET)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, LAYOUT_WITHOUT_OFFSET)
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

fn local_time(time: SystemTime) -> DateTime<FixedOffset> {
    DateTime::<Local>::from(time).fixed_offset()
}
