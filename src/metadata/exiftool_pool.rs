/*!
 * Metadata extraction through a pool of persistent `exiftool` processes
 *
 * Each handle keeps one `exiftool -stay_open` process alive, so a file costs
 * a round trip over a pipe rather than a Perl start-up. Handles are checked
 * out per call; the pool holds one per worker.
 */

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ::exiftool::ExifTool;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{OrganizeError, Result};
use crate::metadata::{MetadataSource, TIMESTAMP_FIELDS};
use crate::types::TimestampFields;

/// Pool of persistent exiftool processes
#[derive(Debug)]
pub struct ExifToolPool {
    binary: PathBuf,
    idle: Mutex<Vec<ExifTool>>,
}

impl ExifToolPool {
    /// Check `binary -ver` runs, then start `size` persistent processes
    pub fn new(binary: impl Into<PathBuf>, size: usize) -> Result<Self> {
        let binary = binary.into();
        let output = Command::new(&binary).arg("-ver").output().map_err(|e| {
            OrganizeError::MetadataInit(format!("cannot run {}: {}", binary.display(), e))
        })?;

        if !output.status.success() {
            return Err(OrganizeError::MetadataInit(format!(
                "{} -ver exited with {}",
                binary.display(),
                output.status
            )));
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            size,
            "exiftool available, starting pool"
        );

        let handles = (0..size.max(1))
            .map(|_| spawn(&binary))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            binary,
            idle: Mutex::new(handles),
        })
    }

    /// Number of idle handles
    pub fn idle(&self) -> usize {
        self.lock_idle().len()
    }

    fn checkout(&self) -> Result<ExifTool> {
        match self.lock_idle().pop() {
            Some(handle) => Ok(handle),
            None => spawn(&self.binary),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<ExifTool>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn spawn(binary: &Path) -> Result<ExifTool> {
    ExifTool::with_executable(binary).map_err(|e| {
        OrganizeError::MetadataInit(format!("cannot start {}: {}", binary.display(), e))
    })
}

impl MetadataSource for ExifToolPool {
    fn extract_timestamp_fields(&self, path: &Path) -> Result<TimestampFields> {
        let args: Vec<String> = TIMESTAMP_FIELDS.iter().map(|f| format!("-{f}")).collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let mut handle = self.checkout()?;
        match handle.json(path, &args) {
            Ok(record) => {
                self.lock_idle().push(handle);
                Ok(timestamp_fields(&record))
            }
            Err(e) => {
                // The process may be wedged; let it go and start a fresh one next time
                warn!(path = %path.display(), error = %e, "dropping exiftool process");
                Err(OrganizeError::MetadataExtractionFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Pull the timestamp tags out of an exiftool JSON record
///
/// Accepts a bare record or a one-element array, with plain tag names,
/// `Group:Tag` names, or tags nested under group objects. Empty strings and
/// non-string values are dropped.
pub(crate) fn timestamp_fields(record: &Value) -> TimestampFields {
    let record = match record {
        Value::Array(records) => records.first().unwrap_or(&Value::Null),
        other => other,
    };
    let Some(object) = record.as_object() else {
        return TimestampFields::new();
    };

    TIMESTAMP_FIELDS
        .iter()
        .filter_map(|field| {
            let suffix = format!(":{field}");
            let value = object
                .get(*field)
                .or_else(|| {
                    object
                        .iter()
                        .find(|(key, _)| key.ends_with(&suffix))
                        .map(|(_, v)| v)
                })
                .or_else(|| object.values().find_map(|group| group.get(*field)))?
                .as_str()?
                .trim();
            (!value.is_empty()).then(|| (field.to_string(), value.to_string()))
        })
        .collect()
}
