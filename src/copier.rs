/*!
 * Content-addressed, idempotent copy into the dated archive
 */

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset};
use filetime::FileTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{OrganizeError, Result};
use crate::types::{CopyOutcome, FileTask};
use crate::utils::lowercase_extension;

/// Delete-and-rewrite attempts allowed before a mismatch is an integrity error
const MAX_REPAIRS: usize = 1;

/// Default number of lock shards
pub const DEFAULT_LOCK_SHARDS: usize = 64;

/// Destination path of a file: `<root>/YYYY/MM/DD/HHMMSS_<md5><ext>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey(PathBuf);

impl DestinationKey {
    /// Compute the key for `content` read from `source`, dated `time`
    pub fn new(root: &Path, time: &DateTime<FixedOffset>, content: &[u8], source: &Path) -> Self {
        let name = format!(
            "{}_{:x}{}",
            time.format("%H%M%S"),
            md5::compute(content),
            lowercase_extension(source)
        );
        Self(
            root.join(time.format("%Y").to_string())
                .join(time.format("%m").to_string())
                .join(time.format("%d").to_string())
                .join(name),
        )
    }

    /// The destination path
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Sharded mutexes serialising work on the same destination key
pub struct KeyLocks {
    shards: Vec<Mutex<()>>,
}

impl KeyLocks {
    /// Create `shards` locks (at least one)
    pub fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, key: &DestinationKey) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let shard = (hasher.finish() % self.shards.len() as u64) as usize;
        // The guarded data is (), so a poisoned lock carries no broken state
        self.shards[shard]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_SHARDS)
    }
}

/// Writes content to a destination path, stamping the given mtime
type WriteFn = dyn Fn(&Path, &[u8], Option<SystemTime>) -> Result<()> + Send + Sync;

/// Copies files into a destination root
pub struct Copier {
    root: PathBuf,
    locks: KeyLocks,
    write: Box<WriteFn>,
}

impl Copier {
    /// Create a copier writing under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: KeyLocks::default(),
            write: Box::new(write_new),
        }
    }

    #[cfg(test)]
    fn with_writer(
        mut self,
        write: impl Fn(&Path, &[u8], Option<SystemTime>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.write = Box::new(write);
        self
    }

    /// Destination root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into the archive under the date of `time`
    ///
    /// An existing destination of the same size counts as already copied. One
    /// of a different size is deleted and the copy starts over, as is a fresh
    /// write whose size comes out wrong. If the destination still disagrees
    /// after that one repair, the copy fails with
    /// [`OrganizeError::CopyIntegrity`].
    pub fn copy_dated(&self, source: &Path, time: &DateTime<FixedOffset>) -> Result<CopyOutcome> {
        self.copy(source, time, None)
    }

    /// Copy a walked file, falling back to its discovery-time mtime when the
    /// source no longer reports one
    pub fn copy_task(&self, task: &FileTask, time: &DateTime<FixedOffset>) -> Result<CopyOutcome> {
        self.copy(&task.path, time, Some(task))
    }

    fn copy(
        &self,
        source: &Path,
        time: &DateTime<FixedOffset>,
        discovered: Option<&FileTask>,
    ) -> Result<CopyOutcome> {
        let unavailable = |source_err: io::Error| OrganizeError::SourceUnavailable {
            path: source.to_path_buf(),
            source: source_err,
        };

        let mut repairs = 0;
        loop {
            let info = fs::metadata(source).map_err(unavailable)?;
            debug!(path = %source.display(), "reading file");
            let content = fs::read(source).map_err(unavailable)?;
            let expected = content.len() as u64;
            if let Some(task) = discovered.filter(|task| task.size != expected) {
                debug!(
                    path = %source.display(),
                    discovered = task.size,
                    current = expected,
                    "source changed since discovery"
                );
            }

            let key = DestinationKey::new(&self.root, time, &content, source);
            let destination = key.path();
            let _guard = self.locks.lock(&key);

            match fs::metadata(destination) {
                Ok(existing) if existing.len() == expected => {
                    info!(destination = %destination.display(), "already exists, no copy required");
                    return Ok(CopyOutcome::AlreadyPresent {
                        destination: destination.to_path_buf(),
                    });
                }
                Ok(existing) => {
                    if repairs >= MAX_REPAIRS {
                        return Err(OrganizeError::CopyIntegrity {
                            path: destination.to_path_buf(),
                            expected,
                            found: existing.len(),
                        });
                    }
                    warn!(
                        destination = %destination.display(),
                        expected,
                        found = existing.len(),
                        "already exists, but integrity check failed; replacing"
                    );
                    fs::remove_file(destination).map_err(|e| write_failed(destination, e))?;
                    repairs += 1;
                    continue;
                }
                // Missing or unreachable; writing below reports any real failure
                Err(_) => {}
            }

            info!(source = %source.display(), destination = %destination.display(), "copying");
            let modified = info
                .modified()
                .ok()
                .or_else(|| discovered.and_then(|task| task.modified));
            (self.write)(destination, &content, modified)?;

            let written = fs::metadata(destination)
                .map_err(|e| write_failed(destination, e))?
                .len();
            if written != expected {
                if repairs >= MAX_REPAIRS {
                    return Err(OrganizeError::CopyIntegrity {
                        path: destination.to_path_buf(),
                        expected,
                        found: written,
                    });
                }
                warn!(
                    destination = %destination.display(),
                    expected,
                    found = written,
                    "written file does not match source; retrying"
                );
                continue;
            }

            let destination = destination.to_path_buf();
            return Ok(if repairs > 0 {
                CopyOutcome::Replaced {
                    destination,
                    bytes: expected,
                }
            } else {
                CopyOutcome::Copied {
                    destination,
                    bytes: expected,
                }
            });
        }
    }
}

fn write_failed(path: &Path, source: io::Error) -> OrganizeError {
    OrganizeError::DestinationWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `content` to a temporary sibling of `destination`, stamp it, then rename it into place
fn write_new(destination: &Path, content: &[u8], modified: Option<SystemTime>) -> Result<()> {
    let parent = destination
        .parent()
        .ok_or_else(|| write_failed(destination, io::Error::other("destination has no parent")))?;
    fs::create_dir_all(parent).map_err(|source| OrganizeError::DirectoryCreateFailed {
        path: parent.to_path_buf(),
        source,
    })?;

    let failed = |e: io::Error| write_failed(destination, e);
    let mut staged = NamedTempFile::new_in(parent).map_err(failed)?;
    staged.write_all(content).map_err(failed)?;
    staged.flush().map_err(failed)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(failed)?;
    }

    if let Some(modified) = modified {
        filetime::set_file_handle_times(
            staged.as_file(),
            Some(FileTime::now()),
            Some(FileTime::from_system_time(modified)),
        )
        .map_err(failed)?;
    }

    staged.persist(destination).map_err(|e| failed(e.error))?;
    Ok(())
}
