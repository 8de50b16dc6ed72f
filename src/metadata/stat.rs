use std::fs;
use std::path::Path;

use crate::error::{OrganizeError, Result};
use crate::metadata::StatSource;
use crate::types::StatTimes;

/// Filesystem times straight from `std::fs::metadata`
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStat;

impl StatSource for FsStat {
    fn stat_times(&self, path: &Path) -> Result<StatTimes> {
        let metadata = fs::metadata(path).map_err(|source| OrganizeError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        // created() is unsupported on some filesystems; that just drops the tier
        Ok(StatTimes {
            modified: metadata.modified().ok(),
            birth: metadata.created().ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    #[test]
    fn reports_modify_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        fs::write(&path, b"frames").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(1_559_347_200, 0)).unwrap();

        let times = FsStat.stat_times(&path).unwrap();
        assert_eq!(
            times.modified,
            Some(UNIX_EPOCH + Duration::from_secs(1_559_347_200))
        );
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempdir().unwrap();
        let err = FsStat.stat_times(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, OrganizeError::SourceUnavailable { .. }));
    }
}
