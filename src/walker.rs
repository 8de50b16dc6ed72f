/*!
 * Recursive discovery of files under the source root
 */

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::types::FileTask;

/// Something found while walking the source tree
#[derive(Debug, Clone)]
pub enum Discovery {
    /// A directory; produces no work
    Directory(PathBuf),
    /// Any non-directory entry, to be processed
    File(FileTask),
}

/// Depth-first walker over a source root
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Create a walker rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every entry under the root, depth-first, siblings in file-name order
    ///
    /// Symlinks are not followed; a link is reported as a file. Traversal
    /// errors are yielded per entry as [`OrganizeError::WalkFailed`] and the
    /// walk carries on with the next entry; whether that aborts the run is
    /// up to the consumer.
    ///
    /// [`OrganizeError::WalkFailed`]: crate::error::OrganizeError::WalkFailed
    pub fn entries(&self) -> impl Iterator<Item = Result<Discovery>> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| discover(entry?))
    }
}

fn discover(entry: DirEntry) -> Result<Discovery> {
    if entry.file_type().is_dir() {
        debug!(path = %entry.path().display(), "found directory");
        return Ok(Discovery::Directory(entry.into_path()));
    }

    debug!(path = %entry.path().display(), "found file");
    let metadata = entry.metadata()?;
    Ok(Discovery::File(FileTask {
        size: metadata.len(),
        modified: metadata.modified().ok(),
        path: entry.into_path(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn emits_files_and_directories_depth_first() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("2019/trip")).unwrap();
        fs::write(root.join("2019/trip/b.jpg"), b"bb").unwrap();
        fs::write(root.join("2019/a.jpg"), b"a").unwrap();
        fs::write(root.join("z.mov"), b"zzz").unwrap();

        let found: Vec<Discovery> = Walker::new(root)
            .entries()
            .collect::<Result<_>>()
            .unwrap();

        let files: Vec<(PathBuf, u64)> = found
            .iter()
            .filter_map(|d| match d {
                Discovery::File(task) => Some((task.path.clone(), task.size)),
                Discovery::Directory(_) => None,
            })
            .collect();
        assert_eq!(
            files,
            vec![
                (root.join("2019/a.jpg"), 1),
                (root.join("2019/trip/b.jpg"), 2),
                (root.join("z.mov"), 3),
            ]
        );

        let dirs = found
            .iter()
            .filter(|d| matches!(d, Discovery::Directory(_)))
            .count();
        // root, 2019, 2019/trip
        assert_eq!(dirs, 3);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("real.jpg"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.jpg"), dir.path().join("link.jpg"))
            .unwrap();

        let files = Walker::new(dir.path())
            .entries()
            .filter_map(|d| match d.unwrap() {
                Discovery::File(task) => Some(task.path),
                Discovery::Directory(_) => None,
            })
            .count();
        assert_eq!(files, 2);
    }

    #[test]
    fn missing_root_yields_walk_error() {
        let dir = tempdir().unwrap();
        let results: Vec<_> = Walker::new(dir.path().join("absent")).entries().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(crate::error::OrganizeError::WalkFailed(_))
        ));
    }
}
