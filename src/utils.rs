/*!
 * Utility functions for mediasort
 */

use std::path::Path;

use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Default log filter when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "mediasort=info";

/// Initialise stderr logging; `RUST_LOG` takes precedence over `verbose`
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "mediasort=debug"
        } else {
            DEFAULT_LOG_FILTER
        })
    });

    // A second init (e.g. from tests) is harmless, so the error is dropped
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Count non-directory entries for progress tracking
pub fn count_files(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_dir())
        .count() as u64
}

/// Everything from the last `.` of the file name, lowercased; empty if there is none
///
/// Dotfiles count as all extension, so `.DS_Store` gives `.ds_store`.
pub fn lowercase_extension(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    let name = name.to_string_lossy();
    name.rfind('.')
        .map(|dot| name[dot..].to_lowercase())
        .unwrap_or_default()
}

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(lowercase_extension(Path::new("/a/IMG_1.JPG")), ".jpg");
        assert_eq!(lowercase_extension(Path::new("clip.Mov")), ".mov");
        assert_eq!(lowercase_extension(Path::new("archive.tar.GZ")), ".gz");
        assert_eq!(lowercase_extension(Path::new("README")), "");
        assert_eq!(lowercase_extension(Path::new("/backup/.DS_Store")), ".ds_store");
        assert_eq!(lowercase_extension(Path::new("trailing.")), ".");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn counts_only_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("one.jpg"), b"1").unwrap();
        fs::write(dir.path().join("a/b/two.jpg"), b"2").unwrap();
        assert_eq!(count_files(dir.path()), 2);
    }
}
