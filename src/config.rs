/*!
 * Configuration handling for mediasort
 */

use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use clap::{Parser, ValueEnum};
use clap_complete::Shell;

use crate::error::{OrganizeError, Result};

/// What to do when the metadata extractor fails for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MetadataFailurePolicy {
    /// Log it and date the file from filesystem times (default)
    #[default]
    Fallback,
    /// Log it and leave the file out of the archive
    Skip,
    /// Treat it as a failure of that file
    Abort,
}

/// Command-line arguments for mediasort
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "mediasort",
    version = env!("CARGO_PKG_VERSION"),
    about = "Copy photos and videos into a date-organized archive",
    long_about = "Recursively scans a source directory, dates every file from its embedded capture metadata (falling back to filesystem times) and copies it to <dst>/YYYY/MM/DD/HHMMSS_<md5><ext>. Re-running is safe: files already in the archive are left alone."
)]
pub struct Args {
    /// Directory to recursively scan for files
    #[clap(long, required_unless_present = "generate")]
    pub src: Option<PathBuf>,

    /// Directory to copy files into
    #[clap(long, required_unless_present = "generate")]
    pub dst: Option<PathBuf>,

    /// Number of worker threads (default: available parallelism)
    #[clap(long)]
    pub workers: Option<usize>,

    /// Path to the exiftool binary
    #[clap(long, default_value = "exiftool")]
    pub exiftool: PathBuf,

    /// What to do when metadata extraction fails for a file
    #[clap(long, value_enum, default_value_t = MetadataFailurePolicy::default())]
    pub on_metadata_error: MetadataFailurePolicy,

    /// Keep processing after a file fails and report all failures at the end
    #[clap(long)]
    pub keep_going: bool,

    /// Show a progress bar
    #[clap(long)]
    pub progress: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[clap(short, long)]
    pub verbose: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Root to scan
    pub src: PathBuf,

    /// Root to write into
    pub dst: PathBuf,

    /// Number of concurrent workers
    pub workers: usize,

    /// Metadata extractor binary
    pub exiftool: PathBuf,

    /// Metadata failure policy
    pub metadata_policy: MetadataFailurePolicy,

    /// Continue past per-file failures instead of stopping at the first
    pub keep_going: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let missing = |flag: &str| OrganizeError::Config(format!("--{flag} is required"));

        Ok(Self {
            src: args.src.ok_or_else(|| missing("src"))?,
            dst: args.dst.ok_or_else(|| missing("dst"))?,
            workers: args.workers.unwrap_or_else(default_workers),
            exiftool: args.exiftool,
            metadata_policy: args.on_metadata_error,
            keep_going: args.keep_going,
        })
    }

    /// Configuration with defaults for everything but the two roots
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            workers: default_workers(),
            exiftool: PathBuf::from("exiftool"),
            metadata_policy: MetadataFailurePolicy::default(),
            keep_going: false,
        }
    }

    /// Validate the configuration
    ///
    /// The source must be an existing directory and the destination must not
    /// live inside it, or the walk would pick up its own output.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(OrganizeError::Config(
                "workers must be at least 1".to_string(),
            ));
        }

        if !self.src.is_dir() {
            return Err(OrganizeError::Config(format!(
                "source directory not found: {}",
                self.src.display()
            )));
        }

        if self.dst.exists() && !self.dst.is_dir() {
            return Err(OrganizeError::Config(format!(
                "destination is not a directory: {}",
                self.dst.display()
            )));
        }

        let src = fs::canonicalize(&self.src).map_err(|e| {
            OrganizeError::Config(format!("cannot resolve {}: {}", self.src.display(), e))
        })?;
        if let Some(dst) = canonical_or_parent(&self.dst) {
            if dst.starts_with(&src) {
                return Err(OrganizeError::Config(format!(
                    "destination {} is inside source {}",
                    self.dst.display(),
                    self.src.display()
                )));
            }
        }

        Ok(())
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Canonical form of `path`, resolving through its nearest existing ancestor
fn canonical_or_parent(path: &std::path::Path) -> Option<PathBuf> {
    let mut suffix = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = fs::canonicalize(current) {
            return Some(suffix.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        suffix.push(current.file_name()?.to_os_string());
        current = current.parent()?;
        if current.as_os_str().is_empty() {
            current = std::path::Path::new(".");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_flags() {
        let args = Args::parse_from([
            "mediasort",
            "--src",
            "/photos",
            "--dst",
            "/archive",
            "--workers",
            "3",
            "--on-metadata-error",
            "skip",
            "--keep-going",
        ]);
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.src, PathBuf::from("/photos"));
        assert_eq!(config.dst, PathBuf::from("/archive"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.metadata_policy, MetadataFailurePolicy::Skip);
        assert!(config.keep_going);
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["mediasort", "--src", "a", "--dst", "b"]);
        let config = Config::from_args(args).unwrap();

        assert!(config.workers >= 1);
        assert_eq!(config.exiftool, PathBuf::from("exiftool"));
        assert_eq!(config.metadata_policy, MetadataFailurePolicy::Fallback);
        assert!(!config.keep_going);
    }

    #[test]
    fn src_and_dst_are_required() {
        assert!(Args::try_parse_from(["mediasort", "--src", "a"]).is_err());
        assert!(Args::try_parse_from(["mediasort", "--dst", "b"]).is_err());
        assert!(Args::try_parse_from(["mediasort", "--generate", "bash"]).is_ok());
    }

    #[test]
    fn validate_rejects_bad_setups() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();

        let ok = Config::new(&src, dir.path().join("archive"));
        assert!(ok.validate().is_ok());

        let missing = Config::new(dir.path().join("nope"), dir.path().join("archive"));
        assert!(missing.validate().is_err());

        let nested = Config::new(&src, src.join("out/archive"));
        assert!(nested.validate().is_err());

        let mut zero = Config::new(&src, dir.path().join("archive"));
        zero.workers = 0;
        assert!(zero.validate().is_err());
    }
}
