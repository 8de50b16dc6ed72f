/*!
 * Integration tests for the public library API and the binary
 */

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use indicatif::ProgressBar;
use tempfile::tempdir;

use mediasort::{
    Config, FsStat, MetadataSource, OrganizeError, PipelineContext, Result, StatSource, StatTimes,
};

/// Every file claims the same capture time
struct FixedDate(&'static str);

impl MetadataSource for FixedDate {
    fn extract_timestamp_fields(&self, _path: &Path) -> Result<std::collections::HashMap<String, String>> {
        Ok([("CreateDate".to_string(), self.0.to_string())].into())
    }
}

/// No filesystem times at all
struct NoTimes;

impl StatSource for NoTimes {
    fn stat_times(&self, _path: &Path) -> Result<StatTimes> {
        Ok(StatTimes {
            modified: None,
            birth: None,
        })
    }
}

fn run(
    src: &Path,
    dst: &Path,
    metadata: impl MetadataSource + 'static,
    stat: impl StatSource + 'static,
) -> Result<mediasort::RunReport> {
    PipelineContext::new(
        Config::new(src, dst),
        Arc::new(metadata),
        Arc::new(stat),
        Arc::new(ProgressBar::hidden()),
    )?
    .run()
}

#[test]
fn organizes_with_zoned_metadata() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::create_dir(src.path().join("card")).unwrap();
    fs::write(src.path().join("card/DSC0001.NEF"), b"raw sensor data").unwrap();

    let report = run(
        src.path(),
        dst.path(),
        FixedDate("2022:07:14 21:30:00+02:00"),
        FsStat,
    )
    .unwrap();
    assert_eq!(report.copied, 1);

    let day = dst.path().join("2022/07/14");
    let names: Vec<String> = fs::read_dir(&day)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("213000_"));
    assert!(names[0].ends_with(".nef"));
}

#[test]
fn unresolvable_file_fails_the_run() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::write(src.path().join("mystery.bin"), b"?").unwrap();

    let err = run(src.path(), dst.path(), FixedDate("not a date"), NoTimes).unwrap_err();
    match err {
        OrganizeError::Failed { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(
                failures[0].error,
                OrganizeError::TimestampUnresolved { .. }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn binary_requires_src_and_dst() {
    let output = Command::new(env!("CARGO_BIN_EXE_mediasort"))
        .arg("--src")
        .arg("/tmp")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--dst"));
}

#[test]
fn binary_generates_completions() {
    let output = Command::new(env!("CARGO_BIN_EXE_mediasort"))
        .args(["--generate", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("mediasort"));
}

#[test]
fn binary_rejects_missing_source() {
    let dst = tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_mediasort"))
        .arg("--src")
        .arg(dst.path().join("does-not-exist"))
        .arg("--dst")
        .arg(dst.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
