//! Stub collaborators shared by the unit tests

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{OrganizeError, Result};
use crate::metadata::{FsStat, MetadataSource, StatSource};
use crate::types::{StatTimes, TimestampFields};

pub fn fields(pairs: &[(&str, &str)]) -> TimestampFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Metadata keyed by file name; unknown files have no fields
#[derive(Default)]
pub struct MapMetadata {
    by_name: HashMap<String, TimestampFields>,
}

impl MapMetadata {
    pub fn with(mut self, name: &str, fields: TimestampFields) -> Self {
        self.by_name.insert(name.to_string(), fields);
        self
    }
}

impl MetadataSource for MapMetadata {
    fn extract_timestamp_fields(&self, path: &Path) -> Result<TimestampFields> {
        Ok(self.by_name.get(&file_name(path)).cloned().unwrap_or_default())
    }
}

/// Extractor that always fails
pub struct FailingMetadata;

impl MetadataSource for FailingMetadata {
    fn extract_timestamp_fields(&self, path: &Path) -> Result<TimestampFields> {
        Err(OrganizeError::MetadataExtractionFailed {
            path: path.to_path_buf(),
            reason: "corrupt header".to_string(),
        })
    }
}

/// Filesystem times keyed by file name; unknown files use the real filesystem
#[derive(Default)]
pub struct MapStat {
    by_name: HashMap<String, StatTimes>,
    failing: HashSet<String>,
}

impl MapStat {
    pub fn with(mut self, name: &str, times: StatTimes) -> Self {
        self.by_name.insert(name.to_string(), times);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl StatSource for MapStat {
    fn stat_times(&self, path: &Path) -> Result<StatTimes> {
        let name = file_name(path);
        if self.failing.contains(&name) {
            return Err(OrganizeError::SourceUnavailable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "stat denied"),
            });
        }
        match self.by_name.get(&name) {
            Some(times) => Ok(*times),
            None => FsStat.stat_times(path),
        }
    }
}
