/*!
 * Reporting functionality for mediasort
 *
 * Renders the end-of-run summary, and the list of failed files when there
 * are any, using the tabled library.
 */

use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::error::TaskFailure;
use crate::utils::format_file_size;

/// Counters for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Canonical source root
    pub source: String,
    /// Destination root
    pub destination: String,
    /// Worker count
    pub workers: usize,
    /// Wall-clock time of the run
    pub duration: Duration,
    /// Directories seen by the walker
    pub directories: usize,
    /// Files handed to the worker pool
    pub files_discovered: usize,
    /// Files written to a fresh destination
    pub copied: usize,
    /// Files whose destination already existed with the same size
    pub already_present: usize,
    /// Stale destinations that were deleted and rewritten
    pub replaced: usize,
    /// Files skipped by the metadata failure policy
    pub skipped: usize,
    /// Failures, including walk errors
    pub failed: usize,
    /// Bytes written
    pub bytes_copied: u64,
}

impl RunReport {
    /// Discovered files that no worker got to, because the run was cancelled
    pub fn not_processed(&self) -> usize {
        let handled = self.copied + self.already_present + self.replaced + self.skipped;
        self.files_discovered.saturating_sub(handled + self.failed)
    }
}

/// Format of the report output
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
}

/// Report generator for run results
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Generate a report string for a run and its failures
    pub fn generate_report(&self, report: &RunReport, failures: &[TaskFailure]) -> String {
        match self.format {
            ReportFormat::ConsoleTable => self.generate_console_report(report, failures),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, report: &RunReport, failures: &[TaskFailure]) {
        println!("\n{}", self.generate_report(report, failures));
    }

    fn create_summary_table(&self, report: &RunReport) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: &'static str,

            #[tabled(rename = "Value")]
            value: String,
        }

        let mut rows = vec![
            SummaryRow {
                key: "Source",
                value: report.source.clone(),
            },
            SummaryRow {
                key: "Destination",
                value: report.destination.clone(),
            },
            SummaryRow {
                key: "Workers",
                value: report.workers.to_string(),
            },
            SummaryRow {
                key: "Process Time",
                value: format!("{:.4?}", report.duration),
            },
            SummaryRow {
                key: "Directories",
                value: self.format_number(report.directories),
            },
            SummaryRow {
                key: "Files Found",
                value: self.format_number(report.files_discovered),
            },
            SummaryRow {
                key: "Copied",
                value: format!(
                    "{} ({})",
                    self.format_number(report.copied + report.replaced),
                    format_file_size(report.bytes_copied)
                ),
            },
            SummaryRow {
                key: "Already Archived",
                value: self.format_number(report.already_present),
            },
        ];

        if report.replaced > 0 {
            rows.push(SummaryRow {
                key: "Repaired",
                value: self.format_number(report.replaced),
            });
        }
        if report.skipped > 0 {
            rows.push(SummaryRow {
                key: "Skipped",
                value: self.format_number(report.skipped),
            });
        }
        if report.failed > 0 {
            rows.push(SummaryRow {
                key: "Failed",
                value: self.format_number(report.failed),
            });
        }
        if report.not_processed() > 0 {
            rows.push(SummaryRow {
                key: "Not Processed",
                value: self.format_number(report.not_processed()),
            });
        }

        styled(Table::new(rows))
    }

    fn create_failures_table(&self, failures: &[TaskFailure]) -> String {
        #[derive(Tabled)]
        struct FailureRow {
            #[tabled(rename = "Path")]
            path: String,

            #[tabled(rename = "Error")]
            error: String,
        }

        let rows = failures.iter().map(|failure| FailureRow {
            path: failure
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            error: failure.error.to_string(),
        });

        styled(Table::new(rows))
    }

    fn generate_console_report(&self, report: &RunReport, failures: &[TaskFailure]) -> String {
        let summary = self.create_summary_table(report);
        if failures.is_empty() {
            return format!("ARCHIVE COMPLETE\n{}", summary);
        }

        format!(
            "FAILED FILES\n{}\n\nARCHIVE INCOMPLETE\n{}",
            self.create_failures_table(failures),
            summary
        )
    }
}

fn styled(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Padding::new(1, 1, 0, 0))
        .with(Modify::new(Columns::new(..)).with(Alignment::left()));
    table.to_string()
}
