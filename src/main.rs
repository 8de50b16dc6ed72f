/*!
 * Command-line interface for mediasort
 */

use std::io;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

use mediasort::config::{Args, Config};
use mediasort::metadata::{ExifToolPool, FsStat};
use mediasort::pipeline::PipelineContext;
use mediasort::report::{ReportFormat, Reporter};
use mediasort::utils::{count_files, init_logging};

fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut command = Args::command();
        clap_complete::generate(shell, &mut command, "mediasort", &mut io::stdout());
        return Ok(());
    }

    init_logging(args.verbose);
    let show_progress = args.progress;

    let config = Config::from_args(args)?;
    config.validate()?;

    // Without a working extractor no file can be dated from metadata
    let exiftool = ExifToolPool::new(&config.exiftool, config.workers)?;

    let progress = if show_progress {
        let progress = ProgressBar::new(count_files(&config.src));
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {wide_msg:.dim.white} {pos}/{len} ({percent}%) Elapsed: {elapsed_precise} Remaining: {eta_precise}",
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
        );
        progress.enable_steady_tick(std::time::Duration::from_millis(100));
        progress
    } else {
        ProgressBar::hidden()
    };

    let pipeline = PipelineContext::new(
        config,
        Arc::new(exiftool),
        Arc::new(FsStat),
        Arc::new(progress.clone()),
    )?;
    let result = pipeline.run();
    progress.finish_and_clear();

    let reporter = Reporter::new(ReportFormat::ConsoleTable);
    match result {
        Ok(report) => {
            reporter.print_report(&report, &[]);
            Ok(())
        }
        Err(err) => {
            reporter.print_report(&pipeline.report(), err.failures());
            error!(error = %err, "run aborted; re-running after fixing the cause resumes safely");
            Err(err.into())
        }
    }
}
