/*!
 * Worker pool draining the directory walk
 *
 * The walker is the only producer. It hands each [`FileTask`] to a worker
 * over a zero-capacity channel, so it blocks until a worker is free. Each
 * worker resolves the timestamp and performs the copy synchronously.
 *
 * By default the first failure cancels the run: the walker stops, idle
 * workers exit, in-flight copies finish, and [`PipelineContext::run`]
 * returns every failure recorded so far. With `keep_going` failures are
 * collected and the run continues to the end.
 */

use std::fs;
use std::mem;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use indicatif::ProgressBar;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::copier::Copier;
use crate::error::{OrganizeError, Result, TaskFailure};
use crate::metadata::{MetadataSource, StatSource};
use crate::report::RunReport;
use crate::resolver::Resolver;
use crate::types::{CopyOutcome, FileTask, TaskOutcome};
use crate::walker::{Discovery, Walker};

/// Everything a run shares between the walker and the workers
pub struct PipelineContext {
    config: Config,
    walker: Walker,
    resolver: Resolver,
    copier: Copier,
    cancelled: AtomicBool,
    report: Mutex<RunReport>,
    failures: Mutex<Vec<TaskFailure>>,
    /// Progress bar, ticked once per finished task
    pub progress: Arc<ProgressBar>,
}

impl PipelineContext {
    /// Build a context over the given collaborators
    ///
    /// The source root is canonicalised so every [`FileTask`] carries an
    /// absolute path.
    pub fn new(
        config: Config,
        metadata: Arc<dyn MetadataSource>,
        stat: Arc<dyn StatSource>,
        progress: Arc<ProgressBar>,
    ) -> Result<Self> {
        let src = fs::canonicalize(&config.src).map_err(|e| {
            OrganizeError::Config(format!("cannot resolve {}: {}", config.src.display(), e))
        })?;

        let report = RunReport {
            source: src.display().to_string(),
            destination: config.dst.display().to_string(),
            workers: config.workers,
            ..RunReport::default()
        };

        Ok(Self {
            walker: Walker::new(src),
            resolver: Resolver::new(metadata, stat, config.metadata_policy),
            copier: Copier::new(&config.dst),
            config,
            cancelled: AtomicBool::new(false),
            report: Mutex::new(report),
            failures: Mutex::new(Vec::new()),
            progress,
        })
    }

    /// Walk the source and process every file
    ///
    /// Returns the run report, or [`OrganizeError::Failed`] carrying every
    /// per-file failure if any occurred.
    pub fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        info!(
            src = %self.walker.root().display(),
            dst = %self.copier.root().display(),
            workers = self.config.workers,
            "starting"
        );

        let (sender, receiver) = crossbeam_channel::bounded::<FileTask>(0);
        thread::scope(|scope| {
            for worker in 0..self.config.workers.max(1) {
                let receiver = receiver.clone();
                scope.spawn(move || self.work(worker, receiver));
            }
            drop(receiver);
            self.produce(sender);
        });

        self.lock_report().duration = start.elapsed();
        let failures = mem::take(&mut *lock(&self.failures));
        if failures.is_empty() {
            Ok(self.report())
        } else {
            Err(OrganizeError::Failed { failures })
        }
    }

    /// Snapshot of the counters so far
    pub fn report(&self) -> RunReport {
        self.lock_report().clone()
    }

    /// Ask the walker and idle workers to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn produce(&self, sender: Sender<FileTask>) {
        for discovery in self.walker.entries() {
            if self.is_cancelled() {
                info!("run cancelled, stopping walk");
                break;
            }

            match discovery {
                Ok(Discovery::Directory(_)) => self.lock_report().directories += 1,
                Ok(Discovery::File(task)) => {
                    self.lock_report().files_discovered += 1;
                    // Fails only once every worker has exited
                    if sender.send(task).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let path = match &err {
                        OrganizeError::WalkFailed(walk) => walk.path().map(PathBuf::from),
                        _ => None,
                    };
                    self.fail(path, err);
                }
            }
        }
    }

    fn work(&self, worker: usize, receiver: Receiver<FileTask>) {
        for task in receiver.iter() {
            if self.is_cancelled() {
                debug!(worker, path = %task.path.display(), "run cancelled, dropping task");
                break;
            }

            match self.process(&task) {
                Ok(outcome) => self.record(outcome),
                Err(err) => self.fail(Some(task.path.clone()), err),
            }

            self.progress.inc(1);
            self.progress.set_message(
                task.path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            );
        }
        debug!(worker, "worker finished");
    }

    /// Resolve then copy a single file
    fn process(&self, task: &FileTask) -> Result<TaskOutcome> {
        debug!(path = %task.path.display(), size = task.size, "processing file");

        let Some(resolved) = self.resolver.resolve(&task.path)? else {
            return Ok(TaskOutcome::Skipped);
        };
        info!(
            path = %task.path.display(),
            date = %resolved.time.format("%Y/%m/%d"),
            source = ?resolved.source,
            "guessed date"
        );

        let outcome = self.copier.copy_task(task, &resolved.time)?;
        Ok(TaskOutcome::Copy(outcome))
    }

    fn record(&self, outcome: TaskOutcome) {
        let mut report = self.lock_report();
        match outcome {
            TaskOutcome::Skipped => report.skipped += 1,
            TaskOutcome::Copy(CopyOutcome::AlreadyPresent { .. }) => report.already_present += 1,
            TaskOutcome::Copy(CopyOutcome::Copied { bytes, .. }) => {
                report.copied += 1;
                report.bytes_copied += bytes;
            }
            TaskOutcome::Copy(CopyOutcome::Replaced { bytes, .. }) => {
                report.replaced += 1;
                report.bytes_copied += bytes;
            }
        }
    }

    fn fail(&self, path: Option<PathBuf>, err: OrganizeError) {
        match &path {
            Some(path) => error!(path = %path.display(), error = %err, "failed"),
            None => error!(error = %err, "failed"),
        }

        self.lock_report().failed += 1;
        lock(&self.failures).push(TaskFailure { path, error: err });
        if !self.config.keep_going {
            self.cancel();
        }
    }

    fn lock_report(&self) -> MutexGuard<'_, RunReport> {
        lock(&self.report)
    }
}

// Counters stay meaningful even if a worker panicked mid-update
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
