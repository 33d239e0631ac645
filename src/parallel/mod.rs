//! Batch orchestration: sequential and concurrent runs over a source tree

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, ConcurrencyLimit, ResizeConfig};
use crate::error::{BatchScaleError, Result};
use crate::files::{find_images, prepare};
use crate::processing::{ImageCodec, ImageTransformer, ProcessedImage};

pub mod progress;

pub use progress::*;

/// Lifecycle of a single file within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskState {
    /// Terminal states are final; nothing is retried
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Outcome of one file, produced exactly once per discovered source
#[derive(Debug)]
pub enum TaskResult {
    Succeeded(ProcessedImage),
    Failed {
        source: PathBuf,
        error: BatchScaleError,
    },
    Canceled(PathBuf),
}

impl TaskResult {
    /// Source path this outcome belongs to
    pub fn source(&self) -> &Path {
        match self {
            Self::Succeeded(processed) => processed.source.as_path(),
            Self::Failed { source, .. } => source.as_path(),
            Self::Canceled(source) => source.as_path(),
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            Self::Succeeded(_) => TaskState::Succeeded,
            Self::Failed { .. } => TaskState::Failed,
            Self::Canceled(_) => TaskState::Canceled,
        }
    }

    pub fn error(&self) -> Option<&BatchScaleError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Runs batches of transforms over a source tree
pub struct BatchProcessor {
    transformer: Arc<ImageTransformer>,
    limit: ConcurrencyLimit,
    progress_tracker: Arc<ProgressTracker>,
}

impl BatchProcessor {
    /// Create a processor using the `image` crate codec
    pub fn new(config: &ResizeConfig) -> Self {
        Self::from_transformer(ImageTransformer::new(config))
    }

    /// Create a processor with a custom codec
    pub fn with_codec(codec: Arc<dyn ImageCodec>, config: &ResizeConfig) -> Self {
        Self::from_transformer(ImageTransformer::with_codec(codec, config))
    }

    /// Create a processor from a full configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.resize).with_concurrency(config.concurrency.limit)
    }

    fn from_transformer(transformer: ImageTransformer) -> Self {
        Self {
            transformer: Arc::new(transformer),
            limit: ConcurrencyLimit::default(),
            progress_tracker: Arc::new(ProgressTracker::new()),
        }
    }

    /// Set the concurrency limit used by [`Self::resize_all_concurrently`]
    pub fn with_concurrency(mut self, limit: ConcurrencyLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn concurrency(&self) -> ConcurrencyLimit {
        self.limit
    }

    /// Process every image under `source` one at a time, in discovery order.
    ///
    /// The first failure aborts the batch and is returned unchanged; files
    /// after it are not touched. Returns the processed sources in order.
    pub fn resize_all<S, D>(&self, source: S, dest: D, scale: f64) -> Result<Vec<PathBuf>>
    where
        S: AsRef<Path>,
        D: AsRef<Path>,
    {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        let start_time = Instant::now();

        let files = find_images(source)?;
        prepare(dest)?;
        warn_if_degenerate(scale);

        info!("Starting sequential processing of {} files from {:?}", files.len(), source);
        self.progress_tracker.start(files.len() as u64);

        let mut processed = Vec::with_capacity(files.len());
        for file in files {
            self.progress_tracker.task_started(file.clone());

            if let Err(error) = self.transformer.process_one(&file, dest, scale) {
                warn!("Aborting batch at {:?}: {}", file, error);
                self.progress_tracker.task_finished(file, TaskState::Failed);
                self.progress_tracker.complete_batch();
                return Err(error);
            }

            self.progress_tracker.task_finished(file.clone(), TaskState::Succeeded);
            processed.push(file);
        }

        self.progress_tracker.complete_batch();
        info!(
            "Sequential processing completed: {} files in {:.2}s",
            processed.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(processed)
    }

    /// Process every image under `source` concurrently.
    ///
    /// One task is spawned per file, bounded by the configured limit. Each
    /// task checks `cancel` before it starts work and reports `Canceled`
    /// if the signal is set; a task already past that point runs to
    /// completion. Failures stay with their task. The call waits for every
    /// task to settle and only fails if discovery, destination setup or
    /// the task join itself fails.
    pub async fn resize_all_concurrently<S, D>(
        &self,
        source: S,
        dest: D,
        scale: f64,
        cancel: &CancellationToken,
    ) -> Result<BatchReport>
    where
        S: AsRef<Path>,
        D: AsRef<Path>,
    {
        let start_time = Instant::now();
        let source = source.as_ref().to_path_buf();
        let dest = dest.as_ref().to_path_buf();

        let files = tokio::task::spawn_blocking({
            let source = source.clone();
            let dest = dest.clone();
            move || -> Result<Vec<PathBuf>> {
                let files = find_images(&source)?;
                prepare(&dest)?;
                Ok(files)
            }
        })
        .await
        .map_err(|e| BatchScaleError::parallel(format!("Task join error: {}", e)))??;

        warn_if_degenerate(scale);

        let total_files = files.len();
        let workers = self.limit.workers();
        info!(
            "Starting concurrent processing of {} files from {:?} (workers: {})",
            total_files,
            source,
            workers.map_or_else(|| "unbounded".to_string(), |n| n.to_string())
        );

        self.progress_tracker.start(total_files as u64);

        let semaphore = workers.map(|n| Arc::new(Semaphore::new(n.max(1))));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskResult>();

        let mut handles = Vec::with_capacity(total_files);
        for file in files {
            let task = FileTask {
                transformer: Arc::clone(&self.transformer),
                progress_tracker: Arc::clone(&self.progress_tracker),
                semaphore: semaphore.clone(),
                cancel: cancel.clone(),
                dest: dest.clone(),
                scale,
            };
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let outcome = task.run(file).await?;
                // The collector outlives every sender
                let _ = tx.send(outcome);
                Ok::<(), BatchScaleError>(())
            }));
        }
        drop(tx);

        let collector = async {
            let mut outcomes = Vec::with_capacity(total_files);
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
            }
            outcomes
        };

        let (joined, outcomes) = tokio::join!(futures::future::join_all(handles), collector);

        self.progress_tracker.complete_batch();

        // Every task has settled; now surface a fault of the join itself
        for task_result in joined {
            task_result
                .map_err(|e| BatchScaleError::parallel(format!("Task join error: {}", e)))??;
        }

        let report = BatchReport::new(outcomes, total_files, start_time.elapsed());
        report.log_summary();

        Ok(report)
    }

    /// [`Self::resize_all_concurrently`] with a signal that is never set
    pub async fn resize_all_concurrently_default<S, D>(
        &self,
        source: S,
        dest: D,
        scale: f64,
    ) -> Result<BatchReport>
    where
        S: AsRef<Path>,
        D: AsRef<Path>,
    {
        self.resize_all_concurrently(source, dest, scale, &CancellationToken::new())
            .await
    }

    /// Subscribe to progress updates of subsequent batches
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ProgressUpdate> {
        self.progress_tracker.subscribe()
    }

    /// Get current progress
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress_tracker.snapshot()
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(&ResizeConfig::default())
    }
}

/// Everything one spawned task needs
struct FileTask {
    transformer: Arc<ImageTransformer>,
    progress_tracker: Arc<ProgressTracker>,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    dest: PathBuf,
    scale: f64,
}

impl FileTask {
    /// Drive one file from `Pending` to a terminal state.
    ///
    /// Anything that goes wrong with the file itself, a panic in the
    /// transform included, becomes `TaskResult::Failed`. `Err` is reserved
    /// for a closed worker pool.
    async fn run(self, source: PathBuf) -> Result<TaskResult> {
        let _permit = match &self.semaphore {
            Some(semaphore) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    permit = Arc::clone(semaphore).acquire_owned() => Some(permit.map_err(|e| {
                        BatchScaleError::parallel(format!("Worker pool closed: {}", e))
                    })?),
                }
            }
            None => None,
        };

        if self.cancel.is_cancelled() {
            debug!("Canceled before start: {:?}", source);
            self.progress_tracker.task_finished(source.clone(), TaskState::Canceled);
            return Ok(TaskResult::Canceled(source));
        }

        self.progress_tracker.task_started(source.clone());

        let transformer = Arc::clone(&self.transformer);
        let (dest, scale) = (self.dest.clone(), self.scale);
        let processed = tokio::task::spawn_blocking({
            let source = source.clone();
            move || transformer.process_one(&source, &dest, scale)
        })
        .await
        .unwrap_or_else(|e| {
            Err(BatchScaleError::parallel(format!("Worker for {:?} did not finish: {}", source, e)))
        });

        // A panicking transform only fails its own file
        let outcome = match processed {
            Ok(processed) => TaskResult::Succeeded(processed),
            Err(error) => {
                warn!("Failed to process {:?}: {}", source, error);
                TaskResult::Failed { source, error }
            }
        };

        self.progress_tracker
            .task_finished(outcome.source().to_path_buf(), outcome.state());
        Ok(outcome)
    }
}

fn warn_if_degenerate(scale: f64) {
    if !(scale.is_finite() && scale > 0.0) {
        warn!("Scale factor {} is not positive; output dimensions may be zero", scale);
    }
}

/// Aggregated outcome of a concurrent batch
#[derive(Debug)]
pub struct BatchReport {
    /// Sources that were written successfully, in completion order
    pub succeeded: Vec<PathBuf>,
    /// Every task outcome, in completion order
    pub outcomes: Vec<TaskResult>,
    pub total_files: usize,
    pub processing_time: Duration,
}

impl BatchReport {
    fn new(outcomes: Vec<TaskResult>, total_files: usize, processing_time: Duration) -> Self {
        let succeeded = outcomes
            .iter()
            .filter(|outcome| outcome.state() == TaskState::Succeeded)
            .map(|outcome| outcome.source().to_path_buf())
            .collect();

        Self {
            succeeded,
            outcomes,
            total_files,
            processing_time,
        }
    }

    /// Failed tasks and their errors
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &BatchScaleError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            TaskResult::Failed { source, error } => Some((source.as_path(), error)),
            _ => None,
        })
    }

    /// Sources skipped because of cancellation
    pub fn canceled(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            TaskResult::Canceled(source) => Some(source.as_path()),
            _ => None,
        })
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn canceled_count(&self) -> usize {
        self.canceled().count()
    }

    /// Total size of the JPEG files written
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                TaskResult::Succeeded(processed) => Some(processed.bytes_written),
                _ => None,
            })
            .sum()
    }

    /// True when every discovered file was written
    pub fn is_complete_success(&self) -> bool {
        self.success_count() == self.total_files
    }

    /// Log totals and every failure
    pub fn log_summary(&self) {
        info!(
            "Concurrent processing completed in {:.2}s: {} succeeded, {} failed, {} canceled of {}",
            self.processing_time.as_secs_f64(),
            self.success_count(),
            self.failure_count(),
            self.canceled_count(),
            self.total_files
        );

        for (source, error) in self.failures() {
            warn!("  {:?}: {}", source, error.user_message());
        }
    }

    /// Serializable view of the report
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_files: self.total_files,
            succeeded: self.success_count(),
            failed: self.failure_count(),
            canceled: self.canceled_count(),
            bytes_written: self.bytes_written(),
            processing_time_secs: self.processing_time.as_secs_f64(),
            outcomes: self
                .outcomes
                .iter()
                .map(|outcome| OutcomeSummary {
                    source: outcome.source().to_path_buf(),
                    state: outcome.state(),
                    error: outcome.error().map(ToString::to_string),
                })
                .collect(),
        }
    }

    /// Render the summary as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.summary())
            .map_err(|e| BatchScaleError::SerdeError(format!("JSON serialization failed: {}", e)))
    }
}

/// JSON-friendly batch summary
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub bytes_written: u64,
    pub processing_time_secs: f64,
    pub outcomes: Vec<OutcomeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub source: PathBuf,
    pub state: TaskState,
    pub error: Option<String>,
}
