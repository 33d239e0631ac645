//! Progress tracking for concurrent batches

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::TaskState;

/// Thread-safe progress tracker shared by the workers of a batch
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressUpdate>,
    started_at: Mutex<Option<Instant>>,

    // Atomic counters for high-frequency updates
    total: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    canceled: AtomicUsize,
}

/// Point-in-time view of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub elapsed: Duration,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        total: u64,
    },
    TaskStarted {
        path: PathBuf,
    },
    TaskFinished {
        path: PathBuf,
        state: TaskState,
    },
    BatchCompleted {
        snapshot: ProgressSnapshot,
    },
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);

        Self {
            sender,
            started_at: Mutex::new(None),
            total: AtomicU64::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            canceled: AtomicUsize::new(0),
        }
    }

    /// Reset counters and start tracking a batch
    pub fn start(&self, total: u64) {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        self.total.store(total, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.canceled.store(0, Ordering::Relaxed);

        let _ = self.sender.send(ProgressUpdate::Started { total });
        info!("Started progress tracking for {} files", total);
    }

    /// A task passed its cancellation checkpoint and is running
    pub fn task_started(&self, path: PathBuf) {
        debug!("Started processing file: {:?}", path);
        let _ = self.sender.send(ProgressUpdate::TaskStarted { path });
    }

    /// A task reached a terminal state
    pub fn task_finished(&self, path: PathBuf, state: TaskState) {
        match state {
            TaskState::Succeeded => self.succeeded.fetch_add(1, Ordering::Relaxed),
            TaskState::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            TaskState::Canceled => self.canceled.fetch_add(1, Ordering::Relaxed),
            TaskState::Pending | TaskState::Running => return,
        };

        let _ = self.sender.send(ProgressUpdate::TaskFinished { path, state });
    }

    /// Get the current snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        let started_at = *self.started_at.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = started_at.map(|start| start.elapsed()).unwrap_or_default();

        ProgressSnapshot {
            total: self.total.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            elapsed,
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    /// Mark batch as completed
    pub fn complete_batch(&self) -> ProgressSnapshot {
        let snapshot = self.snapshot();

        let _ = self.sender.send(ProgressUpdate::BatchCompleted {
            snapshot: snapshot.clone(),
        });

        info!(
            "Batch completed: {}/{} succeeded, {} failed, {} canceled in {:.2}s",
            snapshot.succeeded,
            snapshot.total,
            snapshot.failed,
            snapshot.canceled,
            snapshot.elapsed.as_secs_f64()
        );

        snapshot
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSnapshot {
    /// Number of tasks in a terminal state
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.canceled
    }

    /// Share of tasks that reached a terminal state
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.finished() as f64 / self.total as f64) * 100.0
    }
}
