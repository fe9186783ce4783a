//! Sync run queue with progress tracking
//!
//! Every trigger (timer, HTTP, CLI) submits a run here. Runs are never
//! de-duplicated: a second trigger while a run is in flight queues another one.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::export::{SyncProgress, SyncReport};

/// What started a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Schedule,
    Manual,
    Startup,
}

/// Run status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

/// Progress information for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: Uuid,
    pub trigger: RunTrigger,
    pub status: RunStatus,
    /// Latest batch progress
    pub progress: SyncProgress,
    /// Summary message once complete
    pub message: Option<String>,
    pub report: Option<SyncReport>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl RunProgress {
    pub fn new(run_id: Uuid, trigger: RunTrigger) -> Self {
        let now = chrono::Utc::now();
        Self {
            run_id,
            trigger,
            status: RunStatus::Pending,
            progress: SyncProgress::default(),
            message: None,
            report: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn percent_complete(&self) -> f32 {
        if self.status == RunStatus::Complete {
            return 100.0;
        }
        if self.progress.total_count == 0 {
            return 0.0;
        }
        (self.progress.skip as f32 / self.progress.total_count as f32 * 100.0).min(100.0)
    }
}

/// A queued sync run
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: Uuid,
    pub trigger: RunTrigger,
}

/// Finished runs kept for inspection unless configured otherwise
pub const DEFAULT_RUN_HISTORY: usize = 100;

/// Run queue feeding the sync worker
pub struct SyncQueue {
    /// Pending, running and recently finished runs
    runs: Arc<DashMap<Uuid, RunProgress>>,
    /// Channel for sending runs to the worker
    sender: mpsc::Sender<SyncRun>,
    /// Finished runs kept before the oldest are dropped
    history: usize,
}

impl SyncQueue {
    /// Create a new queue and the receiver the worker consumes
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SyncRun>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let queue = Self {
            runs: Arc::new(DashMap::new()),
            sender,
            history: DEFAULT_RUN_HISTORY,
        };

        (queue, receiver)
    }

    /// Keep at most `history` finished runs
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history.max(1);
        self
    }

    /// Submit a run for processing
    pub async fn submit(&self, trigger: RunTrigger) -> Result<Uuid> {
        let run = SyncRun {
            id: Uuid::new_v4(),
            trigger,
        };
        let run_id = run.id;

        self.runs.insert(run_id, RunProgress::new(run_id, trigger));

        if let Err(e) = self.sender.send(run).await {
            tracing::error!("Failed to submit sync run: {}", e);
            self.mark_failed(run_id, "sync worker is not running");
            return Err(Error::internal("sync worker is not running"));
        }

        tracing::info!("Queued sync run {} ({:?})", run_id, trigger);
        Ok(run_id)
    }

    /// Get progress for a run
    pub fn get_progress(&self, run_id: Uuid) -> Option<RunProgress> {
        self.runs.get(&run_id).map(|p| p.clone())
    }

    /// List all runs, newest first
    pub fn list_runs(&self) -> Vec<RunProgress> {
        let mut runs: Vec<RunProgress> = self.runs.iter().map(|e| e.value().clone()).collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs
    }

    /// Mark a run as started
    pub fn mark_running(&self, run_id: Uuid) {
        if let Some(mut run) = self.runs.get_mut(&run_id) {
            run.status = RunStatus::Running;
            run.updated_at = chrono::Utc::now();
        }
    }

    /// Record batch progress
    pub fn update_progress(&self, run_id: Uuid, progress: &SyncProgress) {
        if let Some(mut run) = self.runs.get_mut(&run_id) {
            run.progress = *progress;
            run.updated_at = chrono::Utc::now();
        }
    }

    /// Record a completed run
    pub fn mark_complete(&self, run_id: Uuid, report: SyncReport) {
        if let Some(mut run) = self.runs.get_mut(&run_id) {
            let now = chrono::Utc::now();
            run.status = RunStatus::Complete;
            run.progress.skip = report.synced;
            run.progress.total_count = report.total_count;
            run.message = Some(report.message());
            run.report = Some(report);
            run.updated_at = now;
            run.completed_at = Some(now);
        }
        self.prune_finished();
    }

    /// Record a failed run
    pub fn mark_failed(&self, run_id: Uuid, error: impl Into<String>) {
        if let Some(mut run) = self.runs.get_mut(&run_id) {
            let now = chrono::Utc::now();
            run.status = RunStatus::Failed;
            run.error = Some(error.into());
            run.updated_at = now;
            run.completed_at = Some(now);
        }
        self.prune_finished();
    }

    /// Drop the oldest finished runs beyond the history limit
    fn prune_finished(&self) {
        let mut finished: Vec<(Uuid, chrono::DateTime<chrono::Utc>)> = self
            .runs
            .iter()
            .filter_map(|r| r.completed_at.map(|at| (r.run_id, at)))
            .collect();
        if finished.len() <= self.history {
            return;
        }

        finished.sort_by(|a, b| a.1.cmp(&b.1));
        let excess = finished.len() - self.history;
        for (run_id, _) in finished.into_iter().take(excess) {
            self.runs.remove(&run_id);
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        let count = |status: RunStatus| self.runs.iter().filter(|r| r.status == status).count();

        QueueStats {
            total_runs: self.runs.len(),
            pending: count(RunStatus::Pending),
            running: count(RunStatus::Running),
            complete: count(RunStatus::Complete),
            failed: count(RunStatus::Failed),
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total_runs: usize,
    pub pending: usize,
    pub running: usize,
    pub complete: usize,
    pub failed: usize,
}
