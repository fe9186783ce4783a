//! Background worker executing sync runs

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::export::{SyncExporter, SyncReport};

use super::job_queue::{SyncQueue, SyncRun};

/// Worker that executes queued runs one at a time
pub struct SyncWorker {
    exporter: Arc<SyncExporter>,
    queue: Arc<SyncQueue>,
}

impl SyncWorker {
    /// Create a new sync worker
    pub fn new(exporter: Arc<SyncExporter>, queue: Arc<SyncQueue>) -> Self {
        Self { exporter, queue }
    }

    /// Start processing runs from the queue until every sender is gone
    pub async fn run(self, mut receiver: mpsc::Receiver<SyncRun>) {
        tracing::info!("Sync worker started for project '{}'", self.exporter.project());

        while let Some(run) = receiver.recv().await {
            // Outcome is recorded on the queue; nothing else to do here
            let _ = self.execute(run).await;
        }

        tracing::info!("Sync worker stopped");
    }

    /// Execute one run and record its outcome
    pub async fn execute(&self, run: SyncRun) -> Result<SyncReport> {
        let run_id = run.id;
        tracing::info!("Starting sync run {} ({:?})", run_id, run.trigger);
        self.queue.mark_running(run_id);

        let queue = self.queue.clone();
        let result = self
            .exporter
            .sync_all(run_id, move |progress| queue.update_progress(run_id, progress))
            .await;

        match &result {
            Ok(report) => {
                self.queue.mark_complete(run_id, report.clone());
                tracing::info!("Sync run {} completed: {}", run_id, report.message());
            }
            Err(e) => {
                self.queue.mark_failed(run_id, e.to_string());
                tracing::error!("Sync run {} failed: {}", run_id, e);
            }
        }

        result
    }
}
