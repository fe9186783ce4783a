//! Periodic trigger for sync runs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::SyncConfig;

use super::job_queue::{RunTrigger, SyncQueue};

/// Submits a run on every tick of a fixed interval
pub struct Scheduler {
    queue: Arc<SyncQueue>,
    period: Duration,
    run_on_startup: bool,
}

impl Scheduler {
    pub fn new(queue: Arc<SyncQueue>, config: &SyncConfig) -> Self {
        Self {
            queue,
            period: Duration::from_secs(config.interval_secs.max(1)),
            run_on_startup: config.run_on_startup,
        }
    }

    /// Run the scheduler on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Tick forever, or until the worker goes away
    pub async fn run(self) {
        tracing::info!("Sync scheduler started (every {}s)", self.period.as_secs());

        if self.run_on_startup && self.queue.submit(RunTrigger::Startup).await.is_err() {
            return;
        }

        // First scheduled tick is one full period after start
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.queue.submit(RunTrigger::Schedule).await {
                tracing::error!("Sync scheduler stopping: {}", e);
                break;
            }
        }
    }
}
