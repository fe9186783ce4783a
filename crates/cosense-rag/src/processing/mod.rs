//! Background sync runs: queue, worker and periodic scheduler

mod job_queue;
mod scheduler;
mod worker;

pub use job_queue::{QueueStats, RunProgress, RunStatus, RunTrigger, SyncQueue, SyncRun};
pub use scheduler::Scheduler;
pub use worker::SyncWorker;
