//! Sync run trigger and progress endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::{QueueStats, RunProgress, RunTrigger};
use crate::server::state::AppState;

/// Response from a manual trigger
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub run_id: Uuid,
    pub message: String,
}

/// Response listing runs
#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub runs: Vec<RunProgress>,
    pub stats: QueueStats,
}

/// POST /api/sync - Queue a sync run
pub async fn trigger_sync(State(state): State<AppState>) -> Result<(StatusCode, Json<TriggerResponse>)> {
    let run_id = state.queue().submit(RunTrigger::Manual).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            run_id,
            message: "Sync run queued. Poll /api/sync/runs/{run_id} for progress.".to_string(),
        }),
    ))
}

/// GET /api/sync/runs - List runs, newest first
pub async fn list_runs(State(state): State<AppState>) -> Json<RunListResponse> {
    let queue = state.queue();
    Json(RunListResponse {
        runs: queue.list_runs(),
        stats: queue.stats(),
    })
}

/// GET /api/sync/runs/:id - Get run progress
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunProgress>> {
    state
        .queue()
        .get_progress(run_id)
        .map(Json)
        .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
}
