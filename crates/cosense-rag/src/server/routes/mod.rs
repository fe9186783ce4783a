//! API routes

pub mod ask;
pub mod sync;

use axum::{
    extract::State,
    routing::{any, get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Question answering with cited pages
        .route("/ask", any(ask::ask))
        // Sync runs
        .route("/sync", post(sync::trigger_sync))
        .route("/sync/runs", get(sync::list_runs))
        .route("/sync/runs/:id", get(sync::get_run))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "cosense-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "project": config.cosense.project_name,
        "storage": state.store().name(),
        "search": state.search().name(),
        "endpoints": {
            "ANY /api/ask?q=": "Answer a question with a list of cited pages",
            "POST /api/sync": "Start a sync run",
            "GET /api/sync/runs": "List sync runs and queue stats",
            "GET /api/sync/runs/:id": "Get sync run progress",
            "GET /health": "Health check"
        }
    }))
}
