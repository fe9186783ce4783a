//! Question answering endpoint

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;

use crate::error::Result;
use crate::search::build_answer;
use crate::server::state::AppState;
use crate::types::{AskResponse, SearchRequest};

/// /api/ask?q= (any method) - Answer a question over the exported pages
pub async fn ask(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    // Blank questions are rejected, others are sent as given
    let query = match params.get("q") {
        Some(q) if !q.trim().is_empty() => q.as_str(),
        _ => return Ok((StatusCode::BAD_REQUEST, "Missing \"q\" query parameter").into_response()),
    };

    tracing::info!("Ask: \"{}\"", query);

    let search = &state.config().search;
    let request = SearchRequest::new(query, search.max_num_results, search.system_prompt.as_str());
    let response = state.search().ai_search(&request).await?;

    tracing::debug!(
        "Search returned {} chunks (has_more: {})",
        response.data.len(),
        response.has_more
    );

    let answer = build_answer(&response, state.answer_options());

    Ok((
        [(header::CONTENT_TYPE, "text/markdown")],
        Json(AskResponse { answer }),
    )
        .into_response())
}
