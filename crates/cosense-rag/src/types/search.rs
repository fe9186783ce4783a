//! Request and response types for the AI search service

use serde::{Deserialize, Serialize};

/// Question sent to the search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub stream: bool,
    pub max_num_results: u32,
    pub system_prompt: String,
}

impl SearchRequest {
    /// Non-streaming request with the given result cap and instructions
    pub fn new(query: impl Into<String>, max_num_results: u32, system_prompt: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            stream: false,
            max_num_results,
            system_prompt: system_prompt.into(),
        }
    }
}

/// A retrieved document backing the generated answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchChunk {
    /// Object key of the exported document, e.g. `mdx/Page_title.mdx`
    pub filename: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Generated answer plus the documents it was drawn from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub data: Vec<SearchChunk>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Body of `GET /api/ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
