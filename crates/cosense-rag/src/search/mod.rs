//! AI search provider and answer post-processing

pub mod answer;
pub mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SearchRequest, SearchResponse};

pub use answer::{build_answer, page_title_from_filename, AnswerOptions};
pub use client::HttpSearchClient;

/// Trait for retrieval-augmented search over the exported documents
///
/// Implementations:
/// - `HttpSearchClient`: managed AI search REST API
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Retrieve relevant documents and draft an answer
    async fn ai_search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
