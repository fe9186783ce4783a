//! REST client for the managed AI search service

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::SearchProvider;
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::types::{SearchRequest, SearchResponse};

/// AI search REST client
pub struct HttpSearchClient {
    client: Client,
    endpoint: String,
    api_token: String,
}

/// `{ success, result, errors }` wrapper around every API response
#[derive(Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl HttpSearchClient {
    /// Create a client for the configured search instance
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: Self::endpoint(config),
            api_token: config.api_token.clone(),
        })
    }

    /// Get the API endpoint URL
    fn endpoint(config: &SearchConfig) -> String {
        format!(
            "{}/accounts/{}/autorag/rags/{}/ai-search",
            config.base_url.trim_end_matches('/'),
            config.account_id,
            config.search_id
        )
    }
}

#[async_trait]
impl SearchProvider for HttpSearchClient {
    async fn ai_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        tracing::debug!("AI search: \"{}\"", request.query);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::search(format!("Search request failed: {}", e)))?;

        let status = response.status();
        let envelope = response
            .json::<ApiEnvelope<SearchResponse>>()
            .await
            .map_err(|e| Error::search(format!("Invalid search response (HTTP {}): {}", status, e)))?;

        if !status.is_success() || !envelope.success {
            let details = envelope
                .errors
                .iter()
                .map(|e| format!("{} {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::search(format!("Search failed: HTTP {} {}", status, details)));
        }

        envelope
            .result
            .ok_or_else(|| Error::search("Search response has no result"))
    }

    fn name(&self) -> &str {
        "ai-search"
    }
}
