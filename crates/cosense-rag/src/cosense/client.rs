//! HTTP client for the Cosense page APIs

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::PageSource;
use crate::config::CosenseConfig;
use crate::error::{Error, Result};
use crate::types::{PageDetail, PageListing};

/// Cosense REST API client authenticated with a `connect.sid` cookie
pub struct CosenseClient {
    client: Client,
    base_url: Url,
    cookie: String,
}

impl CosenseClient {
    /// Create a client from configuration
    pub fn new(config: &CosenseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cosense-rag/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid Cosense base URL '{}': {}", config.base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            cookie: format!("connect.sid={}", config.session_id),
        })
    }

    /// `{base}/api/pages/{project}` plus any extra path segments, each percent-encoded
    fn pages_url(&self, project: &str, extra: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("Base URL cannot be a base: {}", self.base_url)))?;
            segments.pop_if_empty().extend(["api", "pages", project]);
            if let Some(title) = extra {
                segments.push(title);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl PageSource for CosenseClient {
    async fn list_pages(&self, project: &str, skip: usize, limit: usize) -> Result<PageListing> {
        let mut url = self.pages_url(project, None)?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());

        tracing::debug!("Listing pages: {}", url);

        let response = self
            .client
            .get(url)
            .header(COOKIE, &self.cookie)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Listing {
                status: status.to_string(),
            });
        }

        Ok(response.json::<PageListing>().await?)
    }

    async fn fetch_detail(&self, project: &str, title: &str) -> Result<Option<PageDetail>> {
        let url = self.pages_url(project, Some(title))?;

        let response = self
            .client
            .get(url)
            .header(COOKIE, &self.cookie)
            .send()
            .await
            .map_err(|e| Error::page_fetch(title, e.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!("Skipping '{}': HTTP {}", title, response.status());
            return Ok(None);
        }

        let detail = response
            .json::<PageDetail>()
            .await
            .map_err(|e| Error::page_fetch(title, e.to_string()))?;

        Ok(Some(detail))
    }

    fn name(&self) -> &str {
        "cosense"
    }
}
