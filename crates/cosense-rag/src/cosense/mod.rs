//! Cosense page source: the listing and detail APIs of one project

pub mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PageDetail, PageListing};

pub use client::CosenseClient;

/// Trait for reading pages of a project
///
/// Implementations:
/// - `CosenseClient`: the Cosense REST API with a session cookie
#[async_trait]
pub trait PageSource: Send + Sync {
    /// List one window of page summaries
    ///
    /// A non-success response is an error: the sync run cannot continue
    /// without the listing.
    async fn list_pages(&self, project: &str, skip: usize, limit: usize) -> Result<PageListing>;

    /// Fetch the body of one page
    ///
    /// Returns `Ok(None)` when the API answers with a non-success status, so
    /// a deleted or unreadable page is skipped instead of failing the run.
    async fn fetch_detail(&self, project: &str, title: &str) -> Result<Option<PageDetail>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}
