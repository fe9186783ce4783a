//! Sync exporter: paginates a project and writes every page to the object store

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::checkpoint::SyncCheckpoint;
use super::formatter::format_document;
use crate::config::AppConfig;
use crate::cosense::PageSource;
use crate::error::{Error, Result};
use crate::providers::ObjectStore;
use crate::types::PageSummary;

/// Outcome of exporting a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    /// Document written
    Written,
    /// Detail API answered with a non-success status
    Skipped,
    /// Transport, decode or write error (already logged)
    Failed,
}

/// Progress after each listing batch
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncProgress {
    /// Pagination offset reached so far
    pub skip: usize,
    /// Page count last reported by the listing API
    pub total_count: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of a completed sync run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    /// Final pagination offset (pages handled, including earlier attempts when resumed)
    pub synced: usize,
    /// Page count last reported by the listing API
    pub total_count: usize,
    /// Listing calls made by this run
    pub listing_calls: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Offset this run resumed from, if a checkpoint was found
    pub resumed_from: Option<usize>,
}

impl SyncReport {
    /// Human readable summary
    pub fn message(&self) -> String {
        format!("Successfully synced {} pages.", self.synced)
    }
}

/// Exports every page of one project
pub struct SyncExporter {
    source: Arc<dyn PageSource>,
    store: Arc<dyn ObjectStore>,
    project: String,
    base_url: String,
    page_limit: usize,
    max_concurrency: usize,
    resume: bool,
}

impl SyncExporter {
    /// Create an exporter for the configured project
    pub fn new(config: &AppConfig, source: Arc<dyn PageSource>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            source,
            store,
            project: config.cosense.project_name.clone(),
            base_url: config.cosense.base_url.clone(),
            page_limit: config.sync.page_limit.max(1),
            max_concurrency: config.sync.max_concurrency.max(1),
            resume: config.sync.resume,
        }
    }

    /// Project being exported
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Run one full pagination pass
    ///
    /// Listing failures abort the run. Failures of individual pages are
    /// logged and counted, and the run carries on.
    pub async fn sync_all<F>(&self, run_id: Uuid, on_progress: F) -> Result<SyncReport>
    where
        F: Fn(&SyncProgress) + Send + Sync,
    {
        let mut progress = SyncProgress {
            skip: 0,
            // Sentinel so the first listing call always happens
            total_count: 1,
            ..Default::default()
        };
        let mut resumed_from = None;
        let mut listing_calls = 0;

        if self.resume {
            match SyncCheckpoint::load(self.store.as_ref()).await {
                Ok(Some(checkpoint)) if checkpoint.skip < checkpoint.total_count => {
                    tracing::info!(
                        "Resuming from checkpoint of run {}: {} / {}",
                        checkpoint.run_id,
                        checkpoint.skip,
                        checkpoint.total_count
                    );
                    progress.skip = checkpoint.skip;
                    progress.total_count = checkpoint.total_count;
                    resumed_from = Some(checkpoint.skip);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to read checkpoint, starting from 0: {}", e),
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        while progress.skip < progress.total_count {
            let listing = self
                .source
                .list_pages(&self.project, progress.skip, self.page_limit)
                .await?;
            listing_calls += 1;
            progress.total_count = listing.count;

            if listing.pages.is_empty() {
                if progress.skip < progress.total_count {
                    tracing::warn!(
                        "Listing returned no pages at offset {} of {}, stopping",
                        progress.skip,
                        progress.total_count
                    );
                }
                break;
            }

            let page_futures = listing.pages.iter().map(|summary| {
                let sem = semaphore.clone();
                async move {
                    let Ok(_permit) = sem.acquire().await else {
                        return PageOutcome::Failed;
                    };
                    match self.export_page(summary).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!("Failed to process page: {}: {}", summary.title, e);
                            PageOutcome::Failed
                        }
                    }
                }
            });

            for outcome in join_all(page_futures).await {
                match outcome {
                    PageOutcome::Written => progress.written += 1,
                    PageOutcome::Skipped => progress.skipped += 1,
                    PageOutcome::Failed => progress.failed += 1,
                }
            }

            progress.skip += listing.pages.len();
            tracing::info!("Progress: {} / {}", progress.skip, progress.total_count);
            on_progress(&progress);

            let checkpoint = SyncCheckpoint::new(run_id, progress.skip, progress.total_count);
            if let Err(e) = checkpoint.save(self.store.as_ref()).await {
                tracing::warn!("Failed to save checkpoint at {}: {}", progress.skip, e);
            }
        }

        if let Err(e) = SyncCheckpoint::clear(self.store.as_ref()).await {
            tracing::warn!("Failed to clear checkpoint: {}", e);
        }

        let report = SyncReport {
            synced: progress.skip,
            total_count: progress.total_count,
            listing_calls,
            written: progress.written,
            skipped: progress.skipped,
            failed: progress.failed,
            resumed_from,
        };
        tracing::info!(
            "{} (written: {}, skipped: {}, failed: {})",
            report.message(),
            report.written,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Fetch, format and store one page
    async fn export_page(&self, summary: &PageSummary) -> Result<PageOutcome> {
        let Some(detail) = self.source.fetch_detail(&self.project, &summary.title).await? else {
            return Ok(PageOutcome::Skipped);
        };

        let document = format_document(summary, &detail, &self.project, &self.base_url);
        self.store
            .put(&document.key, document.content.into())
            .await
            .map_err(|e| Error::storage(format!("{} ({})", e, document.key)))?;

        Ok(PageOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosense::CosenseClient;
    use crate::providers::MemoryObjectStore;
    use crate::export::CHECKPOINT_KEY;
    use parking_lot::Mutex;
    use wiremock::{
        matchers::{method, path, path_regex, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn config_for(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.cosense.base_url = server.uri();
        config.cosense.project_name = "demo".to_string();
        config.cosense.session_id = "sid".to_string();
        config
    }

    fn listing(count: usize, titles: std::ops::Range<usize>) -> serde_json::Value {
        let pages: Vec<_> = titles
            .map(|i| {
                serde_json::json!({
                    "title": format!("Page {}", i),
                    "created": 1_700_000_000 + i,
                    "updated": 1_700_000_500 + i,
                    "views": i,
                })
            })
            .collect();
        serde_json::json!({ "count": count, "pages": pages })
    }

    async fn mount_listing(server: &MockServer, skip: usize, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/pages/demo"))
            .and(query_param("skip", skip.to_string()))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_details(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/api/pages/demo/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "lines": [{"text": "title line"}, {"text": "body"}]
            })))
            .mount(server)
            .await;
    }

    fn exporter(config: &AppConfig, store: Arc<MemoryObjectStore>) -> SyncExporter {
        let source = Arc::new(CosenseClient::new(&config.cosense).unwrap());
        SyncExporter::new(config, source, store)
    }

    #[tokio::test]
    async fn test_paginates_until_count() {
        let server = MockServer::start().await;
        mount_listing(&server, 0, listing(250, 0..100)).await;
        mount_listing(&server, 100, listing(250, 100..200)).await;
        mount_listing(&server, 200, listing(250, 200..250)).await;
        mount_details(&server).await;

        let config = config_for(&server);
        let store = Arc::new(MemoryObjectStore::new());
        let seen = Mutex::new(Vec::new());

        let report = exporter(&config, store.clone())
            .sync_all(Uuid::new_v4(), |p| seen.lock().push(p.skip))
            .await
            .unwrap();

        assert_eq!(report.listing_calls, 3);
        assert_eq!(report.synced, 250);
        assert_eq!(report.written, 250);
        assert_eq!(report.message(), "Successfully synced 250 pages.");
        assert_eq!(*seen.lock(), vec![100, 200, 250]);

        let keys = store.list("mdx/").await.unwrap();
        assert_eq!(keys.len(), 250);
        assert!(keys.contains(&"mdx/Page_42.mdx".to_string()));
        assert!(store.get(CHECKPOINT_KEY).await.unwrap().is_none());

        let detail_calls = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path().starts_with("/api/pages/demo/"))
            .count();
        assert_eq!(detail_calls, 250);
    }

    #[tokio::test]
    async fn test_failed_pages_do_not_abort_run() {
        let server = MockServer::start().await;
        mount_listing(&server, 0, listing(4, 0..4)).await;

        Mock::given(method("GET"))
            .and(path("/api/pages/demo/Page%201"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/pages/demo/Page%202"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_details(&server).await;

        let config = config_for(&server);
        let store = Arc::new(MemoryObjectStore::new());

        let report = exporter(&config, store.clone())
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.synced, 4);
        assert_eq!(report.written, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            store.list("mdx/").await.unwrap(),
            vec!["mdx/Page_0.mdx", "mdx/Page_3.mdx"]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pages/demo"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let store = Arc::new(MemoryObjectStore::new());

        let err = exporter(&config, store)
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Listing { .. }));
    }

    #[tokio::test]
    async fn test_count_change_moves_termination() {
        let server = MockServer::start().await;
        mount_listing(&server, 0, listing(150, 0..100)).await;
        // The project shrank between the two calls
        mount_listing(&server, 100, listing(120, 100..120)).await;
        mount_details(&server).await;

        let config = config_for(&server);
        let report = exporter(&config, Arc::new(MemoryObjectStore::new()))
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.listing_calls, 2);
        assert_eq!(report.synced, 120);
        assert_eq!(report.total_count, 120);
    }

    #[tokio::test]
    async fn test_empty_listing_stops_run() {
        let server = MockServer::start().await;
        mount_listing(&server, 0, listing(10, 0..0)).await;

        let config = config_for(&server);
        let report = exporter(&config, Arc::new(MemoryObjectStore::new()))
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.listing_calls, 1);
        assert_eq!(report.synced, 0);
    }

    #[tokio::test]
    async fn test_resumes_from_checkpoint() {
        let server = MockServer::start().await;
        mount_listing(&server, 200, listing(250, 200..250)).await;
        mount_details(&server).await;

        let config = config_for(&server);
        let store = Arc::new(MemoryObjectStore::new());
        SyncCheckpoint::new(Uuid::new_v4(), 200, 250)
            .save(store.as_ref())
            .await
            .unwrap();

        let report = exporter(&config, store.clone())
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.resumed_from, Some(200));
        assert_eq!(report.listing_calls, 1);
        assert_eq!(report.written, 50);
        assert_eq!(report.synced, 250);
        assert!(store.get(CHECKPOINT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pages/demo"))
            .and(query_param("skip", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(3, 0..3)))
            .expect(2)
            .mount(&server)
            .await;
        mount_details(&server).await;

        let config = config_for(&server);
        let store = Arc::new(MemoryObjectStore::new());
        let exporter = exporter(&config, store.clone());

        exporter.sync_all(Uuid::new_v4(), |_| {}).await.unwrap();
        exporter.sync_all(Uuid::new_v4(), |_| {}).await.unwrap();

        assert_eq!(store.list("mdx/").await.unwrap().len(), 3);
        assert_eq!(store.len(), 3);
    }

    /// Tracks how many detail fetches are running at once
    #[derive(Default)]
    struct InFlightSource {
        current: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageSource for InFlightSource {
        async fn list_pages(&self, _project: &str, skip: usize, limit: usize) -> Result<crate::types::PageListing> {
            let pages = (skip..10.min(skip + limit))
                .map(|i| PageSummary {
                    title: format!("p{}", i),
                    created: 0,
                    updated: 0,
                    views: 0,
                })
                .collect();
            Ok(crate::types::PageListing { count: 10, pages })
        }

        async fn fetch_detail(&self, _project: &str, title: &str) -> Result<Option<crate::types::PageDetail>> {
            use std::sync::atomic::Ordering;

            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            Ok(Some(crate::types::PageDetail {
                lines: vec![crate::types::Line { text: title.to_string() }],
            }))
        }

        fn name(&self) -> &str {
            "in-flight"
        }
    }

    #[tokio::test]
    async fn test_fan_out_respects_max_concurrency() {
        let mut config = AppConfig::default();
        config.cosense.project_name = "demo".to_string();
        config.sync.page_limit = 10;
        config.sync.max_concurrency = 2;

        let source = Arc::new(InFlightSource::default());
        let store = Arc::new(MemoryObjectStore::new());
        let report = SyncExporter::new(&config, source.clone(), store.clone())
            .sync_all(Uuid::new_v4(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.listing_calls, 1);
        assert_eq!(report.written, 10);
        assert_eq!(store.list("mdx/").await.unwrap().len(), 10);

        let peak = source.peak.load(std::sync::atomic::Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency was {}", peak);
        assert!(peak > 1, "fetches never overlapped");
    }
}
