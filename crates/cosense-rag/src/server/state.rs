//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::AppConfig;
use crate::cosense::{CosenseClient, PageSource};
use crate::error::Result;
use crate::export::SyncExporter;
use crate::processing::{Scheduler, SyncQueue, SyncWorker};
use crate::providers::{self, ObjectStore};
use crate::search::{AnswerOptions, HttpSearchClient, SearchProvider};

use super::assets::AssetProxy;

/// Runs that can wait behind the one in progress
const QUEUE_CAPACITY: usize = 16;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    /// Object store holding exported documents
    store: Arc<dyn ObjectStore>,
    /// AI search provider
    search: Arc<dyn SearchProvider>,
    /// Sync run queue
    queue: Arc<SyncQueue>,
    /// Static asset backend
    assets: AssetProxy,
    answer_options: AnswerOptions,
}

impl AppState {
    /// Create the state from configuration and start the sync worker and scheduler
    pub async fn new(config: AppConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state for project '{}'",
            config.cosense.project_name
        );

        let store = providers::from_config(&config.storage).await?;
        let source: Arc<dyn PageSource> = Arc::new(CosenseClient::new(&config.cosense)?);
        tracing::info!("Page source: {}", source.name());

        let search: Arc<dyn SearchProvider> = Arc::new(HttpSearchClient::new(&config.search)?);
        tracing::info!("Search provider: {}", search.name());

        let state = Self::from_parts(config, source, store, search)?;

        let sync = &state.inner.config.sync;
        if sync.schedule_enabled {
            Scheduler::new(state.inner.queue.clone(), sync).spawn();
        } else {
            tracing::info!("Scheduled sync disabled");
        }

        Ok(state)
    }

    /// Assemble the state from ready-made components and start the sync worker
    pub fn from_parts(
        config: AppConfig,
        source: Arc<dyn PageSource>,
        store: Arc<dyn ObjectStore>,
        search: Arc<dyn SearchProvider>,
    ) -> Result<Self> {
        let assets = AssetProxy::from_config(&config.assets, &config.cosense.project_name)?;
        let answer_options = AnswerOptions::from_config(&config);

        let (queue, receiver) = SyncQueue::new(QUEUE_CAPACITY);
        let queue = Arc::new(queue.with_history(config.sync.run_history));

        let exporter = Arc::new(SyncExporter::new(&config, source, store.clone()));
        let worker = SyncWorker::new(exporter, queue.clone());
        tokio::spawn(worker.run(receiver));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                search,
                queue,
                assets,
                answer_options,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the object store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.inner.store
    }

    /// Get the search provider
    pub fn search(&self) -> &Arc<dyn SearchProvider> {
        &self.inner.search
    }

    /// Get the sync run queue
    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.inner.queue
    }

    /// Get the static asset backend
    pub fn assets(&self) -> &AssetProxy {
        &self.inner.assets
    }

    /// How answers render their sources
    pub fn answer_options(&self) -> &AnswerOptions {
        &self.inner.answer_options
    }
}
