//! HTTP server: question answering, sync control and the asset proxy

pub mod assets;
pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Cosense RAG HTTP server
pub struct CosenseRagServer {
    state: AppState,
}

impl CosenseRagServer {
    /// Create a new server, starting the sync worker and scheduler
    pub async fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config).await?;
        Ok(Self { state })
    }

    /// Create a server over existing state
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state);

        tracing::info!("Starting Cosense RAG server on http://{}", addr);
        tracing::info!("API info: http://{}/api/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        let server = &self.state.config().server;
        format!("{}:{}", server.host, server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let enable_cors = state.config().server.enable_cors;

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        // Everything else is a static asset
        .fallback(assets::proxy)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosense::PageSource;
    use crate::providers::MemoryObjectStore;
    use crate::search::SearchProvider;
    use crate::types::{PageDetail, PageListing, SearchChunk, SearchRequest, SearchResponse};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct EmptySource;

    #[async_trait]
    impl PageSource for EmptySource {
        async fn list_pages(&self, _project: &str, _skip: usize, _limit: usize) -> Result<PageListing> {
            Ok(PageListing {
                count: 0,
                pages: Vec::new(),
            })
        }

        async fn fetch_detail(&self, _project: &str, _title: &str) -> Result<Option<PageDetail>> {
            Ok(None)
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    /// Answers every question the same way and counts calls
    #[derive(Default)]
    struct CountingSearch {
        calls: AtomicUsize,
        last_query: parking_lot::Mutex<Option<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for CountingSearch {
        async fn ai_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock() = Some(request.query.clone());
            if self.fail {
                return Err(Error::search("service unavailable"));
            }
            assert!(!request.stream);
            Ok(SearchResponse {
                response: format!("About {}.", request.query),
                data: ["folder/A.mdx", "folder/B.mdx"]
                    .iter()
                    .map(|f| SearchChunk {
                        filename: f.to_string(),
                        file_id: None,
                        score: Some(0.5),
                    })
                    .collect(),
                has_more: false,
                next_page: None,
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn router_with(search: Arc<CountingSearch>) -> Router {
        let mut config = AppConfig::default();
        config.cosense.project_name = "demo".to_string();

        let state = AppState::from_parts(
            config,
            Arc::new(EmptySource),
            Arc::new(MemoryObjectStore::new()),
            search,
        )
        .unwrap();
        build_router(state)
    }

    async fn get(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get(router_with(Arc::default()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn test_ask_without_query_is_rejected() {
        let search = Arc::new(CountingSearch::default());

        for uri in ["/api/ask", "/api/ask?q=", "/api/ask?q=%20%20", "/api/ask?other=1"] {
            let response = get(router_with(search.clone()), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_string(response).await, "Missing \"q\" query parameter");
        }

        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_returns_answer_with_sources() {
        let search = Arc::new(CountingSearch::default());
        let response = get(router_with(search.clone()), "/api/ask?q=pages").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/markdown");

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            body["answer"],
            "About pages.\n\n## Sources\n- [A](https://scrapbox.io/demo/A)\n- [B](https://scrapbox.io/demo/B)"
        );
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ask_sends_question_unchanged_for_any_method() {
        let search = Arc::new(CountingSearch::default());

        let response = router_with(search.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ask?q=%20two%20words%20")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(search.last_query.lock().as_deref(), Some(" two words "));
    }

    #[tokio::test]
    async fn test_ask_search_failure_is_bad_gateway() {
        let search = Arc::new(CountingSearch {
            fail: true,
            ..Default::default()
        });
        let response = get(router_with(search), "/api/ask?q=pages").await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"]["type"], "search_error");
    }

    #[tokio::test]
    async fn test_manual_sync_run() {
        let router = router_with(Arc::default());

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        let run_id = body["run_id"].as_str().unwrap().to_string();

        let response = get(router.clone(), &format!("/api/sync/runs/{}", run_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let run: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(run["run_id"], run_id.as_str());
        assert_eq!(run["trigger"], "manual");

        let response = get(router, "/api/sync/runs").await;
        let runs: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(runs["stats"]["total_runs"], 1);
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let uri = format!("/api/sync/runs/{}", uuid::Uuid::new_v4());
        let response = get(router_with(Arc::default()), &uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unmatched_path_goes_to_assets() {
        let response = get(router_with(Arc::default()), "/some/page").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
