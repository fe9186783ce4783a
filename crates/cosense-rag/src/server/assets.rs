//! Static asset backend behind the API routes
//!
//! Requests that match no API route are forwarded to an upstream server or
//! served from a local directory. Every response gets the asset headers:
//! `Cache-Control: no-cache`, the configured Content-Security-Policy and a
//! `projectName` cookie.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use url::Url;

use crate::config::AssetsConfig;
use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Largest request body forwarded upstream
const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

/// Headers that describe a single connection and are never forwarded
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

enum AssetBackend {
    Upstream { client: reqwest::Client, base: String },
    Directory(ServeDir),
    Disabled,
}

/// Serves or forwards asset requests
pub struct AssetProxy {
    backend: AssetBackend,
    content_security_policy: HeaderValue,
    project_cookie: HeaderValue,
}

impl AssetProxy {
    /// Build the backend; an upstream URL takes precedence over a directory
    pub fn from_config(config: &AssetsConfig, project: &str) -> Result<Self> {
        let backend = match (&config.backend_url, &config.dir) {
            (Some(url), _) => {
                Url::parse(url)
                    .map_err(|e| Error::Config(format!("Invalid asset backend URL '{}': {}", url, e)))?;
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()?;
                tracing::info!("Forwarding asset requests to {}", url);
                AssetBackend::Upstream {
                    client,
                    base: url.trim_end_matches('/').to_string(),
                }
            }
            (None, Some(dir)) => {
                tracing::info!("Serving assets from {}", dir.display());
                AssetBackend::Directory(ServeDir::new(dir))
            }
            (None, None) => {
                tracing::warn!("No asset backend configured; unmatched paths return 404");
                AssetBackend::Disabled
            }
        };

        let content_security_policy = HeaderValue::from_str(&config.content_security_policy)
            .map_err(|e| Error::Config(format!("Invalid Content-Security-Policy: {}", e)))?;
        let project_cookie = HeaderValue::from_str(&format!("projectName={}; Path=/; SameSite=Lax", project))
            .map_err(|e| Error::Config(format!("Invalid project name for cookie: {}", e)))?;

        Ok(Self {
            backend,
            content_security_policy,
            project_cookie,
        })
    }

    /// Answer an asset request
    pub async fn handle(&self, request: Request) -> Response {
        let mut response = match &self.backend {
            AssetBackend::Upstream { client, base } => match forward(client, base, request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Asset request failed: {}", e);
                    return e.into_response();
                }
            },
            AssetBackend::Directory(dir) => match dir.clone().oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            },
            AssetBackend::Disabled => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
        };

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            self.content_security_policy.clone(),
        );
        headers.append(header::SET_COOKIE, self.project_cookie.clone());
        response
    }
}

/// Fallback handler for every path without an API route
pub async fn proxy(State(state): State<AppState>, request: Request) -> Response {
    state.assets().handle(request).await
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy headers except connection-level ones and `extra`
fn filter_headers(source: &HeaderMap, extra: &[HeaderName]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_hop_by_hop(name) || extra.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Forward a request upstream, returning the upstream response as is
async fn forward(client: &reqwest::Client, base: &str, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", base, path);

    let body = to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|e| Error::Asset(format!("Failed to read request body: {}", e)))?;

    // Request headers go to the upstream only, never back to the client
    let headers = filter_headers(&parts.headers, &[header::HOST, header::CONTENT_LENGTH]);

    let upstream = client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| Error::Asset(format!("Upstream request to {} failed: {}", url, e)))?;

    let status = upstream.status();
    let headers = filter_headers(upstream.headers(), &[]);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
