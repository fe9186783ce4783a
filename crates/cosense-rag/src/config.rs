//! Configuration for the sync job and the HTTP server

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration, built once at startup and handed to each component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Cosense project and credentials
    pub cosense: CosenseConfig,
    /// Object store configuration
    pub storage: StorageConfig,
    /// AI search configuration
    pub search: SearchConfig,
    /// Sync run configuration
    pub sync: SyncConfig,
    /// Static asset backend
    pub assets: AssetsConfig,
}

impl AppConfig {
    /// Load defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PROJECT_NAME") {
            self.cosense.project_name = v;
        }
        if let Some(v) = lookup("COSENSE_SID") {
            self.cosense.session_id = v;
        }
        if let Some(v) = lookup("COSENSE_BASE_URL") {
            self.cosense.base_url = v;
        }
        if let Some(v) = lookup("AI_SEARCH_ID") {
            self.search.search_id = v;
        }
        if let Some(v) = lookup("AI_SEARCH_ACCOUNT_ID") {
            self.search.account_id = v;
        }
        if let Some(v) = lookup("AI_SEARCH_API_TOKEN") {
            self.search.api_token = v;
        }
        if let Some(v) = lookup("AI_SEARCH_BASE_URL") {
            self.search.base_url = v;
        }
        if let Some(v) = lookup("ASSET_BACKEND_URL") {
            self.assets.backend_url = Some(v);
        }
        if let Some(v) = lookup("ASSET_DIR") {
            self.assets.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("STORAGE_DIR") {
            self.storage.local_dir = PathBuf::from(v);
        }
        if let Some(bucket) = lookup("R2_BUCKET") {
            let r2 = self.storage.r2.get_or_insert_with(R2Config::default);
            r2.bucket = bucket;
            // The account defaults to the one owning the search instance
            if r2.account_id.is_empty() {
                r2.account_id = self.search.account_id.clone();
            }
            self.storage.backend = StorageBackend::R2;
        }
        if let Some(r2) = self.storage.r2.as_mut() {
            if let Some(v) = lookup("R2_ENDPOINT") {
                r2.endpoint = v;
            }
            if let Some(v) = lookup("R2_ACCESS_KEY_ID") {
                r2.access_key_id = v;
            }
            if let Some(v) = lookup("R2_SECRET_ACCESS_KEY") {
                r2.secret_access_key = v;
            }
        }
        if let Some(v) = lookup("STORAGE_BACKEND") {
            self.storage.backend = match v.to_ascii_lowercase().as_str() {
                "local" => StorageBackend::Local,
                "memory" => StorageBackend::Memory,
                "gcs" => StorageBackend::Gcs,
                "r2" => StorageBackend::R2,
                other => {
                    return Err(Error::Config(format!("Unknown STORAGE_BACKEND '{}'", other)));
                }
            };
        }
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PORT '{}': {}", v, e)))?;
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Cosense project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CosenseConfig {
    /// Base URL for both the API and the page links
    pub base_url: String,
    /// Project to mirror and query
    pub project_name: String,
    /// Value of the `connect.sid` session cookie
    pub session_id: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CosenseConfig {
    fn default() -> Self {
        Self {
            base_url: "https://scrapbox.io".to_string(),
            project_name: String::new(),
            session_id: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Object store backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem directory
    #[default]
    Local,
    /// Process memory (lost on restart)
    Memory,
    /// Google Cloud Storage (requires the `gcp` feature)
    Gcs,
    /// Cloudflare R2 through its S3 API (requires the `r2` feature)
    ///
    /// The bucket the AI search instance indexes; the other backends are
    /// for development and tests.
    R2,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend provider
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub local_dir: PathBuf,
    /// GCS settings (required when backend = gcs)
    pub gcs: Option<GcsConfig>,
    /// R2 settings (required when backend = r2)
    pub r2: Option<R2Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let local_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cosense-rag")
            .join("objects");

        Self {
            backend: StorageBackend::Local,
            local_dir,
            gcs: None,
            r2: None,
        }
    }
}

/// Google Cloud Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,
    /// Object name prefix prepended to every key (default: none)
    #[serde(default)]
    pub prefix: String,
}

/// Cloudflare R2 configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct R2Config {
    /// S3 endpoint; derived from `account_id` when empty
    pub endpoint: String,
    /// Cloudflare account owning the bucket
    pub account_id: String,
    /// Bucket name
    pub bucket: String,
    /// R2 API token access key id
    pub access_key_id: String,
    /// R2 API token secret
    pub secret_access_key: String,
    /// Object name prefix prepended to every key (default: none)
    pub prefix: String,
}

impl R2Config {
    /// `https://{account_id}.r2.cloudflarestorage.com` unless an endpoint is set
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.is_empty() {
            format!("https://{}.r2.cloudflarestorage.com", self.account_id)
        } else {
            self.endpoint.clone()
        }
    }
}

/// AI search (retrieval-augmented generation) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API base URL
    pub base_url: String,
    /// Account that owns the search instance
    pub account_id: String,
    /// Search instance identifier
    pub search_id: String,
    /// Bearer token
    pub api_token: String,
    /// Maximum number of retrieved documents per question
    pub max_num_results: u32,
    /// Instructions sent with every question
    pub system_prompt: String,
    /// Heading of the appended sources section
    pub sources_heading: String,
    /// Collapse repeated source pages into one link
    pub dedupe_sources: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Default instructions for the answer model
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"# Follow these rules when answering the user's question.
## Ground rules (violating them is a failure)
- Never mix in knowledge from outside the collected data.

## When information is missing
- If the provided data cannot fully answer the question, or only fragments are available, say so.

## Output format (strict)

### Answer
Combine the information in the collected data into an answer. Cite the source immediately after each claim.

**Structure:**
1. Start with a short summary or conclusion.
2. Place the supporting quote and link right after each claim or fact.
3. Keep multiple sources clearly distinguished.
4. If there are Gyazo links or images, quote them and use them in the explanation.

### Limits of the information
State what the collected data does not cover or what could not be confirmed."#;

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
            account_id: String::new(),
            search_id: String::new(),
            api_token: String::new(),
            max_num_results: 5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            sources_heading: "## Sources".to_string(),
            dedupe_sources: false,
            timeout_secs: 120,
        }
    }
}

/// Sync run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size requested from the listing API
    pub page_limit: usize,
    /// Maximum page details fetched and written at once
    pub max_concurrency: usize,
    /// Run the scheduled trigger
    pub schedule_enabled: bool,
    /// Seconds between scheduled runs
    pub interval_secs: u64,
    /// Fire the trigger once immediately at startup
    pub run_on_startup: bool,
    /// Resume from a leftover checkpoint instead of starting at offset 0
    pub resume: bool,
    /// Finished runs kept for `/api/sync/runs`
    pub run_history: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_limit: 100,
            max_concurrency: 8,
            schedule_enabled: true,
            interval_secs: 60 * 60,
            run_on_startup: false,
            resume: true,
            run_history: 100,
        }
    }
}

/// Static asset backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Upstream to forward asset requests to (takes precedence over `dir`)
    pub backend_url: Option<String>,
    /// Local directory to serve assets from
    pub dir: Option<PathBuf>,
    /// Content-Security-Policy added to every asset response
    pub content_security_policy: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            dir: None,
            content_security_policy:
                "default-src 'self'; img-src 'self' data: https:; style-src 'self' 'unsafe-inline';"
                    .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cosense.base_url, "https://scrapbox.io");
        assert_eq!(config.search.max_num_results, 5);
        assert_eq!(config.sync.page_limit, 100);
        assert!(!config.search.dedupe_sources);
        assert_eq!(config.storage.backend, StorageBackend::Local);
    }

    #[test]
    fn test_r2_env_selects_backend() {
        let vars: HashMap<&str, &str> = [
            ("AI_SEARCH_ACCOUNT_ID", "acct"),
            ("R2_BUCKET", "pages"),
            ("R2_ACCESS_KEY_ID", "key"),
            ("R2_SECRET_ACCESS_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::R2);
        let r2 = config.storage.r2.unwrap();
        assert_eq!(r2.bucket, "pages");
        assert_eq!(r2.access_key_id, "key");
        assert_eq!(r2.endpoint_url(), "https://acct.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_unknown_storage_backend() {
        let mut config = AppConfig::default();
        let result = config.apply_env_with(|key| (key == "STORAGE_BACKEND").then(|| "ftp".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PROJECT_NAME", "villagepump"),
            ("COSENSE_SID", "s%3Asecret"),
            ("AI_SEARCH_ID", "pump-search"),
            ("PORT", "9090"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.cosense.project_name, "villagepump");
        assert_eq!(config.cosense.session_id, "s%3Asecret");
        assert_eq!(config.search.search_id, "pump-search");
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_with(|key| (key == "PORT").then(|| "eighty".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            [cosense]
            project_name = "help-jp"

            [sync]
            max_concurrency = 4

            [storage]
            backend = "memory"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.cosense.project_name, "help-jp");
        assert_eq!(config.cosense.base_url, "https://scrapbox.io");
        assert_eq!(config.sync.max_concurrency, 4);
        assert_eq!(config.sync.page_limit, 100);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }
}
