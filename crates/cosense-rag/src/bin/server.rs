//! Cosense RAG server binary
//!
//! Run with: cargo run -p cosense-rag --bin cosense-rag-server -- [serve|sync]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use cosense_rag::{
    config::AppConfig,
    cosense::{CosenseClient, PageSource},
    export::SyncExporter,
    providers,
    server::CosenseRagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cosense-rag-server")]
#[command(about = "Mirror a Cosense project and answer questions over it", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, env = "COSENSE_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server with the scheduled sync (default)
    Serve,
    /// Run one sync pass and exit
    Sync,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cosense_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Project: {}", config.cosense.project_name);
    tracing::info!("  - Storage: {:?}", config.storage.backend);
    tracing::info!("  - Page limit: {}", config.sync.page_limit);
    tracing::info!("  - Max concurrency: {}", config.sync.max_concurrency);

    if config.cosense.project_name.is_empty() {
        tracing::warn!("PROJECT_NAME is not set; Cosense API calls will fail");
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Sync => sync_once(config).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let server = CosenseRagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  GET  /api/ask?q=     - Ask a question");
    println!("  POST /api/sync       - Start a sync run");
    println!("  GET  /api/sync/runs  - List sync runs");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}

async fn sync_once(config: AppConfig) -> anyhow::Result<()> {
    let store = providers::from_config(&config.storage).await?;
    let source: Arc<dyn PageSource> = Arc::new(CosenseClient::new(&config.cosense)?);
    let exporter = SyncExporter::new(&config, source, store);

    let report = exporter
        .sync_all(uuid::Uuid::new_v4(), |progress| {
            tracing::debug!(
                "Batch done: {} written, {} skipped, {} failed",
                progress.written,
                progress.skipped,
                progress.failed
            );
        })
        .await?;

    println!("{}", report.message());
    if report.skipped > 0 || report.failed > 0 {
        println!("  skipped: {}, failed: {}", report.skipped, report.failed);
    }

    Ok(())
}
