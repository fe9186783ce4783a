//! cosense-rag: mirror a Cosense project into object storage and answer
//! questions over it with cited sources
//!
//! A sync run pages through the project's listing API, renders each page as
//! an MDX document with front matter and writes it to an object store indexed
//! by a managed AI search service. The HTTP server answers questions through
//! that service, appends links back to the source pages, and proxies static
//! assets for the frontend.

pub mod config;
pub mod cosense;
pub mod error;
pub mod export;
pub mod processing;
pub mod providers;
pub mod search;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use export::{SyncExporter, SyncReport};
pub use server::CosenseRagServer;
