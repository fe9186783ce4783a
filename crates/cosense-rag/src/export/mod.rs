//! Export of Cosense pages into MDX documents in the object store

pub mod checkpoint;
pub mod exporter;
pub mod formatter;

pub use checkpoint::{SyncCheckpoint, CHECKPOINT_KEY};
pub use exporter::{SyncExporter, SyncProgress, SyncReport};
pub use formatter::{format_document, sanitize_title, source_url, EXPORT_EXTENSION, EXPORT_PREFIX};
