//! Object store abstractions for exported documents
//!
//! This module provides a trait-based abstraction that allows switching between
//! local (filesystem, memory) and cloud (R2, GCS) backends. Only R2 is indexed
//! by the AI search service.

pub mod local;
pub mod memory;
pub mod object_store;

#[cfg(feature = "gcp")]
pub mod gcp;

#[cfg(feature = "r2")]
pub mod r2;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use object_store::{validate_key, ObjectStore};

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Error, Result};

/// Build the configured object store
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::R2 => {
            #[cfg(feature = "r2")]
            {
                let r2 = config.r2.as_ref().ok_or_else(|| {
                    Error::Config("R2 backend selected but storage.r2 is missing".to_string())
                })?;
                tracing::info!("Using R2 object store {} at {}", r2.bucket, r2.endpoint_url());
                Ok(Arc::new(r2::R2ObjectStore::new(r2)?))
            }
            #[cfg(not(feature = "r2"))]
            {
                Err(Error::Config(
                    "R2 backend requires the `r2` feature".to_string(),
                ))
            }
        }
        StorageBackend::Local => {
            tracing::info!("Using local object store at {}", config.local_dir.display());
            tracing::warn!("Documents in a local store are not visible to the AI search index");
            Ok(Arc::new(LocalObjectStore::new(config.local_dir.clone())?))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store, exported documents are lost on restart");
            Ok(Arc::new(MemoryObjectStore::new()))
        }
        StorageBackend::Gcs => {
            #[cfg(feature = "gcp")]
            {
                let gcs = config.gcs.as_ref().ok_or_else(|| {
                    Error::Config("GCS backend selected but storage.gcs is missing".to_string())
                })?;
                tracing::info!("Using GCS object store gs://{}/{}", gcs.bucket, gcs.prefix);
                Ok(Arc::new(
                    gcp::GcsObjectStore::new(gcs.bucket.clone(), gcs.prefix.clone()).await?,
                ))
            }
            #[cfg(not(feature = "gcp"))]
            {
                Err(Error::Config(
                    "GCS backend requires the `gcp` feature".to_string(),
                ))
            }
        }
    }
}
