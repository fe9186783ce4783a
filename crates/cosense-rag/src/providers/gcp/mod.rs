//! Google Cloud provider implementations

pub mod gcs_store;

pub use gcs_store::GcsObjectStore;
