//! Google Cloud Storage object store
//!
//! Stores exported documents in a GCS bucket so an external search index can
//! pick them up.

use async_trait::async_trait;
use bytes::Bytes;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::Error as GcsError;

use crate::error::{Error, Result};
use crate::providers::object_store::{validate_key, ObjectStore};

/// Google Cloud Storage object store
pub struct GcsObjectStore {
    client: GcsClient,
    bucket: String,
    prefix: String,
}

impl GcsObjectStore {
    /// Create a new GCS object store using application default credentials
    ///
    /// # Arguments
    /// * `bucket` - GCS bucket name
    /// * `prefix` - Object name prefix (e.g., "cosense/"), may be empty
    pub async fn new(bucket: String, prefix: String) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
            bucket,
            prefix,
        })
    }

    /// Get the full object name for a key
    fn object_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn is_not_found(err: &GcsError) -> bool {
    matches!(err, GcsError::Response(resp) if resp.code == 404)
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        validate_key(key)?;

        let mut media = Media::new(self.object_name(key));
        media.content_type = if key.ends_with(".json") {
            "application/json".into()
        } else {
            "text/markdown; charset=utf-8".into()
        };

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data,
                &UploadType::Simple(media),
            )
            .await
            .map_err(|e| Error::storage(format!("Failed to upload {} to GCS: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match self
            .client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: self.object_name(key),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
        {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(Error::storage(format!("Failed to download {} from GCS: {}", key, e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self
            .client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: self.object_name(key),
                ..Default::default()
            })
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(Error::storage(format!("Failed to delete {} from GCS: {}", key, e))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut page_token = None;

        loop {
            let response = self
                .client
                .list_objects(&ListObjectsRequest {
                    bucket: self.bucket.clone(),
                    prefix: Some(self.object_name(prefix)),
                    page_token: page_token.take(),
                    ..Default::default()
                })
                .await
                .map_err(|e| Error::storage(format!("Failed to list GCS objects: {}", e)))?;

            for item in response.items.unwrap_or_default() {
                if let Some(key) = item.name.strip_prefix(&self.prefix) {
                    keys.push(key.to_string());
                }
            }

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> Result<bool> {
        // Try to list objects (with limit 1) to check bucket access
        self.client
            .list_objects(&ListObjectsRequest {
                bucket: self.bucket.clone(),
                max_results: Some(1),
                ..Default::default()
            })
            .await
            .map(|_| true)
            .map_err(|e| Error::storage(format!("GCS health check failed: {}", e)))
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
