//! Cloudflare R2 object store
//!
//! Talks to R2 through its S3-compatible API. This is the bucket the AI search
//! instance indexes, so exported documents written here become searchable.

use async_trait::async_trait;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::object_store::{validate_key, ObjectStore};
use crate::config::R2Config;
use crate::error::{Error, Result};

/// R2 object store
pub struct R2ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
}

/// Whether an S3 call failed because the object does not exist
fn is_not_found<E>(err: &SdkError<E>) -> bool {
    err.raw_response()
        .map(|r| r.status().as_u16() == 404)
        .unwrap_or(false)
}

impl R2ObjectStore {
    /// Create a store from explicit R2 credentials
    pub fn new(config: &R2Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::Config("R2 backend selected but storage.r2.bucket is empty".to_string()));
        }

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "cosense-rag",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            // R2 ignores the region but the signer needs one
            .region(Region::new("auto"))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    /// Get the full object name for a key
    fn object_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        validate_key(key)?;

        let content_type = if key.ends_with(".json") {
            "application/json"
        } else {
            "text/markdown; charset=utf-8"
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_name(key))
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Error::storage(format!("Failed to upload {} to R2: {}", key, DisplayErrorContext(&e))))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_name(key))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => {
                return Err(Error::storage(format!(
                    "Failed to download {} from R2: {}",
                    key,
                    DisplayErrorContext(&e)
                )))
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::storage(format!("Failed to read {} from R2: {}", key, e)))?;
        Ok(Some(data.into_bytes()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_name(key))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(Error::storage(format!(
                "Failed to delete {} from R2: {}",
                key,
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(self.object_name(prefix));
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| Error::storage(format!("Failed to list R2 objects: {}", DisplayErrorContext(&e))))?;

            for object in output.contents() {
                if let Some(key) = object.key().and_then(|k| k.strip_prefix(&self.prefix)) {
                    keys.push(key.to_string());
                }
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string())
                }
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> Result<bool> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| true)
            .map_err(|e| Error::storage(format!("R2 health check failed: {}", DisplayErrorContext(&e))))
    }

    fn name(&self) -> &str {
        "r2"
    }
}
