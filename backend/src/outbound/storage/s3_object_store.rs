//! S3-compatible object store adapter.
//!
//! Presigns direct-to-bucket PUT and GET requests so object bytes never
//! pass through this service; the only data-plane call it makes itself is
//! HeadObject at confirm time.

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::{Duration as ChronoDuration, Utc};

use crate::domain::PRESIGN_EXPIRY;
use crate::domain::StorageKey;
use crate::domain::ports::{ObjectStore, ObjectStoreError, PresignedUrl};

/// [`ObjectStore`] backed by an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Construct an adapter over a configured SDK client and bucket.
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn presigning_config() -> Result<PresigningConfig, ObjectStoreError> {
        PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|error| ObjectStoreError::signing(error.to_string()))
    }

    fn expiry_instant() -> chrono::DateTime<Utc> {
        Utc::now() + ChronoDuration::from_std(PRESIGN_EXPIRY).unwrap_or(ChronoDuration::zero())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(
        &self,
        key: &StorageKey,
        content_type: &str,
    ) -> Result<PresignedUrl, ObjectStoreError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .presigned(Self::presigning_config()?)
            .await
            .map_err(|error| ObjectStoreError::signing(error.to_string()))?;
        Ok(PresignedUrl {
            url: request.uri().to_owned(),
            expires_at: Self::expiry_instant(),
        })
    }

    async fn head_size(&self, key: &StorageKey) -> Result<u64, ObjectStoreError> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|error| {
                let service_error = error.into_service_error();
                if service_error.is_not_found() {
                    ObjectStoreError::missing(key.as_str())
                } else {
                    ObjectStoreError::backend(service_error.to_string())
                }
            })?;
        let length = head.content_length().unwrap_or_default();
        u64::try_from(length)
            .map_err(|_| ObjectStoreError::backend("object reports a negative content length"))
    }

    async fn presign_get(&self, key: &StorageKey) -> Result<PresignedUrl, ObjectStoreError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(Self::presigning_config()?)
            .await
            .map_err(|error| ObjectStoreError::signing(error.to_string()))?;
        Ok(PresignedUrl {
            url: request.uri().to_owned(),
            expires_at: Self::expiry_instant(),
        })
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError> {
        // DeleteObject on a missing key already succeeds, matching the
        // port contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|error| ObjectStoreError::backend(error.into_service_error().to_string()))?;
        Ok(())
    }
}
