//! Object storage gateway domain service.
//!
//! Uploads never pass through the backend: the client asks for a presigned
//! PUT, uploads directly to the bucket, then confirms. Confirmation is the
//! trust boundary; the service verifies what actually landed before any
//! record is written.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pagination::{PageEnvelope, PageRequest};
use url::Url;

use crate::domain::Error;
use crate::domain::attachment::{
    AttachmentRecord, FileFilter, FileSort, StorageKey, check_upload_policy,
};
use crate::domain::chat_service::map_repository_error;
use crate::domain::ports::{
    AttachmentRepository, FileListRequest, ObjectStore, ObjectStoreError, ResolvedFile,
    UploadConfirmation, UploadGrant, UploadOps, UploadRequest,
};
use crate::domain::user::UserId;

fn map_store_error(error: ObjectStoreError) -> Error {
    match error {
        ObjectStoreError::Missing { key } => Error::not_found(format!("object {key} not found")),
        ObjectStoreError::Signing { message } => {
            Error::internal(format!("object store signing error: {message}"))
        }
        ObjectStoreError::Backend { message } => {
            Error::service_unavailable(format!("object store unavailable: {message}"))
        }
    }
}

/// Upload gateway service implementing the upload driving port.
#[derive(Clone)]
pub struct UploadService<R, S> {
    attachment_repo: Arc<R>,
    store: Arc<S>,
    cdn_base_url: Option<Url>,
}

impl<R, S> UploadService<R, S> {
    /// Create a new upload service.
    ///
    /// When `cdn_base_url` is set, confirmed uploads resolve to permanent
    /// CDN URLs instead of short-lived presigned GETs.
    pub fn new(attachment_repo: Arc<R>, store: Arc<S>, cdn_base_url: Option<Url>) -> Self {
        Self {
            attachment_repo,
            store,
            cdn_base_url,
        }
    }
}

impl<R, S> UploadService<R, S>
where
    R: AttachmentRepository,
{
    /// Fetch a record only if `user` owns it. Missing and foreign keys are
    /// indistinguishable to the caller.
    async fn owned_record(
        &self,
        user: &UserId,
        key: &StorageKey,
    ) -> Result<AttachmentRecord, Error> {
        let found = self
            .attachment_repo
            .find(key)
            .await
            .map_err(map_repository_error)?;
        match found {
            Some(record) if record.owner == *user => Ok(record),
            _ => Err(Error::not_found(format!("file {key} not found"))),
        }
    }
}

#[async_trait]
impl<R, S> UploadOps for UploadService<R, S>
where
    R: AttachmentRepository,
    S: ObjectStore,
{
    async fn request_upload(
        &self,
        _user: &UserId,
        request: UploadRequest,
    ) -> Result<UploadGrant, Error> {
        check_upload_policy(&request.filename, &request.content_type, request.size)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let key = StorageKey::mint();
        let upload = self
            .store
            .presign_put(&key, &request.content_type)
            .await
            .map_err(map_store_error)?;

        Ok(UploadGrant { key, upload })
    }

    async fn confirm_upload(
        &self,
        user: &UserId,
        confirmation: UploadConfirmation,
    ) -> Result<AttachmentRecord, Error> {
        check_upload_policy(
            &confirmation.filename,
            &confirmation.content_type,
            confirmation.size,
        )
        .map_err(|err| Error::invalid_request(err.to_string()))?;

        // The bucket is the authority on what was uploaded, not the client.
        let observed = self
            .store
            .head_size(&confirmation.key)
            .await
            .map_err(|err| match err {
                ObjectStoreError::Missing { .. } => {
                    Error::invalid_request("no object was uploaded for this key")
                }
                other => map_store_error(other),
            })?;
        if observed != confirmation.size {
            return Err(Error::invalid_request(format!(
                "uploaded size {observed} does not match declared size {}",
                confirmation.size
            )));
        }
        check_upload_policy(&confirmation.filename, &confirmation.content_type, observed)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let record = AttachmentRecord {
            key: confirmation.key,
            owner: *user,
            filename: confirmation.filename,
            content_type: confirmation.content_type,
            size: observed,
            tags: confirmation.tags,
            created_at: Utc::now(),
        };
        self.attachment_repo
            .insert(&record)
            .await
            .map_err(map_repository_error)?;
        Ok(record)
    }

    async fn resolve(&self, user: &UserId, key: &StorageKey) -> Result<ResolvedFile, Error> {
        self.owned_record(user, key).await?;

        if let Some(base) = &self.cdn_base_url {
            let url = base
                .join(key.as_str())
                .map_err(|err| Error::internal(format!("invalid CDN URL: {err}")))?;
            return Ok(ResolvedFile {
                url: url.into(),
                expires_at: None,
            });
        }

        let presigned = self
            .store
            .presign_get(key)
            .await
            .map_err(map_store_error)?;
        Ok(ResolvedFile {
            url: presigned.url,
            expires_at: Some(presigned.expires_at),
        })
    }

    async fn list_files(
        &self,
        user: &UserId,
        request: FileListRequest,
        page: &PageRequest,
    ) -> Result<PageEnvelope<AttachmentRecord>, Error> {
        let filter = FileFilter {
            kind: request.kind,
            search: request.search,
            sort: if request.sort_by_size {
                FileSort::Size
            } else {
                FileSort::Recency
            },
        };
        let (records, total) = self
            .attachment_repo
            .list(user, &filter, page)
            .await
            .map_err(map_repository_error)?;
        Ok(PageEnvelope::new(records, page, total))
    }

    async fn delete_file(&self, user: &UserId, key: &StorageKey) -> Result<(), Error> {
        self.owned_record(user, key).await?;
        // Object first: a record without an object 404s harmlessly, an
        // object without a record would leak storage.
        self.store.delete(key).await.map_err(map_store_error)?;
        self.attachment_repo
            .delete(key)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "upload_service_tests.rs"]
mod tests;
