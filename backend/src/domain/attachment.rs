//! File attachment primitives and upload policy.
//!
//! Objects live under opaque `f/<uuid>` keys in the bucket; the original
//! filename is metadata only and never influences the key. Policy checks
//! run twice: at presign time against the client's declaration, and at
//! confirm time against what actually landed in the bucket.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::UserId;

/// Hard cap on a single uploaded object.
pub const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types the upload gateway accepts.
pub const ALLOWED_MIME_TYPES: [&str; 7] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/heic",
    "text/plain",
    "application/pdf",
];

/// Lifetime of presigned PUT and GET URLs.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);

/// Bucket key prefix for uploaded files.
const KEY_PREFIX: &str = "f/";

/// Opaque bucket key of the form `f/<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

/// Validation errors raised when parsing a [`StorageKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageKeyError {
    /// Keys must start with the `f/` prefix.
    #[error("storage key must start with `f/`")]
    MissingPrefix,
    /// The suffix after the prefix must be a UUID.
    #[error("storage key suffix must be a UUID")]
    InvalidSuffix,
}

impl StorageKey {
    /// Mint a fresh key for a new upload.
    pub fn mint() -> Self {
        Self(format!("{KEY_PREFIX}{}", Uuid::new_v4()))
    }

    /// Parse a key previously minted by [`StorageKey::mint`].
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, StorageKeyError> {
        let raw = raw.as_ref();
        let suffix = raw
            .strip_prefix(KEY_PREFIX)
            .ok_or(StorageKeyError::MissingPrefix)?;
        Uuid::parse_str(suffix).map_err(|_| StorageKeyError::InvalidSuffix)?;
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Upload declaration rejected by policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadPolicyError {
    /// Declared or observed size exceeds [`MAX_FILE_SIZE_BYTES`].
    #[error("file exceeds the {MAX_FILE_SIZE_BYTES} byte limit")]
    FileTooLarge,
    /// Declared MIME type is outside [`ALLOWED_MIME_TYPES`].
    #[error("file type {0} is not allowed")]
    TypeNotAllowed(String),
    /// Declared filename is blank.
    #[error("filename must not be blank")]
    BlankFilename,
}

/// Validate a client upload declaration against the gateway policy.
pub fn check_upload_policy(
    filename: &str,
    content_type: &str,
    size: u64,
) -> Result<(), UploadPolicyError> {
    if filename.trim().is_empty() {
        return Err(UploadPolicyError::BlankFilename);
    }
    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(UploadPolicyError::TypeNotAllowed(content_type.to_owned()));
    }
    if size > MAX_FILE_SIZE_BYTES {
        return Err(UploadPolicyError::FileTooLarge);
    }
    Ok(())
}

/// Whether a MIME type counts as an image for capability gating.
pub fn is_image_mime(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// A confirmed upload as the persistence layer stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRecord {
    /// Bucket key.
    pub key: StorageKey,
    /// Uploading user.
    pub owner: UserId,
    /// Original filename, metadata only.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Size observed in the bucket at confirm time.
    pub size: u64,
    /// Optional user-assigned tags.
    pub tags: Vec<String>,
    /// Confirmation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Coarse file kind used by the library view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Any `image/*` MIME type.
    Image,
    /// Everything else (documents, plain text).
    Document,
}

/// Sort order for the file library listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSort {
    /// Newest first.
    #[default]
    Recency,
    /// Largest first.
    Size,
}

/// Filter applied when listing a user's files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileFilter {
    /// Restrict to one coarse kind.
    pub kind: Option<FileKind>,
    /// Case-insensitive substring match on the filename.
    pub search: Option<String>,
    /// Sort order.
    pub sort: FileSort,
}

impl FileKind {
    /// Whether a record's MIME type falls in this kind.
    pub fn matches(&self, content_type: &str) -> bool {
        match self {
            Self::Image => is_image_mime(content_type),
            Self::Document => !is_image_mime(content_type),
        }
    }
}
