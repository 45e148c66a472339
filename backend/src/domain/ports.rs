//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the relational store, the object store, upstream completion APIs).
//! Each trait exposes strongly typed errors so adapters map their failures
//! into predictable variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use pagination::PageRequest;
use thiserror::Error;

use super::attachment::{AttachmentRecord, FileFilter, StorageKey};
use super::chat::{Chat, ChatId, ChatSummary, Message};
use super::user::{User, UserId};

/// Errors surfaced by the relational persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Pool exhaustion or connectivity failures.
    #[error("repository connection failed: {message}")]
    Connection {
        /// Human-readable description of the failure.
        message: String,
    },
    /// Query construction or execution failures.
    #[error("repository query failed: {message}")]
    Query {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl RepositoryError {
    /// Helper for connection related adapter errors.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Chat and message persistence operations the domain relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Fetch a chat by id, regardless of owner.
    async fn find_chat(&self, id: &ChatId) -> Result<Option<Chat>, RepositoryError>;

    /// Persist a new chat row.
    async fn create_chat(&self, chat: &Chat) -> Result<(), RepositoryError>;

    /// Append an immutable message to a chat.
    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError>;

    /// All messages of a chat, ordered oldest first.
    async fn messages_for_chat(&self, id: &ChatId) -> Result<Vec<Message>, RepositoryError>;

    /// One page of an owner's chats, newest first, with the owner's total
    /// chat count.
    async fn list_recent(
        &self,
        owner: &UserId,
        page: &PageRequest,
    ) -> Result<(Vec<ChatSummary>, u64), RepositoryError>;

    /// Overwrite a chat's title.
    async fn set_title(&self, id: &ChatId, title: &str) -> Result<(), RepositoryError>;

    /// Delete all messages of a chat. Runs before [`Self::delete_chat`] so
    /// a failure between the two never orphans messages without a parent.
    async fn delete_messages(&self, id: &ChatId) -> Result<(), RepositoryError>;

    /// Delete the chat row itself.
    async fn delete_chat(&self, id: &ChatId) -> Result<(), RepositoryError>;
}

/// Attachment metadata persistence operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Persist a confirmed upload.
    async fn insert(&self, record: &AttachmentRecord) -> Result<(), RepositoryError>;

    /// Fetch a record by key, regardless of owner.
    async fn find(&self, key: &StorageKey) -> Result<Option<AttachmentRecord>, RepositoryError>;

    /// One page of an owner's files under a filter, with the filtered
    /// total.
    async fn list(
        &self,
        owner: &UserId,
        filter: &FileFilter,
        page: &PageRequest,
    ) -> Result<(Vec<AttachmentRecord>, u64), RepositoryError>;

    /// Delete a record by key.
    async fn delete(&self, key: &StorageKey) -> Result<(), RepositoryError>;
}

/// User persistence operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user row.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Fetch a user by id.
    async fn find(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
}

/// Errors surfaced by the object store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// No object exists under the requested key.
    #[error("object {key} does not exist")]
    Missing {
        /// Storage key that was requested.
        key: String,
    },
    /// Request signing failures.
    #[error("object store signing failed: {message}")]
    Signing {
        /// Human-readable description of the failure.
        message: String,
    },
    /// Transport or service-side failures.
    #[error("object store backend failure: {message}")]
    Backend {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl ObjectStoreError {
    /// Helper for missing objects.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Helper for signing failures.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Helper for backend failures.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// A presigned URL with its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The signed URL.
    pub url: String,
    /// Instant after which the URL stops working.
    pub expires_at: DateTime<Utc>,
}

/// S3-compatible object store operations the upload gateway relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presign a PUT for a new object with the declared content type.
    async fn presign_put(
        &self,
        key: &StorageKey,
        content_type: &str,
    ) -> Result<PresignedUrl, ObjectStoreError>;

    /// Size of the object under `key`, or [`ObjectStoreError::Missing`].
    async fn head_size(&self, key: &StorageKey) -> Result<u64, ObjectStoreError>;

    /// Presign a GET for an existing object.
    async fn presign_get(&self, key: &StorageKey) -> Result<PresignedUrl, ObjectStoreError>;

    /// Delete the object under `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &StorageKey) -> Result<(), ObjectStoreError>;
}

/// Errors surfaced by upstream completion adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The upstream rejected the credential.
    #[error("upstream rejected the credential")]
    BadCredential,
    /// The upstream rejected the request as malformed.
    #[error("upstream rejected the request: {message}")]
    Rejected {
        /// Upstream rejection detail.
        message: String,
    },
    /// Transport failures reaching the upstream.
    #[error("upstream transport failure: {message}")]
    Transport {
        /// Transport failure detail.
        message: String,
    },
}

impl CompletionError {
    /// Helper for rejected requests.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// One typed part of a prompt message handed to a completion backend.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    /// Plain text.
    Text(String),
    /// Image referenced by URL; the upstream fetches it.
    ImageUrl(String),
    /// Raw document bytes with their MIME type.
    Blob {
        /// Declared MIME type of the bytes.
        mime_type: String,
        /// The document bytes.
        data: Bytes,
    },
}

/// One prompt message in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    /// Role string as the upstream expects it (`user`/`assistant`).
    pub role: &'static str,
    /// Ordered message parts.
    pub parts: Vec<PromptPart>,
}

/// A fully resolved completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Provider-qualified model id.
    pub model: String,
    /// System prompt prepended to the conversation.
    pub system: String,
    /// Conversation history, oldest first.
    pub messages: Vec<PromptMessage>,
    /// Caller-supplied API credential.
    pub credential: String,
    /// Optional completion token cap.
    pub max_tokens: Option<u32>,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

/// Incremental event emitted while a completion streams.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A run of answer text.
    TextDelta(String),
    /// A run of reasoning text, for models that expose it.
    Reasoning(String),
    /// A citation source surfaced mid-stream.
    Source {
        /// Source title.
        title: String,
        /// Source URL.
        url: String,
    },
    /// Token accounting reported by the upstream.
    Usage {
        /// Prompt tokens billed.
        prompt_tokens: u64,
        /// Completion tokens billed.
        completion_tokens: u64,
    },
    /// Upstream finished cleanly.
    Done,
}

/// Boxed stream of completion events.
pub type CompletionStream = BoxStream<'static, Result<StreamEvent, CompletionError>>;

/// Upstream completion API operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Start a streaming completion.
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError>;

    /// Run a one-shot, non-streaming completion and return the answer
    /// text. Used for title generation.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Errors surfaced when fetching document bytes for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentFetchError {
    /// The document URL returned a non-success status.
    #[error("document fetch returned status {status}")]
    Status {
        /// HTTP status code returned.
        status: u16,
    },
    /// Transport failures reaching the document URL.
    #[error("document fetch failed: {message}")]
    Transport {
        /// Transport failure detail.
        message: String,
    },
}

impl DocumentFetchError {
    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Fetches document bytes referenced by message parts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Download the bytes behind a document URL.
    async fn fetch(&self, url: &str) -> Result<Bytes, DocumentFetchError>;
}

// ---------------------------------------------------------------------------
// Driving ports: what inbound adapters may ask the domain to do.
// ---------------------------------------------------------------------------

use pagination::PageEnvelope;

use super::Error;
use super::attachment::FileKind;

/// A chat together with its full ordered transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTranscript {
    /// The chat.
    pub chat: Chat,
    /// Messages, oldest first.
    pub messages: Vec<Message>,
}

/// Driving port for reading and deleting persisted chats.
#[async_trait]
pub trait ChatOps: Send + Sync {
    /// Full transcript of one of `user`'s chats.
    ///
    /// Chats that do not exist and chats owned by somebody else both
    /// surface as not-found; the response never reveals which.
    async fn transcript(&self, user: &UserId, chat: &ChatId) -> Result<ChatTranscript, Error>;

    /// One page of `user`'s chats, newest first.
    async fn recent_chats(
        &self,
        user: &UserId,
        page: &PageRequest,
    ) -> Result<PageEnvelope<ChatSummary>, Error>;

    /// Delete one of `user`'s chats and its messages.
    async fn delete_chat(&self, user: &UserId, chat: &ChatId) -> Result<(), Error>;
}

/// Driving port for background title generation.
#[async_trait]
pub trait TitleOps: Send + Sync {
    /// Generate and persist a short title for a chat from its first user
    /// message. Returns `None` when the upstream call fails; title
    /// generation is best effort and never surfaces upstream errors.
    async fn generate_title(
        &self,
        user: &UserId,
        chat: &ChatId,
        credential: &str,
    ) -> Result<Option<String>, Error>;
}

/// Client declaration of an intended upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Original filename, metadata only.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Declared size in bytes.
    pub size: u64,
}

/// Grant allowing the client to PUT directly to the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGrant {
    /// Key the object must land under.
    pub key: StorageKey,
    /// Presigned PUT URL.
    pub upload: PresignedUrl,
}

/// Client confirmation that a granted upload completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfirmation {
    /// Key from the grant.
    pub key: StorageKey,
    /// Original filename.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Size the client believes it uploaded.
    pub size: u64,
    /// Optional user-assigned tags.
    pub tags: Vec<String>,
}

/// A readable URL for a confirmed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// CDN or presigned GET URL.
    pub url: String,
    /// Expiry of the URL; `None` for permanent CDN URLs.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query parameters for the file library listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileListRequest {
    /// Restrict to one coarse kind.
    pub kind: Option<FileKind>,
    /// Case-insensitive substring match on the filename.
    pub search: Option<String>,
    /// Sort largest-first instead of newest-first.
    pub sort_by_size: bool,
}

/// Driving port for the object storage gateway.
#[async_trait]
pub trait UploadOps: Send + Sync {
    /// Validate a declaration and mint a presigned PUT grant.
    async fn request_upload(
        &self,
        user: &UserId,
        request: UploadRequest,
    ) -> Result<UploadGrant, Error>;

    /// Verify the object landed within policy and persist its record.
    async fn confirm_upload(
        &self,
        user: &UserId,
        confirmation: UploadConfirmation,
    ) -> Result<AttachmentRecord, Error>;

    /// Resolve a confirmed upload to a readable URL.
    async fn resolve(&self, user: &UserId, key: &StorageKey) -> Result<ResolvedFile, Error>;

    /// One page of `user`'s confirmed uploads.
    async fn list_files(
        &self,
        user: &UserId,
        request: FileListRequest,
        page: &PageRequest,
    ) -> Result<PageEnvelope<AttachmentRecord>, Error>;

    /// Delete a confirmed upload and its object.
    async fn delete_file(&self, user: &UserId, key: &StorageKey) -> Result<(), Error>;
}

/// Driving port for guest identity provisioning.
#[async_trait]
pub trait UserOps: Send + Sync {
    /// Mint and persist a fresh guest user.
    async fn register_guest(&self, display_name: Option<String>) -> Result<User, Error>;
}
