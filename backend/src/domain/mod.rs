//! Domain layer: entities, services, and the ports they speak through.
//!
//! Nothing in this module knows about HTTP, Diesel, or any SDK. Inbound
//! adapters call driving ports; driven adapters implement the traits in
//! [`ports`].

mod attachment;
mod catalog;
mod chat;
mod chat_service;
mod composer;
mod error;
mod inference;
mod session;
mod title_service;
mod upload_service;
mod user;

pub mod ports;

pub use attachment::{
    ALLOWED_MIME_TYPES, AttachmentRecord, FileFilter, FileKind, FileSort, MAX_FILE_SIZE_BYTES,
    PRESIGN_EXPIRY, StorageKey, StorageKeyError, UploadPolicyError, check_upload_policy,
    is_image_mime,
};
pub use catalog::{Capability, ModelCatalog, ModelEntry, Provider, TITLE_MODEL};
pub use chat::{
    Chat, ChatId, ChatIdValidationError, ChatSummary, ContentPart, MAX_CHAT_ID_LEN, Message,
    MessageContent, MessageId, MessageRole, UnknownRoleError,
};
pub use chat_service::{ChatService, GuestUserService};
pub use composer::{
    Composer, ComposerError, MAX_ATTACHMENTS, Slot, SlotId, SlotStatus,
};
pub use error::{Error, ErrorCode};
pub use inference::{
    ChatEvent, ChatEventStream, ChatStreamRequest, InferenceOps, InferenceService,
};
pub use session::{
    ChatAgeBucket, ChatSession, ChatSessionState, RecentChatsCache, RetryPlan, TranscriptCache,
    age_bucket, group_chats_by_age, retry_last_turn,
};
pub use title_service::TitleService;
pub use upload_service::UploadService;
pub use user::{User, UserId, UserIdValidationError, UserValidationError};
