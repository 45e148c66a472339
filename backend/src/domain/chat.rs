//! Chat and message aggregates.
//!
//! Chat identifiers are minted client-side before the first round trip, so
//! they are opaque strings rather than server UUIDs. Messages are immutable
//! once stored; a chat's transcript is the ordered sequence of its messages
//! by creation time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::UserId;

/// Upper bound on client-minted chat identifier length.
pub const MAX_CHAT_ID_LEN: usize = 64;

/// Opaque, client-minted chat identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

/// Validation errors raised when constructing a [`ChatId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatIdValidationError {
    /// Identifier is empty after trimming whitespace.
    #[error("chat id must not be empty")]
    Empty,
    /// Identifier carries surrounding whitespace.
    #[error("chat id must not contain surrounding whitespace")]
    ContainsWhitespace,
    /// Identifier exceeds [`MAX_CHAT_ID_LEN`] characters.
    #[error("chat id must not exceed {MAX_CHAT_ID_LEN} characters")]
    TooLong,
}

impl ChatId {
    /// Validate and wrap a raw chat identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, ChatIdValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ChatIdValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(ChatIdValidationError::ContainsWhitespace);
        }
        if raw.chars().count() > MAX_CHAT_ID_LEN {
            return Err(ChatIdValidationError::TooLong);
        }
        Ok(Self(raw))
    }

    /// Mint a fresh random identifier the way the composer does for new
    /// chats.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ChatId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Server-minted message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Mint a fresh identifier.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an already-persisted UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Authored by the chat's owning user.
    User,
    /// Authored by the model.
    Assistant,
}

impl MessageRole {
    /// Stable lowercase name used in storage and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(UnknownRoleError(other.to_owned())),
        }
    }
}

/// Raised when a stored or inbound role string is not `user`/`assistant`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message role: {0}")]
pub struct UnknownRoleError(pub String);

/// One typed part of a structured message body.
///
/// Anything outside this closed set is a client error; deserialisation
/// fails for unknown `type` tags, which inbound adapters surface as 400.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
    /// An image the model receives by URL reference.
    Image {
        /// Publicly resolvable (or presigned) image URL.
        url: String,
    },
    /// A document the proxy fetches and forwards as raw bytes.
    Document {
        /// URL the document bytes are fetched from.
        url: String,
        /// Declared MIME type; mandatory for documents.
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

/// Message body: either a plain string or an ordered part list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body.
    Text(String),
    /// Structured body with typed parts.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// First run of plain text in the body, used as a title seed.
    pub fn seed_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }

    /// Whether the body contains any non-whitespace text or parts.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// A persisted chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    /// Client-minted identifier.
    pub id: ChatId,
    /// Owning user; never changes for the life of the chat.
    pub owner: UserId,
    /// Display title, empty until title generation runs.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Create a brand-new chat with an empty title.
    pub fn new(id: ChatId, owner: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            title: String::new(),
            created_at,
        }
    }
}

/// Sidebar projection of a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// Chat identifier.
    pub id: ChatId,
    /// Current title (possibly empty).
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An immutable persisted message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Server-minted identifier.
    pub id: MessageId,
    /// Parent chat.
    pub chat_id: ChatId,
    /// Authoring user; `None` for assistant turns.
    pub owner: Option<UserId>,
    /// Author role.
    pub role: MessageRole,
    /// Body.
    pub content: MessageContent,
    /// Creation timestamp; transcript order follows it.
    pub created_at: DateTime<Utc>,
}
