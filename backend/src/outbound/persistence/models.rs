//! Row structs bridging the Diesel schema and domain types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    AttachmentRecord, Chat, ChatId, ChatSummary, Message, MessageContent, MessageId, MessageRole,
    StorageKey, User, UserId,
};

use super::schema::{chats, files, messages, users};

/// A `users` row.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) display_name: String,
}

/// Insertable form of a `users` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub(crate) id: Uuid,
    pub(crate) display_name: &'a str,
}

/// A `chats` row.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = chats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ChatRow {
    pub(crate) id: String,
    pub(crate) user_id: Uuid,
    pub(crate) title: String,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insertable form of a `chats` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = chats)]
pub(crate) struct NewChatRow<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Uuid,
    pub(crate) title: &'a str,
    pub(crate) created_at: DateTime<Utc>,
}

/// A `messages` row.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MessageRow {
    pub(crate) id: Uuid,
    pub(crate) chat_id: String,
    pub(crate) user_id: Option<Uuid>,
    pub(crate) role: String,
    pub(crate) content: serde_json::Value,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insertable form of a `messages` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub(crate) struct NewMessageRow<'a> {
    pub(crate) id: Uuid,
    pub(crate) chat_id: &'a str,
    pub(crate) user_id: Option<Uuid>,
    pub(crate) role: &'a str,
    pub(crate) content: serde_json::Value,
    pub(crate) created_at: DateTime<Utc>,
}

/// A `files` row.
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FileRow {
    pub(crate) key: String,
    pub(crate) user_id: Uuid,
    pub(crate) name: String,
    pub(crate) content_type: String,
    pub(crate) size: i64,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Insertable form of a `files` row.
#[derive(Debug, Insertable)]
#[diesel(table_name = files)]
pub(crate) struct NewFileRow<'a> {
    pub(crate) key: &'a str,
    pub(crate) user_id: Uuid,
    pub(crate) name: &'a str,
    pub(crate) content_type: &'a str,
    pub(crate) size: i64,
    pub(crate) tags: &'a [String],
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) fn user_from_row(row: UserRow) -> Result<User, RepositoryError> {
    User::new(UserId::from_uuid(row.id), row.display_name)
        .map_err(|error| RepositoryError::query(format!("stored user is invalid: {error}")))
}

pub(crate) fn chat_from_row(row: ChatRow) -> Result<Chat, RepositoryError> {
    let id = ChatId::new(row.id)
        .map_err(|error| RepositoryError::query(format!("stored chat id is invalid: {error}")))?;
    Ok(Chat {
        id,
        owner: UserId::from_uuid(row.user_id),
        title: row.title,
        created_at: row.created_at,
    })
}

pub(crate) fn summary_from_row(row: ChatRow) -> Result<ChatSummary, RepositoryError> {
    let id = ChatId::new(row.id)
        .map_err(|error| RepositoryError::query(format!("stored chat id is invalid: {error}")))?;
    Ok(ChatSummary {
        id,
        title: row.title,
        created_at: row.created_at,
    })
}

pub(crate) fn message_from_row(row: MessageRow) -> Result<Message, RepositoryError> {
    let chat_id = ChatId::new(row.chat_id)
        .map_err(|error| RepositoryError::query(format!("stored chat id is invalid: {error}")))?;
    let role = MessageRole::from_str(&row.role)
        .map_err(|error| RepositoryError::query(error.to_string()))?;
    let content: MessageContent = serde_json::from_value(row.content).map_err(|error| {
        RepositoryError::query(format!("stored message content is invalid: {error}"))
    })?;
    Ok(Message {
        id: MessageId::from_uuid(row.id),
        chat_id,
        owner: row.user_id.map(UserId::from_uuid),
        role,
        content,
        created_at: row.created_at,
    })
}

pub(crate) fn attachment_from_row(row: FileRow) -> Result<AttachmentRecord, RepositoryError> {
    let key = StorageKey::parse(&row.key).map_err(|error| {
        RepositoryError::query(format!("stored file key is invalid: {error}"))
    })?;
    let size = u64::try_from(row.size)
        .map_err(|_| RepositoryError::query("stored file size is negative"))?;
    Ok(AttachmentRecord {
        key,
        owner: UserId::from_uuid(row.user_id),
        filename: row.name,
        content_type: row.content_type,
        size,
        tags: row.tags,
        created_at: row.created_at,
    })
}

pub(crate) fn message_content_json(content: &MessageContent) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(content)
        .map_err(|error| RepositoryError::query(format!("message content is unserialisable: {error}")))
}
