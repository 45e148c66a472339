//! Chat persistence domain services.
//!
//! These services implement the chat driving ports for transcript reads,
//! sidebar listings, and chat deletion, plus guest identity provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{PageEnvelope, PageRequest};

use crate::domain::Error;
use crate::domain::chat::{ChatId, ChatSummary};
use crate::domain::ports::{
    ChatOps, ChatRepository, ChatTranscript, RepositoryError, UserOps, UserRepository,
};
use crate::domain::user::{User, UserId};

pub(crate) fn map_repository_error(error: RepositoryError) -> Error {
    match error {
        RepositoryError::Connection { message } => {
            Error::service_unavailable(format!("repository unavailable: {message}"))
        }
        RepositoryError::Query { message } => {
            Error::internal(format!("repository error: {message}"))
        }
    }
}

/// Chat service implementing the chat driving port.
#[derive(Clone)]
pub struct ChatService<R> {
    chat_repo: Arc<R>,
}

impl<R> ChatService<R> {
    /// Create a new chat service over the chat repository.
    pub fn new(chat_repo: Arc<R>) -> Self {
        Self { chat_repo }
    }
}

impl<R> ChatService<R>
where
    R: ChatRepository,
{
    /// Fetch a chat only if `user` owns it. Missing and foreign chats are
    /// indistinguishable to the caller.
    async fn owned_chat(
        &self,
        user: &UserId,
        chat: &ChatId,
    ) -> Result<crate::domain::chat::Chat, Error> {
        let found = self
            .chat_repo
            .find_chat(chat)
            .await
            .map_err(map_repository_error)?;
        match found {
            Some(record) if record.owner == *user => Ok(record),
            _ => Err(Error::not_found(format!("chat {chat} not found"))),
        }
    }
}

#[async_trait]
impl<R> ChatOps for ChatService<R>
where
    R: ChatRepository,
{
    async fn transcript(&self, user: &UserId, chat: &ChatId) -> Result<ChatTranscript, Error> {
        let record = self.owned_chat(user, chat).await?;
        let messages = self
            .chat_repo
            .messages_for_chat(chat)
            .await
            .map_err(map_repository_error)?;
        Ok(ChatTranscript {
            chat: record,
            messages,
        })
    }

    async fn recent_chats(
        &self,
        user: &UserId,
        page: &PageRequest,
    ) -> Result<PageEnvelope<ChatSummary>, Error> {
        let (summaries, total) = self
            .chat_repo
            .list_recent(user, page)
            .await
            .map_err(map_repository_error)?;
        Ok(PageEnvelope::new(summaries, page, total))
    }

    async fn delete_chat(&self, user: &UserId, chat: &ChatId) -> Result<(), Error> {
        let found = self
            .chat_repo
            .find_chat(chat)
            .await
            .map_err(map_repository_error)?;
        match found {
            Some(record) if record.owner == *user => {}
            Some(_) => return Err(Error::forbidden("chat belongs to another user")),
            None => return Err(Error::not_found(format!("chat {chat} not found"))),
        }
        // Messages first so an interruption never leaves orphans.
        self.chat_repo
            .delete_messages(chat)
            .await
            .map_err(map_repository_error)?;
        self.chat_repo
            .delete_chat(chat)
            .await
            .map_err(map_repository_error)
    }
}

/// Guest identity service implementing the user driving port.
#[derive(Clone)]
pub struct GuestUserService<R> {
    user_repo: Arc<R>,
}

impl<R> GuestUserService<R> {
    /// Create a new guest identity service over the user repository.
    pub fn new(user_repo: Arc<R>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl<R> UserOps for GuestUserService<R>
where
    R: UserRepository,
{
    async fn register_guest(&self, display_name: Option<String>) -> Result<User, Error> {
        let display_name = display_name.unwrap_or_else(|| "Guest".to_owned());
        let user = User::new(UserId::mint(), display_name)
            .map_err(|err| Error::invalid_request(format!("invalid display name: {err}")))?;
        self.user_repo
            .insert(&user)
            .await
            .map_err(map_repository_error)?;
        Ok(user)
    }
}

#[cfg(test)]
#[path = "chat_service_tests.rs"]
mod tests;
