//! Diesel-backed chat and message persistence.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::ports::{ChatRepository, RepositoryError};
use crate::domain::{Chat, ChatId, ChatSummary, Message, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    ChatRow, MessageRow, NewChatRow, NewMessageRow, chat_from_row, message_content_json,
    message_from_row, summary_from_row,
};
use super::pool::DbPool;
use super::schema::{chats, messages};

/// [`ChatRepository`] backed by PostgreSQL via Diesel.
#[derive(Debug, Clone)]
pub struct DieselChatRepository {
    pool: DbPool,
}

impl DieselChatRepository {
    /// Construct a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for DieselChatRepository {
    async fn find_chat(&self, id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = chats::table
            .filter(chats::id.eq(id.as_str()))
            .select(ChatRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(chat_from_row).transpose()
    }

    async fn create_chat(&self, chat: &Chat) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewChatRow {
            id: chat.id.as_str(),
            user_id: *chat.owner.as_uuid(),
            title: &chat.title,
            created_at: chat.created_at,
        };
        diesel::insert_into(chats::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewMessageRow {
            id: *message.id.as_uuid(),
            chat_id: message.chat_id.as_str(),
            user_id: message.owner.as_ref().map(|owner| *owner.as_uuid()),
            role: message.role.as_str(),
            content: message_content_json(&message.content)?,
            created_at: message.created_at,
        };
        diesel::insert_into(messages::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn messages_for_chat(&self, id: &ChatId) -> Result<Vec<Message>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MessageRow> = messages::table
            .filter(messages::chat_id.eq(id.as_str()))
            .order(messages::created_at.asc())
            .select(MessageRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn list_recent(
        &self,
        owner: &UserId,
        page: &PageRequest,
    ) -> Result<(Vec<ChatSummary>, u64), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = chats::table
            .filter(chats::user_id.eq(owner.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let rows: Vec<ChatRow> = chats::table
            .filter(chats::user_id.eq(owner.as_uuid()))
            .order(chats::created_at.desc())
            .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .limit(i64::from(page.limit()))
            .select(ChatRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let summaries = rows
            .into_iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((summaries, u64::try_from(total).unwrap_or_default()))
    }

    async fn set_title(&self, id: &ChatId, title: &str) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(chats::table.filter(chats::id.eq(id.as_str())))
            .set(chats::title.eq(title))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn delete_messages(&self, id: &ChatId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(messages::table.filter(messages::chat_id.eq(id.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn delete_chat(&self, id: &ChatId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(chats::table.filter(chats::id.eq(id.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}
