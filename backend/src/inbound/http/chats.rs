//! Chat API handlers.
//!
//! ```text
//! GET    /api/v1/chats/recent?page&limit   paginated sidebar listing
//! GET    /api/v1/chats/{id}                full transcript
//! DELETE /api/v1/chats/{id}                delete chat and messages
//! POST   /api/v1/chats/{id}/title          best-effort title generation
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use pagination::{PageEnvelope, PageRequest, PageRequestError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{ChatId, ChatSummary, Error, Message};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Parse and validate a chat id from a path segment.
pub(crate) fn parse_chat_id(raw: &str) -> Result<ChatId, Error> {
    ChatId::new(raw).map_err(|err| {
        Error::invalid_request(format!("invalid chat id: {err}"))
            .with_details(json!({ "field": "id" }))
    })
}

/// Pagination query parameters shared by listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub(crate) fn to_request(&self) -> Result<PageRequest, Error> {
        PageRequest::new(self.page, self.limit).map_err(|err| {
            let field = match err {
                PageRequestError::PageOutOfRange => "page",
                PageRequestError::LimitTooSmall | PageRequestError::LimitTooLarge => "limit",
            };
            Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
        })
    }
}

/// One sidebar entry.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryDto {
    /// Chat identifier.
    pub id: String,
    /// Current title, possibly empty.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<ChatSummary> for ChatSummaryDto {
    fn from(summary: ChatSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            title: summary.title,
            created_at: summary.created_at,
        }
    }
}

/// One transcript message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    /// Message identifier.
    pub id: String,
    /// `user` or `assistant`.
    pub role: String,
    /// Plain string or typed part list.
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Message> for MessageDto {
    type Error = Error;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        let content = serde_json::to_value(&message.content)
            .map_err(|err| Error::internal(format!("unserialisable message content: {err}")))?;
        Ok(Self {
            id: message.id.to_string(),
            role: message.role.as_str().to_owned(),
            content,
            created_at: message.created_at,
        })
    }
}

/// Full transcript response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    /// Chat identifier.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Current title, possibly empty.
    pub title: String,
    /// Messages, oldest first.
    pub messages: Vec<MessageDto>,
}

/// List the caller's chats, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/chats/recent",
    params(
        ("page" = Option<u32>, Query, description = "1-indexed page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "One page of chats with pagination totals"),
        (status = 400, description = "Invalid paging", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["chats"],
    operation_id = "listRecentChats"
)]
#[get("/chats/recent")]
pub async fn list_recent(
    session: SessionContext,
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let page = query.to_request()?;
    let envelope = state.chats.recent_chats(&user, &page).await?;
    let envelope = PageEnvelope {
        data: envelope.data.into_iter().map(ChatSummaryDto::from).collect(),
        pagination: envelope.pagination,
    };
    Ok(HttpResponse::Ok().json(envelope))
}

/// Fetch a full transcript.
#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}",
    params(("id" = String, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Transcript", body = TranscriptResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "No such chat for this user", body = Error)
    ),
    tags = ["chats"],
    operation_id = "getChat"
)]
#[get("/chats/{id}")]
pub async fn get_chat(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let chat_id = parse_chat_id(&path.into_inner())?;
    let transcript = state.chats.transcript(&user, &chat_id).await?;
    let messages = transcript
        .messages
        .into_iter()
        .map(MessageDto::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(TranscriptResponse {
        id: transcript.chat.id.to_string(),
        owner_id: transcript.chat.owner.to_string(),
        title: transcript.chat.title,
        messages,
    }))
}

/// Delete a chat and all of its messages.
#[utoipa::path(
    delete,
    path = "/api/v1/chats/{id}",
    params(("id" = String, Path, description = "Chat identifier")),
    responses(
        (status = 204, description = "Chat deleted"),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Chat belongs to another user", body = Error),
        (status = 404, description = "No such chat", body = Error)
    ),
    tags = ["chats"],
    operation_id = "deleteChat"
)]
#[delete("/chats/{id}")]
pub async fn delete_chat(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let chat_id = parse_chat_id(&path.into_inner())?;
    state.chats.delete_chat(&user, &chat_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Title request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    /// Upstream credential for the summarisation call.
    pub credential: String,
}

/// Title response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TitleResponse {
    /// Generated title, or `null` when generation failed downstream.
    pub title: Option<String>,
}

/// Generate a title for a chat from its first user message. Best effort:
/// downstream failures yield a `null` title, never an error.
#[utoipa::path(
    post,
    path = "/api/v1/chats/{id}/title",
    params(("id" = String, Path, description = "Chat identifier")),
    request_body = TitleRequest,
    responses(
        (status = 200, description = "Generated title, or null", body = TitleResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "No such chat for this user", body = Error)
    ),
    tags = ["chats"],
    operation_id = "generateTitle"
)]
#[post("/chats/{id}/title")]
pub async fn generate_title(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<TitleRequest>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let chat_id = parse_chat_id(&path.into_inner())?;
    let title = state
        .titles
        .generate_title(&user, &chat_id, &payload.credential)
        .await?;
    Ok(HttpResponse::Ok().json(TitleResponse { title }))
}
