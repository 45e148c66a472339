//! Streaming chat endpoint.
//!
//! ```text
//! POST /api/v1/chat-messages  {"id","messages","model","credential"}
//! ```
//!
//! The response is a Server-Sent-Events stream of `data:` frames, one per
//! [`ChatEvent`]. Once streaming starts, failures travel in-band as
//! `error` frames; HTTP status codes only cover pre-stream validation.

use actix_web::{HttpResponse, post, web};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{ChatEvent, ChatStreamRequest, Error, MessageContent};
use crate::inbound::http::ApiResult;
use crate::inbound::http::chats::parse_chat_id;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// One inbound conversation message.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct IncomingMessage {
    /// `user` or `assistant`.
    pub role: String,
    /// Plain string or typed part list.
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

/// Request body for `POST /api/v1/chat-messages`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesRequest {
    /// Chat identifier, client-minted for new chats.
    pub id: String,
    /// Conversation so far; the final user message is the new turn.
    pub messages: Vec<IncomingMessage>,
    /// Provider-qualified model id.
    pub model: String,
    /// Upstream credential.
    pub credential: String,
}

/// Pull the newest user-authored message out of the inbound list.
fn last_user_content(messages: &[IncomingMessage]) -> Result<MessageContent, Error> {
    let last = messages
        .iter()
        .rev()
        .find(|message| message.role == "user")
        .ok_or_else(|| Error::invalid_request("messages must contain a user message"))?;
    serde_json::from_value(last.content.clone()).map_err(|err| {
        Error::invalid_request(format!("unsupported message content: {err}"))
            .with_details(json!({ "field": "messages" }))
    })
}

/// Serialise one frame as an SSE `data:` line.
fn sse_frame(event: &ChatEvent) -> Bytes {
    match serde_json::to_string(event) {
        Ok(json) => Bytes::from(format!("data: {json}\n\n")),
        // Frames are plain data types; serialisation cannot fail in
        // practice, but a dropped frame beats a poisoned stream.
        Err(_) => Bytes::new(),
    }
}

/// Run one conversation turn and stream the answer.
#[utoipa::path(
    post,
    path = "/api/v1/chat-messages",
    request_body = ChatMessagesRequest,
    responses(
        (status = 200, description = "SSE stream of answer frames",
            content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required or bad credential", body = Error),
        (status = 403, description = "Chat belongs to another user", body = Error),
        (status = 503, description = "Upstream or store unavailable", body = Error)
    ),
    tags = ["chats"],
    operation_id = "streamChat"
)]
#[post("/chat-messages")]
pub async fn stream_chat(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<ChatMessagesRequest>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let payload = payload.into_inner();

    if payload.model.trim().is_empty() {
        return Err(Error::invalid_request("model must not be empty")
            .with_details(json!({ "field": "model" })));
    }
    if payload.messages.is_empty() {
        return Err(Error::invalid_request("messages must not be empty")
            .with_details(json!({ "field": "messages" })));
    }
    let chat = parse_chat_id(&payload.id)?;
    let content = last_user_content(&payload.messages)?;

    let frames = state
        .inference
        .stream_chat(
            &user,
            ChatStreamRequest {
                chat,
                model: payload.model,
                content,
                credential: payload.credential,
            },
        )
        .await?;

    let body = frames.map(|event| Ok::<Bytes, actix_web::Error>(sse_frame(&event)));
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("cache-control", "no-cache"))
        .streaming(body))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn incoming(role: &str, content: serde_json::Value) -> IncomingMessage {
        IncomingMessage {
            role: role.to_owned(),
            content,
        }
    }

    #[rstest]
    fn last_user_content_picks_the_newest_user_turn() {
        let messages = vec![
            incoming("user", json!("first")),
            incoming("assistant", json!("answer")),
            incoming("user", json!("second")),
        ];
        let content = last_user_content(&messages).expect("user turn found");
        assert_eq!(content, MessageContent::Text("second".to_owned()));
    }

    #[rstest]
    fn assistant_only_lists_are_rejected() {
        let messages = vec![incoming("assistant", json!("answer"))];
        assert!(last_user_content(&messages).is_err());
    }

    #[rstest]
    fn unsupported_part_types_are_rejected() {
        let messages = vec![incoming(
            "user",
            json!([{ "type": "audio", "url": "https://x" }]),
        )];
        assert!(last_user_content(&messages).is_err());
    }

    #[rstest]
    fn frames_serialise_as_sse_data_lines() {
        let frame = sse_frame(&ChatEvent::TextDelta {
            delta: "hi".to_owned(),
        });
        let text = std::str::from_utf8(&frame).expect("utf8");
        assert!(text.starts_with("data: "));
        assert!(text.ends_with("\n\n"));
        let value: serde_json::Value =
            serde_json::from_str(text.trim_start_matches("data: ").trim()).expect("json frame");
        assert_eq!(value["type"], "text-delta");
        assert_eq!(value["delta"], "hi");
    }
}
