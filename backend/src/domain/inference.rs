//! Streaming inference proxy service.
//!
//! One request carries a full conversation turn: the service persists the
//! user message, streams the model's answer back as it arrives, and
//! persists the assistant message once the upstream finishes cleanly. The
//! upstream read runs in its own task so a client disconnect mid-stream
//! never loses the assistant's answer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use crate::domain::Error;
use crate::domain::catalog::{Capability, ModelCatalog};
use crate::domain::chat::{
    Chat, ChatId, ContentPart, Message, MessageContent, MessageId, MessageRole,
};
use crate::domain::chat_service::map_repository_error;
use crate::domain::ports::{
    ChatRepository, CompletionBackend, CompletionError, CompletionRequest, DocumentFetcher,
    PromptMessage, PromptPart, StreamEvent,
};
use crate::domain::user::UserId;

/// System prompt prepended to every conversation.
const SYSTEM_PROMPT: &str = "You are a helpful, respectful AI assistant.\n\
    - Always use LaTeX for mathematical expressions.\n\
    - Inline math must be wrapped in escaped parentheses: \\( content \\).\n\
    - Display math must be in double dollar signs: $$ content $$.";

/// Buffered frames between the upstream reader task and the response.
const RELAY_BUFFER: usize = 64;

/// A full conversation turn submitted for streaming inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatStreamRequest {
    /// Client-minted chat id; the chat is created on first use.
    pub chat: ChatId,
    /// Provider-qualified model id.
    pub model: String,
    /// The new user message body.
    pub content: MessageContent,
    /// Caller-supplied API credential.
    pub credential: String,
}

/// One wire frame of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// A run of answer text.
    TextDelta {
        /// The text run.
        delta: String,
    },
    /// A run of reasoning text.
    Reasoning {
        /// The reasoning run.
        delta: String,
    },
    /// A citation source.
    Source {
        /// Source title.
        title: String,
        /// Source URL.
        url: String,
    },
    /// Token accounting from the upstream.
    #[serde(rename_all = "camelCase")]
    Usage {
        /// Prompt tokens billed.
        prompt_tokens: u64,
        /// Completion tokens billed.
        completion_tokens: u64,
    },
    /// The turn finished; the assistant message is persisted.
    #[serde(rename_all = "camelCase")]
    Done {
        /// Id of the persisted assistant message, when persistence
        /// succeeded.
        message_id: Option<MessageId>,
    },
    /// The stream failed after it had started.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Boxed stream of wire frames. Failures after the first frame travel
/// in-band as [`ChatEvent::Error`].
pub type ChatEventStream = BoxStream<'static, ChatEvent>;

/// Driving port for streaming inference.
#[async_trait]
pub trait InferenceOps: Send + Sync {
    /// Run one conversation turn, streaming the answer.
    async fn stream_chat(
        &self,
        user: &UserId,
        request: ChatStreamRequest,
    ) -> Result<ChatEventStream, Error>;
}

fn map_completion_error(error: CompletionError) -> Error {
    match error {
        CompletionError::BadCredential => Error::unauthorized("upstream rejected the credential"),
        CompletionError::Rejected { message } => {
            Error::invalid_request(format!("upstream rejected the request: {message}"))
        }
        CompletionError::Transport { message } => {
            Error::service_unavailable(format!("upstream unreachable: {message}"))
        }
    }
}

/// Inference proxy service implementing the inference driving port.
#[derive(Clone)]
pub struct InferenceService<R, B, F> {
    chat_repo: Arc<R>,
    backend: Arc<B>,
    fetcher: Arc<F>,
    catalog: ModelCatalog,
}

impl<R, B, F> InferenceService<R, B, F> {
    /// Create a new inference service.
    pub fn new(chat_repo: Arc<R>, backend: Arc<B>, fetcher: Arc<F>) -> Self {
        Self {
            chat_repo,
            backend,
            fetcher,
            catalog: ModelCatalog,
        }
    }
}

impl<R, B, F> InferenceService<R, B, F>
where
    R: ChatRepository + 'static,
    B: CompletionBackend,
    F: DocumentFetcher,
{
    /// Reject turns the chosen model cannot accept.
    fn check_capabilities(&self, model: &str, content: &MessageContent) -> Result<(), Error> {
        let MessageContent::Parts(parts) = content else {
            return Ok(());
        };
        for part in parts {
            match part {
                ContentPart::Text { .. } => {}
                ContentPart::Image { .. } => {
                    if !self.catalog.supports(model, Capability::Image) {
                        return Err(Error::invalid_request(format!(
                            "model {model} does not support image input"
                        )));
                    }
                }
                ContentPart::Document { mime_type, .. } => {
                    if mime_type.as_deref().unwrap_or("").is_empty() {
                        return Err(Error::invalid_request(
                            "document parts must declare a mimeType",
                        ));
                    }
                    if !self.catalog.supports(model, Capability::Document) {
                        return Err(Error::invalid_request(format!(
                            "model {model} does not support document input"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Fetch the chat, creating it on first use.
    async fn create_or_fetch_chat(&self, user: &UserId, id: &ChatId) -> Result<Chat, Error> {
        let found = self
            .chat_repo
            .find_chat(id)
            .await
            .map_err(map_repository_error)?;
        match found {
            Some(chat) if chat.owner == *user => Ok(chat),
            Some(_) => Err(Error::forbidden("chat belongs to another user")),
            None => {
                let chat = Chat::new(id.clone(), *user, Utc::now());
                self.chat_repo
                    .create_chat(&chat)
                    .await
                    .map_err(map_repository_error)?;
                Ok(chat)
            }
        }
    }

    /// Translate a stored message into the prompt shape backends expect,
    /// downloading document bytes as needed.
    async fn resolve_prompt_message(&self, message: &Message) -> Result<PromptMessage, Error> {
        let role = message.role.as_str();
        let parts = match &message.content {
            MessageContent::Text(text) => vec![PromptPart::Text(text.clone())],
            MessageContent::Parts(parts) => {
                let mut resolved = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        ContentPart::Text { text } => resolved.push(PromptPart::Text(text.clone())),
                        ContentPart::Image { url } => {
                            resolved.push(PromptPart::ImageUrl(url.clone()));
                        }
                        ContentPart::Document { url, mime_type } => {
                            let mime_type = mime_type.clone().ok_or_else(|| {
                                Error::invalid_request("document parts must declare a mimeType")
                            })?;
                            let data = self.fetcher.fetch(url).await.map_err(|err| {
                                Error::invalid_request(format!("document fetch failed: {err}"))
                            })?;
                            resolved.push(PromptPart::Blob { mime_type, data });
                        }
                    }
                }
                resolved
            }
        };
        Ok(PromptMessage { role, parts })
    }
}

#[async_trait]
impl<R, B, F> InferenceOps for InferenceService<R, B, F>
where
    R: ChatRepository + 'static,
    B: CompletionBackend,
    F: DocumentFetcher,
{
    async fn stream_chat(
        &self,
        user: &UserId,
        request: ChatStreamRequest,
    ) -> Result<ChatEventStream, Error> {
        if request.content.is_empty() {
            return Err(Error::invalid_request("message content must not be empty"));
        }
        self.check_capabilities(&request.model, &request.content)?;

        let chat = self.create_or_fetch_chat(user, &request.chat).await?;

        let user_message = Message {
            id: MessageId::mint(),
            chat_id: chat.id.clone(),
            owner: Some(*user),
            role: MessageRole::User,
            content: request.content,
            created_at: Utc::now(),
        };
        self.chat_repo
            .insert_message(&user_message)
            .await
            .map_err(map_repository_error)?;

        let history = self
            .chat_repo
            .messages_for_chat(&chat.id)
            .await
            .map_err(map_repository_error)?;
        let mut prompt = Vec::with_capacity(history.len());
        for message in &history {
            prompt.push(self.resolve_prompt_message(message).await?);
        }

        let completion = CompletionRequest {
            model: request.model,
            system: SYSTEM_PROMPT.to_owned(),
            messages: prompt,
            credential: request.credential,
            max_tokens: None,
            temperature: None,
        };
        let upstream = self
            .backend
            .stream(completion)
            .await
            .map_err(map_completion_error)?;

        let (tx, rx) = mpsc::channel::<ChatEvent>(RELAY_BUFFER);
        let chat_repo = Arc::clone(&self.chat_repo);
        let chat_id = chat.id.clone();
        // The relay owns the upstream read. Dropped receivers only stop
        // delivery; the answer is still drained and persisted.
        tokio::spawn(async move {
            let mut upstream = upstream;
            let mut answer = String::new();
            let mut completed = false;
            while let Some(event) = upstream.next().await {
                let frame = match event {
                    Ok(StreamEvent::TextDelta(delta)) => {
                        answer.push_str(&delta);
                        ChatEvent::TextDelta { delta }
                    }
                    Ok(StreamEvent::Reasoning(delta)) => ChatEvent::Reasoning { delta },
                    Ok(StreamEvent::Source { title, url }) => ChatEvent::Source { title, url },
                    Ok(StreamEvent::Usage {
                        prompt_tokens,
                        completion_tokens,
                    }) => ChatEvent::Usage {
                        prompt_tokens,
                        completion_tokens,
                    },
                    Ok(StreamEvent::Done) => {
                        completed = true;
                        break;
                    }
                    Err(err) => {
                        warn!(chat = %chat_id, error = %err, "completion stream failed");
                        let _ = tx
                            .send(ChatEvent::Error {
                                message: err.to_string(),
                            })
                            .await;
                        return;
                    }
                };
                let _ = tx.send(frame).await;
            }

            // Nothing to persist when the upstream produced no answer
            // text, whether or not it signalled completion.
            if answer.is_empty() {
                debug!(chat = %chat_id, completed, "completion stream ended without output");
                let _ = tx.send(ChatEvent::Done { message_id: None }).await;
                return;
            }

            let assistant = Message {
                id: MessageId::mint(),
                chat_id: chat_id.clone(),
                owner: None,
                role: MessageRole::Assistant,
                content: MessageContent::Text(answer),
                created_at: Utc::now(),
            };
            let message_id = match chat_repo.insert_message(&assistant).await {
                Ok(()) => Some(assistant.id),
                Err(err) => {
                    error!(chat = %chat_id, error = %err, "failed to persist assistant message");
                    None
                }
            };
            let _ = tx.send(ChatEvent::Done { message_id }).await;
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

#[cfg(test)]
#[path = "inference_tests.rs"]
mod tests;
