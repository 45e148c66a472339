//! Background chat title generation.
//!
//! Titles come from a small, fast model fed the opening of the first user
//! message. Upstream failures are swallowed; an untitled chat is a display
//! nuisance, not an error the caller can act on.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::Error;
use crate::domain::catalog::TITLE_MODEL;
use crate::domain::chat::ChatId;
use crate::domain::chat_service::map_repository_error;
use crate::domain::ports::{
    ChatRepository, CompletionBackend, CompletionRequest, PromptMessage, PromptPart, TitleOps,
};
use crate::domain::user::UserId;

/// Longest stored title, in characters.
const MAX_TITLE_LEN: usize = 100;

/// How much of the first user message seeds the prompt.
const SEED_LEN: usize = 200;

/// Token cap for the title completion.
const TITLE_MAX_TOKENS: u32 = 50;

/// Sampling temperature for the title completion.
const TITLE_TEMPERATURE: f32 = 0.7;

/// Strip quoting and markdown artefacts models wrap titles in, then cap
/// the length.
fn clean_title(raw: &str) -> String {
    let mut title = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if let Some(stripped) = title
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            title = stripped.trim();
        }
    }
    let title = title.lines().next().unwrap_or_default().trim();
    title.chars().take(MAX_TITLE_LEN).collect()
}

fn title_prompt(seed: &str) -> String {
    let opening: String = seed.chars().take(SEED_LEN).collect();
    format!(
        "Generate a concise title (maximum 6 words) for a conversation that starts with: {opening}"
    )
}

/// Title generation service implementing the title driving port.
#[derive(Clone)]
pub struct TitleService<R, B> {
    chat_repo: Arc<R>,
    backend: Arc<B>,
}

impl<R, B> TitleService<R, B> {
    /// Create a new title service over the chat repository and a
    /// completion backend.
    pub fn new(chat_repo: Arc<R>, backend: Arc<B>) -> Self {
        Self { chat_repo, backend }
    }
}

#[async_trait]
impl<R, B> TitleOps for TitleService<R, B>
where
    R: ChatRepository,
    B: CompletionBackend,
{
    async fn generate_title(
        &self,
        user: &UserId,
        chat: &ChatId,
        credential: &str,
    ) -> Result<Option<String>, Error> {
        let found = self
            .chat_repo
            .find_chat(chat)
            .await
            .map_err(map_repository_error)?;
        match found {
            Some(record) if record.owner == *user => {}
            _ => return Err(Error::not_found(format!("chat {chat} not found"))),
        }

        let messages = self
            .chat_repo
            .messages_for_chat(chat)
            .await
            .map_err(map_repository_error)?;
        let Some(seed) = messages
            .iter()
            .find_map(|message| message.content.seed_text())
            .filter(|seed| !seed.trim().is_empty())
        else {
            return Ok(None);
        };

        let request = CompletionRequest {
            model: TITLE_MODEL.to_owned(),
            system: String::new(),
            messages: vec![PromptMessage {
                role: "user",
                parts: vec![PromptPart::Text(title_prompt(seed))],
            }],
            credential: credential.to_owned(),
            max_tokens: Some(TITLE_MAX_TOKENS),
            temperature: Some(TITLE_TEMPERATURE),
        };

        let raw = match self.backend.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(chat = %chat, error = %err, "title generation failed");
                return Ok(None);
            }
        };
        let title = clean_title(&raw);
        if title.is_empty() {
            return Ok(None);
        }

        self.chat_repo
            .set_title(chat, &title)
            .await
            .map_err(map_repository_error)?;
        Ok(Some(title))
    }
}
