//! Google Gemini completion adapter.
//!
//! Speaks the `generativelanguage.googleapis.com` dialect directly:
//! `streamGenerateContent?alt=sse` for streaming and `generateContent` for
//! one-shot completions. Model ids arrive provider-qualified (`google/...`)
//! and are unprefixed before hitting the wire.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::domain::ports::{
    CompletionBackend, CompletionError, CompletionRequest, CompletionStream, PromptMessage,
    PromptPart, StreamEvent,
};

use super::sse::SseLineBuffer;
use super::{BackendBuildError, map_upstream_status};

const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

/// Provider prefix stripped from model ids before the wire call.
const MODEL_PREFIX: &str = "google/";

/// [`CompletionBackend`] speaking to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base: Url,
}

impl GeminiBackend {
    /// Build an adapter against the public Gemini endpoint.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed or
    /// the default base URL fails to parse.
    pub fn new(connect_timeout: Duration) -> Result<Self, BackendBuildError> {
        let base = Url::parse(DEFAULT_BASE).map_err(BackendBuildError::Endpoint)?;
        Ok(Self::with_base(base, connect_timeout)?)
    }

    /// Build an adapter against an explicit base URL.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_base(base: Url, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, base })
    }

    fn action_url(&self, model: &str, action: &str) -> Result<Url, CompletionError> {
        let model = model.strip_prefix(MODEL_PREFIX).unwrap_or(model);
        self.base
            .join(&format!("{model}:{action}"))
            .map_err(|error| CompletionError::rejected(format!("invalid model id: {error}")))
    }

    async fn post(
        &self,
        request: &CompletionRequest,
        action: &str,
        sse: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let mut url = self.action_url(&request.model, action)?;
        if sse {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &request.credential)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|error| CompletionError::transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(map_upstream_status(status, body.as_ref()));
        }
        Ok(response)
    }
}

fn request_body(request: &CompletionRequest) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = request.messages.iter().map(wire_content).collect();
    let mut generation_config = serde_json::Map::new();
    if let Some(max_tokens) = request.max_tokens {
        generation_config.insert("maxOutputTokens".to_owned(), max_tokens.into());
    }
    if let Some(temperature) = request.temperature {
        generation_config.insert("temperature".to_owned(), temperature.into());
    }
    serde_json::json!({
        "systemInstruction": { "parts": [{ "text": request.system }] },
        "contents": contents,
        "generationConfig": generation_config,
    })
}

fn wire_content(message: &PromptMessage) -> serde_json::Value {
    let role = if message.role == "assistant" {
        "model"
    } else {
        "user"
    };
    let parts: Vec<serde_json::Value> = message.parts.iter().map(wire_part).collect();
    serde_json::json!({ "role": role, "parts": parts })
}

fn wire_part(part: &PromptPart) -> serde_json::Value {
    match part {
        PromptPart::Text(text) => serde_json::json!({ "text": text }),
        PromptPart::ImageUrl(url) => serde_json::json!({
            "fileData": { "fileUri": url },
        }),
        PromptPart::Blob { mime_type, data } => serde_json::json!({
            "inlineData": { "mimeType": mime_type, "data": BASE64.encode(data) },
        }),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<CandidateDto>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadataDto>,
}

#[derive(Debug, Deserialize)]
struct CandidateDto {
    content: Option<ContentDto>,
}

#[derive(Debug, Deserialize)]
struct ContentDto {
    #[serde(default)]
    parts: Vec<PartDto>,
}

#[derive(Debug, Deserialize)]
struct PartDto {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct UsageMetadataDto {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

fn chunk_events(chunk: &GenerateChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for candidate in &chunk.candidates {
        let Some(content) = candidate.content.as_ref() else {
            continue;
        };
        for part in &content.parts {
            let Some(text) = part.text.as_ref().filter(|text| !text.is_empty()) else {
                continue;
            };
            if part.thought {
                events.push(StreamEvent::Reasoning(text.clone()));
            } else {
                events.push(StreamEvent::TextDelta(text.clone()));
            }
        }
    }
    if let Some(usage) = chunk.usage_metadata.as_ref() {
        events.push(StreamEvent::Usage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
        });
    }
    events
}

fn answer_text(chunk: &GenerateChunk) -> String {
    chunk
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter(|part| !part.thought)
        .filter_map(|part| part.text.as_deref())
        .collect()
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, CompletionError> {
        let response = self.post(&request, "streamGenerateContent", true).await?;
        let mut body = response.bytes_stream();
        let stream = try_stream! {
            let mut lines = SseLineBuffer::default();
            while let Some(chunk) = body.next().await {
                let chunk =
                    chunk.map_err(|error| CompletionError::transport(error.to_string()))?;
                for payload in lines.push(&chunk) {
                    let Ok(parsed) = serde_json::from_str::<GenerateChunk>(&payload) else {
                        continue;
                    };
                    for event in chunk_events(&parsed) {
                        yield event;
                    }
                }
            }
            // Gemini has no terminal sentinel; end of body is completion.
            yield StreamEvent::Done;
        };
        Ok(stream.boxed())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let response = self.post(&request, "generateContent", false).await?;
        let decoded: GenerateChunk = response
            .json()
            .await
            .map_err(|error| CompletionError::transport(error.to_string()))?;
        Ok(answer_text(&decoded))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn request_with_parts(parts: Vec<PromptPart>) -> CompletionRequest {
        CompletionRequest {
            model: "google/gemini-2.0-flash-001".to_owned(),
            system: "be brief".to_owned(),
            messages: vec![PromptMessage { role: "user", parts }],
            credential: "AIza-test".to_owned(),
            max_tokens: Some(50),
            temperature: Some(0.7),
        }
    }

    #[rstest]
    fn assistant_turns_use_the_model_role() {
        let message = PromptMessage {
            role: "assistant",
            parts: vec![PromptPart::Text("earlier answer".to_owned())],
        };
        assert_eq!(wire_content(&message)["role"], "model");
    }

    #[rstest]
    fn generation_config_carries_caps() {
        let body = request_body(&request_with_parts(vec![PromptPart::Text("hi".to_owned())]));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 50);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[rstest]
    fn text_and_usage_map_to_events() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{
                "candidates": [{"content": {"parts": [{"text": "Hel"}]}}],
                "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 2}
            }"#,
        )
        .expect("chunk parses");
        assert_eq!(
            chunk_events(&chunk),
            vec![
                StreamEvent::TextDelta("Hel".to_owned()),
                StreamEvent::Usage {
                    prompt_tokens: 8,
                    completion_tokens: 2
                },
            ]
        );
    }

    #[rstest]
    fn thought_parts_surface_as_reasoning() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "mull", "thought": true}]}}]}"#,
        )
        .expect("chunk parses");
        assert_eq!(
            chunk_events(&chunk),
            vec![StreamEvent::Reasoning("mull".to_owned())]
        );
    }

    #[rstest]
    fn answer_text_skips_thoughts() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [
                {"text": "mull", "thought": true},
                {"text": "Hello"}
            ]}}]}"#,
        )
        .expect("chunk parses");
        assert_eq!(answer_text(&chunk), "Hello");
    }
}
