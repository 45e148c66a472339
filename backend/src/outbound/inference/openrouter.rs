//! OpenRouter completion adapter.
//!
//! Speaks the OpenAI-compatible chat completions dialect: one POST with
//! `stream: true`, answered by an SSE body whose `data:` payloads carry
//! incremental deltas and a final `[DONE]` sentinel.

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

const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// [`CompletionBackend`] speaking to OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: Client,
    endpoint: Url,
}

impl OpenRouterBackend {
    /// Build an adapter against the public OpenRouter endpoint.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed or
    /// the default endpoint fails to parse.
    pub fn new(connect_timeout: Duration) -> Result<Self, BackendBuildError> {
        let endpoint = Url::parse(DEFAULT_ENDPOINT).map_err(BackendBuildError::Endpoint)?;
        Ok(Self::with_endpoint(endpoint, connect_timeout)?)
    }

    /// Build an adapter against an explicit endpoint.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_endpoint(endpoint: Url, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, endpoint })
    }

    async fn post(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, CompletionError> {
        let body = request_body(request, stream);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&request.credential)
            .json(&body)
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

fn request_body(request: &CompletionRequest, stream: bool) -> serde_json::Value {
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": request.system,
    })];
    messages.extend(request.messages.iter().map(wire_message));
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
        "stream": stream,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = max_tokens.into();
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = temperature.into();
    }
    body
}

fn wire_message(message: &PromptMessage) -> serde_json::Value {
    // A lone text part collapses to the plain-string content form.
    if let [PromptPart::Text(text)] = message.parts.as_slice() {
        return serde_json::json!({ "role": message.role, "content": text });
    }
    let parts: Vec<serde_json::Value> = message.parts.iter().map(wire_part).collect();
    serde_json::json!({ "role": message.role, "content": parts })
}

fn wire_part(part: &PromptPart) -> serde_json::Value {
    match part {
        PromptPart::Text(text) => serde_json::json!({ "type": "text", "text": text }),
        PromptPart::ImageUrl(url) => {
            serde_json::json!({ "type": "image_url", "image_url": { "url": url } })
        }
        PromptPart::Blob { mime_type, data } => serde_json::json!({
            "type": "file",
            "file": {
                "filename": "document",
                "file_data": format!("data:{mime_type};base64,{}", BASE64.encode(data)),
            },
        }),
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<UsageDto>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<DeltaDto>,
}

#[derive(Debug, Deserialize)]
struct DeltaDto {
    content: Option<String>,
    reasoning: Option<String>,
    #[serde(default)]
    annotations: Vec<AnnotationDto>,
}

#[derive(Debug, Deserialize)]
struct AnnotationDto {
    url_citation: Option<UrlCitationDto>,
}

#[derive(Debug, Deserialize)]
struct UrlCitationDto {
    #[serde(default)]
    title: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct UsageDto {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn chunk_events(chunk: &StreamChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for choice in &chunk.choices {
        let Some(delta) = choice.delta.as_ref() else {
            continue;
        };
        if let Some(content) = delta.content.as_ref().filter(|text| !text.is_empty()) {
            events.push(StreamEvent::TextDelta(content.clone()));
        }
        if let Some(reasoning) = delta.reasoning.as_ref().filter(|text| !text.is_empty()) {
            events.push(StreamEvent::Reasoning(reasoning.clone()));
        }
        for annotation in &delta.annotations {
            if let Some(citation) = annotation.url_citation.as_ref() {
                events.push(StreamEvent::Source {
                    title: citation.title.clone(),
                    url: citation.url.clone(),
                });
            }
        }
    }
    if let Some(usage) = chunk.usage.as_ref() {
        events.push(StreamEvent::Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        });
    }
    events
}

#[derive(Debug, Deserialize)]
struct CompletionResponseDto {
    #[serde(default)]
    choices: Vec<CompletionChoiceDto>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoiceDto {
    message: CompletionMessageDto,
}

#[derive(Debug, Deserialize)]
struct CompletionMessageDto {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, CompletionError> {
        let response = self.post(&request, true).await?;
        let mut body = response.bytes_stream();
        let stream = try_stream! {
            let mut lines = SseLineBuffer::default();
            let mut finished = false;
            while let Some(chunk) = body.next().await {
                let chunk =
                    chunk.map_err(|error| CompletionError::transport(error.to_string()))?;
                for payload in lines.push(&chunk) {
                    if payload == "[DONE]" {
                        yield StreamEvent::Done;
                        finished = true;
                        break;
                    }
                    // Unparseable frames are skipped rather than fatal.
                    let Ok(parsed) = serde_json::from_str::<StreamChunk>(&payload) else {
                        continue;
                    };
                    for event in chunk_events(&parsed) {
                        yield event;
                    }
                }
                if finished {
                    break;
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let response = self.post(&request, false).await?;
        let decoded: CompletionResponseDto = response
            .json()
            .await
            .map_err(|error| CompletionError::transport(error.to_string()))?;
        Ok(decoded
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
