//! Upstream completion adapters.
//!
//! [`CompletionRouter`] is the backend handed to the domain: it dispatches
//! per request to the Gemini adapter for `google/` models when one is
//! configured, and to OpenRouter for everything else.

mod document_fetcher;
mod gemini;
mod openrouter;
mod sse;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::ModelCatalog;
use crate::domain::Provider;
use crate::domain::ports::{
    CompletionBackend, CompletionError, CompletionRequest, CompletionStream,
};

pub use document_fetcher::HttpDocumentFetcher;
pub use gemini::GeminiBackend;
pub use openrouter::OpenRouterBackend;

/// Errors raised while constructing a completion adapter.
#[derive(Debug, Error)]
pub enum BackendBuildError {
    /// The endpoint URL failed to parse.
    #[error("invalid endpoint URL: {0}")]
    Endpoint(url::ParseError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Map an upstream error status onto the completion port error.
pub(crate) fn map_upstream_status(status: StatusCode, body: &[u8]) -> CompletionError {
    let preview = sse::body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::BadCredential,
        _ if status.is_client_error() => CompletionError::rejected(message),
        _ => CompletionError::transport(message),
    }
}

/// Dispatches completion requests to the adapter serving the model's
/// provider.
pub struct CompletionRouter {
    openrouter: OpenRouterBackend,
    gemini: Option<GeminiBackend>,
    catalog: ModelCatalog,
}

impl CompletionRouter {
    /// Build a router; `gemini` is `None` when direct Google access is not
    /// configured, in which case `google/` models also go via OpenRouter.
    pub fn new(openrouter: OpenRouterBackend, gemini: Option<GeminiBackend>) -> Self {
        Self {
            openrouter,
            gemini,
            catalog: ModelCatalog,
        }
    }

    fn backend_for(&self, model: &str) -> &dyn CompletionBackend {
        match self.catalog.provider_for(model, self.gemini.is_some()) {
            Provider::Google => self
                .gemini
                .as_ref()
                .map_or(&self.openrouter as &dyn CompletionBackend, |gemini| gemini),
            Provider::OpenRouter => &self.openrouter,
        }
    }
}

#[async_trait]
impl CompletionBackend for CompletionRouter {
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, CompletionError> {
        self.backend_for(&request.model).stream(request).await
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.backend_for(&request.model).complete(request).await
    }
}
