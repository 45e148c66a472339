//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] generates the specification served by Swagger UI in debug
//! builds. Paths come from the inbound HTTP layer; schemas cover the error
//! envelope and the request/response DTOs.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::chat_stream::{ChatMessagesRequest, IncomingMessage};
use crate::inbound::http::chats::{
    ChatSummaryDto, MessageDto, TitleRequest, TitleResponse, TranscriptResponse,
};
use crate::inbound::http::uploads::{
    ConfirmUploadBody, FileDto, RequestUploadBody, RequestUploadResponse, ResolveBody,
    ResolveResponse,
};
use crate::inbound::http::users::{SessionRequest, SessionResponse};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/session.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Chat backend API",
        description = "HTTP interface for chat persistence, streaming inference, and the upload gateway."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::create_session,
        crate::inbound::http::users::delete_session,
        crate::inbound::http::models::list_models,
        crate::inbound::http::chats::list_recent,
        crate::inbound::http::chats::get_chat,
        crate::inbound::http::chats::delete_chat,
        crate::inbound::http::chats::generate_title,
        crate::inbound::http::chat_stream::stream_chat,
        crate::inbound::http::uploads::request_upload,
        crate::inbound::http::uploads::confirm_upload,
        crate::inbound::http::uploads::resolve_upload,
        crate::inbound::http::uploads::list_uploads,
        crate::inbound::http::uploads::delete_upload,
        crate::inbound::http::health::liveness,
        crate::inbound::http::health::readiness,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SessionRequest,
        SessionResponse,
        ChatSummaryDto,
        MessageDto,
        TranscriptResponse,
        TitleRequest,
        TitleResponse,
        ChatMessagesRequest,
        IncomingMessage,
        RequestUploadBody,
        RequestUploadResponse,
        ConfirmUploadBody,
        ResolveBody,
        ResolveResponse,
        FileDto,
    )),
    tags(
        (name = "session", description = "Guest identity and session lifecycle"),
        (name = "models", description = "Model catalogue"),
        (name = "chats", description = "Chat transcripts, listing, and titles"),
        (name = "inference", description = "Streaming chat completions"),
        (name = "uploads", description = "Direct-to-bucket upload gateway"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::*;

    #[test]
    fn document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/session",
            "/api/v1/models",
            "/api/v1/chats/recent",
            "/api/v1/chats/{id}",
            "/api/v1/chats/{id}/title",
            "/api/v1/chat-messages",
            "/api/v1/uploads",
            "/api/v1/uploads/confirm",
            "/api/v1/uploads/resolve",
            "/healthz",
            "/readyz",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "document should describe {path}"
            );
        }
    }

    #[test]
    fn error_schema_is_registered() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        assert!(schemas.keys().any(|name| name.ends_with("Error")));
    }
}
