//! Session API handlers.
//!
//! ```text
//! POST   /api/v1/session  {"displayName":"Ada"}  establish a guest session
//! DELETE /api/v1/session                          end the session
//! ```
//!
//! Identity is deliberately lightweight: a session is a freshly minted
//! guest user held in the cookie. Full account brokering is an external
//! collaborator.

use actix_web::{HttpResponse, delete, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Session request body for `POST /api/v1/session`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Optional display name; defaults to "Guest".
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Session response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Minted user id.
    pub user_id: String,
    /// Display name on the account.
    pub display_name: String,
}

/// Establish a guest session.
#[utoipa::path(
    post,
    path = "/api/v1/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["session"],
    operation_id = "createSession",
    security([])
)]
#[post("/session")]
pub async fn create_session(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: Option<web::Json<SessionRequest>>,
) -> ApiResult<HttpResponse> {
    let display_name = payload.and_then(|body| body.into_inner().display_name);
    let user = state.users.register_guest(display_name).await?;
    session.persist_user(&user.id)?;
    Ok(HttpResponse::Ok().json(SessionResponse {
        user_id: user.id.to_string(),
        display_name: user.display_name,
    }))
}

/// End the current session.
#[utoipa::path(
    delete,
    path = "/api/v1/session",
    responses(
        (status = 204, description = "Session ended")
    ),
    tags = ["session"],
    operation_id = "deleteSession"
)]
#[delete("/session")]
pub async fn delete_session(session: SessionContext) -> ApiResult<HttpResponse> {
    session.purge();
    Ok(HttpResponse::NoContent().finish())
}
