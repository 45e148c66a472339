//! HTTP adapter mapping for domain errors.
//!
//! Keeps the domain error type HTTP-agnostic while letting Actix handlers
//! turn domain failures into consistent JSON envelopes and status codes.
//! Every error response carries the ambient trace identifier so clients
//! can quote it back.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::domain::{Error, ErrorCode};
use crate::middleware::trace::TraceId;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Response header carrying the trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let trace_id = TraceId::current().map(|id| id.to_string());
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = &trace_id {
            builder.insert_header((TRACE_ID_HEADER, id.clone()));
        }

        // Internal failures never leak their cause to clients.
        let body = if matches!(self.code(), ErrorCode::InternalError) {
            ErrorBody {
                code: ErrorCode::InternalError,
                message: "Internal server error",
                details: None,
                trace_id,
            }
        } else {
            ErrorBody {
                code: self.code(),
                message: self.message(),
                details: self.details(),
                trace_id,
            }
        };
        builder.json(body)
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

/// Turn body deserialisation failures into the standard error envelope
/// instead of Actix's plain-text default.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    Error::invalid_request(format!("invalid request body: {err}")).into()
}
