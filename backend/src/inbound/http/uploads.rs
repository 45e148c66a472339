//! Upload gateway API handlers.
//!
//! ```text
//! POST   /api/v1/uploads           {"fileName","fileSize","fileType"} → {"url","key"}
//! POST   /api/v1/uploads/confirm   {"key","size","name","type","tags"?}
//! POST   /api/v1/uploads/resolve   {"key"} → {"url"}
//! GET    /api/v1/uploads?kind&search&sort&page&limit
//! DELETE /api/v1/uploads/{key}
//! ```
//!
//! The client PUTs file bytes straight to the presigned URL between the
//! first two calls; bytes never pass through this service.

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use pagination::PageEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::ports::{UploadConfirmation, UploadRequest};
use crate::domain::{AttachmentRecord, Error, FileKind, StorageKey};
use crate::inbound::http::ApiResult;
use crate::inbound::http::chats::PageQuery;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn parse_key(raw: &str) -> Result<StorageKey, Error> {
    StorageKey::parse(raw).map_err(|err| {
        Error::invalid_request(format!("invalid storage key: {err}"))
            .with_details(json!({ "field": "key" }))
    })
}

/// Request body for `POST /api/v1/uploads`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestUploadBody {
    /// Original filename.
    pub file_name: String,
    /// Declared size in bytes.
    pub file_size: u64,
    /// Declared MIME type.
    pub file_type: String,
}

/// Response body carrying the presigned PUT grant.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestUploadResponse {
    /// Presigned PUT URL, valid for 60 seconds.
    pub url: String,
    /// Key the object must land under.
    pub key: String,
}

/// Mint a presigned upload URL.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    request_body = RequestUploadBody,
    responses(
        (status = 200, description = "Presigned PUT grant", body = RequestUploadResponse),
        (status = 400, description = "Type not allowed or file too large", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["uploads"],
    operation_id = "requestUpload"
)]
#[post("/uploads")]
pub async fn request_upload(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<RequestUploadBody>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let payload = payload.into_inner();
    let grant = state
        .uploads
        .request_upload(
            &user,
            UploadRequest {
                filename: payload.file_name,
                content_type: payload.file_type,
                size: payload.file_size,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(RequestUploadResponse {
        url: grant.upload.url,
        key: grant.key.to_string(),
    }))
}

/// Request body for `POST /api/v1/uploads/confirm`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadBody {
    /// Key from the upload grant.
    pub key: String,
    /// Size the client uploaded.
    pub size: u64,
    /// Original filename.
    pub name: String,
    /// Declared MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Optional user-assigned tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Confirm an upload and persist its record.
#[utoipa::path(
    post,
    path = "/api/v1/uploads/confirm",
    request_body = ConfirmUploadBody,
    responses(
        (status = 200, description = "Record persisted"),
        (status = 400, description = "Policy violation, size mismatch, or missing object", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["uploads"],
    operation_id = "confirmUpload"
)]
#[post("/uploads/confirm")]
pub async fn confirm_upload(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<ConfirmUploadBody>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let payload = payload.into_inner();
    let key = parse_key(&payload.key)?;
    state
        .uploads
        .confirm_upload(
            &user,
            UploadConfirmation {
                key,
                filename: payload.name,
                content_type: payload.content_type,
                size: payload.size,
                tags: payload.tags,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Request body for `POST /api/v1/uploads/resolve`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveBody {
    /// Key to resolve.
    pub key: String,
}

/// Response body carrying a readable URL.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// CDN or presigned GET URL.
    pub url: String,
    /// Expiry instant; absent for permanent CDN URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Resolve a confirmed upload to a readable URL.
#[utoipa::path(
    post,
    path = "/api/v1/uploads/resolve",
    request_body = ResolveBody,
    responses(
        (status = 200, description = "Readable URL", body = ResolveResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "No such file for this user", body = Error)
    ),
    tags = ["uploads"],
    operation_id = "resolveUpload"
)]
#[post("/uploads/resolve")]
pub async fn resolve_upload(
    session: SessionContext,
    state: web::Data<HttpState>,
    payload: web::Json<ResolveBody>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let key = parse_key(&payload.key)?;
    let resolved = state.uploads.resolve(&user, &key).await?;
    Ok(HttpResponse::Ok().json(ResolveResponse {
        url: resolved.url,
        expires_at: resolved.expires_at,
    }))
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct FileListQuery {
    /// `image` or `document`.
    pub kind: Option<FileKind>,
    /// Substring match on the filename.
    pub search: Option<String>,
    /// `recency` (default) or `size`.
    pub sort: Option<String>,
    #[serde(flatten)]
    page: PageQuery,
}

/// One confirmed upload.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    /// Storage key.
    pub key: String,
    /// Original filename.
    pub name: String,
    /// Declared MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Confirmed size in bytes.
    pub size: u64,
    /// User-assigned tags.
    pub tags: Vec<String>,
    /// Confirmation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<AttachmentRecord> for FileDto {
    fn from(record: AttachmentRecord) -> Self {
        Self {
            key: record.key.to_string(),
            name: record.filename,
            content_type: record.content_type,
            size: record.size,
            tags: record.tags,
            created_at: record.created_at,
        }
    }
}

/// List the caller's confirmed uploads.
#[utoipa::path(
    get,
    path = "/api/v1/uploads",
    params(
        ("kind" = Option<String>, Query, description = "image or document"),
        ("search" = Option<String>, Query, description = "Filename substring"),
        ("sort" = Option<String>, Query, description = "recency (default) or size"),
        ("page" = Option<u32>, Query, description = "1-indexed page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "One page of files with pagination totals"),
        (status = 400, description = "Invalid query", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["uploads"],
    operation_id = "listUploads"
)]
#[get("/uploads")]
pub async fn list_uploads(
    session: SessionContext,
    state: web::Data<HttpState>,
    query: web::Query<FileListQuery>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let query = query.into_inner();
    let page = query.page.to_request()?;
    let sort_by_size = match query.sort.as_deref() {
        None | Some("recency") => false,
        Some("size") => true,
        Some(other) => {
            return Err(
                Error::invalid_request(format!("unknown sort order: {other}"))
                    .with_details(json!({ "field": "sort" })),
            );
        }
    };
    let envelope = state
        .uploads
        .list_files(
            &user,
            crate::domain::ports::FileListRequest {
                kind: query.kind,
                search: query.search,
                sort_by_size,
            },
            &page,
        )
        .await?;
    let envelope = PageEnvelope {
        data: envelope.data.into_iter().map(FileDto::from).collect(),
        pagination: envelope.pagination,
    };
    Ok(HttpResponse::Ok().json(envelope))
}

/// Delete a confirmed upload and its object.
#[utoipa::path(
    delete,
    path = "/api/v1/uploads/{key}",
    params(("key" = String, Path, description = "Storage key, e.g. f/<uuid>")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "No such file for this user", body = Error)
    ),
    tags = ["uploads"],
    operation_id = "deleteUpload"
)]
#[delete("/uploads/{key:.*}")]
pub async fn delete_upload(
    session: SessionContext,
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user_id()?;
    let key = parse_key(&path.into_inner())?;
    state.uploads.delete_file(&user, &key).await?;
    Ok(HttpResponse::NoContent().finish())
}
