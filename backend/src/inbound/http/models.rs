//! Model catalogue endpoint.

use actix_web::{HttpResponse, get};

use crate::domain::ModelCatalog;
use crate::inbound::http::ApiResult;

/// List the models the UI may offer.
#[utoipa::path(
    get,
    path = "/api/v1/models",
    responses(
        (status = 200, description = "Catalogued models with their capabilities")
    ),
    tags = ["models"],
    operation_id = "listModels",
    security([])
)]
#[get("/models")]
pub async fn list_models() -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ModelCatalog.entries()))
}
