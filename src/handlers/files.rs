use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::AppState;
use crate::{common::ApiPath, errors::ServiceError};

const CACHE_FOREVER: &str = "public, max-age=31536000";
const FILE_CSP: &str = "default-src 'none'; sandbox";

pub fn routes() -> Router<AppState> {
    Router::new().route("/files/*key", get(serve_file))
}

#[utoipa::path(
    get,
    path = "/api/files/{key}",
    tag = "images",
    params(("key" = String, Path, description = "Object key, e.g. motorcycles/1/1700000000000-foto.jpg")),
    responses(
        (status = 200, description = "Stored bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid key", body = crate::errors::ErrorResponse),
        (status = 404, description = "No such file", body = crate::errors::ErrorResponse)
    )
)]
pub async fn serve_file(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> Result<Response, ServiceError> {
    let object = state.services.images.fetch_object(&key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CACHE_CONTROL, CACHE_FOREVER.to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (header::CONTENT_SECURITY_POLICY, FILE_CSP.to_string()),
        ],
        object.bytes,
    )
        .into_response())
}
