use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use super::common::{created_response, success_response, SuccessResponse};
use super::AppState;
use crate::{
    common::{ApiJson, ApiPath},
    entities::motorcycle_image,
    errors::{ResultExt, ServiceError},
    services::images::ImageUpload,
};

/// Room left in the request body limit for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/motorcycles/:id/images", get(list_images))
}

/// Gallery management routes; mount behind authentication
pub fn protected_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/motorcycles/:id/images",
            post(upload_image)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/images/:id", put(reorder_image).delete(delete_image))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub motorcycle_id: i32,
    pub image_url: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<motorcycle_image::Model> for ImageResponse {
    fn from(image: motorcycle_image::Model) -> Self {
        Self {
            id: image.id,
            motorcycle_id: image.motorcycle_id,
            image_url: image.image_url,
            display_order: image.display_order,
            created_at: image.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReorderInput {
    pub display_order: i32,
}

/// Multipart body of an upload, documented for the OpenAPI schema
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    display_order: Option<i32>,
}

fn multipart_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge("Imagem excede o tamanho máximo permitido".to_string())
    } else {
        debug!(error = %err.body_text(), "malformed multipart body");
        ServiceError::bad_request("Nenhuma imagem enviada")
    }
}

/// Pulls the `image` file and the optional `display_order` field out of the form
async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, ServiceError> {
    let mut file = None;
    let mut display_order = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("image") => {
                let filename = field.file_name().unwrap_or("imagem").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, content_type, bytes));
            }
            Some("display_order") => {
                let raw = field.text().await.map_err(multipart_error)?;
                display_order = Some(raw.trim().parse::<i32>().map_err(|_| {
                    ServiceError::bad_request("display_order deve ser um número inteiro")
                })?);
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ServiceError::bad_request("Nenhuma imagem enviada"))?;
    Ok(ImageUpload {
        filename,
        content_type,
        bytes,
        display_order,
    })
}

#[utoipa::path(
    post,
    path = "/api/motorcycles/{id}/images",
    tag = "images",
    params(("id" = i32, Path, description = "Motorcycle id")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 400, description = "Missing or non-image file", body = crate::errors::ErrorResponse),
        (status = 404, description = "Motorcycle not found", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn upload_image(
    State(state): State<AppState>,
    ApiPath(motorcycle_id): ApiPath<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let multipart = multipart.map_err(|_| ServiceError::bad_request("Nenhuma imagem enviada"))?;
    let upload = read_upload(multipart).await?;
    let image = state
        .services
        .images
        .upload(motorcycle_id, upload)
        .await
        .context("Erro ao enviar imagem")?;
    Ok(created_response(ImageResponse::from(image)))
}

#[utoipa::path(
    get,
    path = "/api/motorcycles/{id}/images",
    tag = "images",
    params(("id" = i32, Path, description = "Motorcycle id")),
    responses((status = 200, description = "Gallery in display order", body = [ImageResponse]))
)]
pub async fn list_images(
    State(state): State<AppState>,
    ApiPath(motorcycle_id): ApiPath<i32>,
) -> Result<Json<Vec<ImageResponse>>, ServiceError> {
    let images = state
        .services
        .images
        .list_images(motorcycle_id)
        .await
        .context("Erro ao buscar imagens")?;
    Ok(Json(images.into_iter().map(ImageResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/images/{id}",
    tag = "images",
    params(("id" = i32, Path, description = "Image id")),
    request_body = ReorderInput,
    responses(
        (status = 200, description = "Image moved", body = ImageResponse),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn reorder_image(
    State(state): State<AppState>,
    ApiPath(image_id): ApiPath<i32>,
    ApiJson(input): ApiJson<ReorderInput>,
) -> Result<Json<ImageResponse>, ServiceError> {
    let image = state
        .services
        .images
        .reorder(image_id, input.display_order)
        .await
        .context("Erro ao atualizar imagem")?;
    Ok(Json(image.into()))
}

#[utoipa::path(
    delete,
    path = "/api/images/{id}",
    tag = "images",
    params(("id" = i32, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image removed", body = SuccessResponse),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_image(
    State(state): State<AppState>,
    ApiPath(image_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .images
        .delete_image(image_id)
        .await
        .context("Erro ao excluir imagem")?;
    Ok(success_response(SuccessResponse::ok()))
}
