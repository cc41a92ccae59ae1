use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{created_response, success_response, SuccessResponse};
use super::images::ImageResponse;
use super::AppState;
use crate::{
    common::{ApiJson, ApiPath, ApiQuery},
    entities::motorcycle::{self, MotorcycleStatus},
    errors::{ResultExt, ServiceError},
    services::motorcycles::{CreateMotorcycleInput, MotorcycleFilters, UpdateMotorcycleInput},
};

/// Catalog routes open to everyone
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/motorcycles", get(list_motorcycles))
        .route("/motorcycles/featured", get(list_featured))
        .route("/motorcycles/:id", get(get_motorcycle))
}

/// Catalog management routes; mount behind authentication
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/motorcycles", post(create_motorcycle))
        .route(
            "/motorcycles/:id",
            put(update_motorcycle).delete(delete_motorcycle),
        )
        .route("/motorcycles/:id/thumbnail", put(set_thumbnail))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MotorcycleResponse {
    pub id: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub mileage: Option<i32>,
    pub displacement: Option<i32>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub payment_methods: Option<String>,
    pub features: Option<String>,
    pub is_featured: bool,
    pub is_financed: bool,
    pub is_overdue: bool,
    pub is_worth_financing: bool,
    pub finance_days_remaining: Option<i32>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub finance_monthly_payment: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub finance_total_remaining: Option<Decimal>,
    pub thumbnail_url: Option<String>,
    pub status: MotorcycleStatus,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<motorcycle::Model> for MotorcycleResponse {
    fn from(m: motorcycle::Model) -> Self {
        Self {
            id: m.id,
            brand: m.brand,
            model: m.model,
            year: m.year,
            color: m.color,
            mileage: m.mileage,
            displacement: m.displacement,
            price: m.price,
            description: m.description,
            condition: m.condition,
            payment_methods: m.payment_methods,
            features: m.features,
            is_featured: m.is_featured,
            is_financed: m.is_financed,
            is_overdue: m.is_overdue,
            is_worth_financing: m.is_worth_financing,
            finance_days_remaining: m.finance_days_remaining,
            finance_monthly_payment: m.finance_monthly_payment,
            finance_total_remaining: m.finance_total_remaining,
            thumbnail_url: m.thumbnail_url,
            status: m.status,
            sold_at: m.sold_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A motorcycle together with its ordered gallery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MotorcycleDetail {
    #[serde(flatten)]
    pub motorcycle: MotorcycleResponse,
    pub images: Vec<ImageResponse>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ThumbnailInput {
    pub thumbnail_url: Option<String>,
}

fn to_responses(rows: Vec<motorcycle::Model>) -> Vec<MotorcycleResponse> {
    rows.into_iter().map(MotorcycleResponse::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/motorcycles",
    tag = "motorcycles",
    params(MotorcycleFilters),
    responses(
        (status = 200, description = "Filtered catalog", body = [MotorcycleResponse]),
        (status = 500, description = "Database failure", body = crate::errors::ErrorResponse)
    )
)]
pub async fn list_motorcycles(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<MotorcycleFilters>,
) -> Result<Json<Vec<MotorcycleResponse>>, ServiceError> {
    let rows = state
        .services
        .motorcycles
        .list_motorcycles(filters)
        .await
        .context("Erro ao buscar motos")?;
    Ok(Json(to_responses(rows)))
}

#[utoipa::path(
    get,
    path = "/api/motorcycles/featured",
    tag = "motorcycles",
    responses((status = 200, description = "Up to six featured motorcycles", body = [MotorcycleResponse]))
)]
pub async fn list_featured(
    State(state): State<AppState>,
) -> Result<Json<Vec<MotorcycleResponse>>, ServiceError> {
    let rows = state
        .services
        .motorcycles
        .list_featured()
        .await
        .context("Erro ao buscar motos")?;
    Ok(Json(to_responses(rows)))
}

#[utoipa::path(
    get,
    path = "/api/motorcycles/{id}",
    tag = "motorcycles",
    params(("id" = i32, Path, description = "Motorcycle id")),
    responses(
        (status = 200, description = "Motorcycle with images", body = MotorcycleDetail),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_motorcycle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<MotorcycleDetail>, ServiceError> {
    let (motorcycle, images) = state
        .services
        .motorcycles
        .get_with_images(id)
        .await
        .context("Erro ao buscar moto")?;
    Ok(Json(MotorcycleDetail {
        motorcycle: motorcycle.into(),
        images: images.into_iter().map(ImageResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/motorcycles",
    tag = "motorcycles",
    request_body = CreateMotorcycleInput,
    responses(
        (status = 201, description = "Motorcycle created", body = MotorcycleResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_motorcycle(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateMotorcycleInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let motorcycle = state
        .services
        .motorcycles
        .create_motorcycle(input)
        .await
        .context("Erro ao cadastrar moto")?;
    Ok(created_response(MotorcycleResponse::from(motorcycle)))
}

#[utoipa::path(
    put,
    path = "/api/motorcycles/{id}",
    tag = "motorcycles",
    params(("id" = i32, Path, description = "Motorcycle id")),
    request_body = UpdateMotorcycleInput,
    responses(
        (status = 200, description = "Motorcycle updated", body = MotorcycleResponse),
        (status = 400, description = "Empty or invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_motorcycle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateMotorcycleInput>,
) -> Result<Json<MotorcycleResponse>, ServiceError> {
    let motorcycle = state
        .services
        .motorcycles
        .update_motorcycle(id, input)
        .await
        .context("Erro ao atualizar moto")?;
    Ok(Json(motorcycle.into()))
}

#[utoipa::path(
    delete,
    path = "/api/motorcycles/{id}",
    tag = "motorcycles",
    params(("id" = i32, Path, description = "Motorcycle id")),
    responses(
        (status = 200, description = "Motorcycle and gallery removed", body = SuccessResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_motorcycle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .motorcycles
        .delete_motorcycle(id)
        .await
        .context("Erro ao excluir moto")?;
    Ok(success_response(SuccessResponse::ok()))
}

#[utoipa::path(
    put,
    path = "/api/motorcycles/{id}/thumbnail",
    tag = "motorcycles",
    params(("id" = i32, Path, description = "Motorcycle id")),
    request_body = ThumbnailInput,
    responses(
        (status = 200, description = "Thumbnail set", body = MotorcycleResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn set_thumbnail(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ThumbnailInput>,
) -> Result<Json<MotorcycleResponse>, ServiceError> {
    let motorcycle = state
        .services
        .motorcycles
        .set_thumbnail(id, input.thumbnail_url)
        .await
        .context("Erro ao definir thumbnail")?;
    Ok(Json(motorcycle.into()))
}
