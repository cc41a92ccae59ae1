use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{created_response, success_response, SuccessResponse};
use super::AppState;
use crate::{
    common::{ApiJson, ApiPath, ApiQuery},
    errors::{ResultExt, ServiceError},
    services::clients::{ClientWithTotals, CreateClientInput, UpdateClientInput},
};

/// Client register routes; mount behind authentication
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientSearch {
    /// Case-insensitive substring of name, document or email
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientResponse {
    pub id: i32,
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub reliability_score: i32,
    pub total_motorcycles: u64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_sales: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientWithTotals> for ClientResponse {
    fn from(row: ClientWithTotals) -> Self {
        let c = row.client;
        Self {
            id: c.id,
            name: c.name,
            document: c.document,
            phone: c.phone,
            email: c.email,
            address: c.address,
            notes: c.notes,
            reliability_score: c.reliability_score,
            total_motorcycles: row.total_motorcycles,
            total_sales: row.total_sales,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "clients",
    params(ClientSearch),
    responses((status = 200, description = "Clients ordered by name", body = [ClientResponse])),
    security(("Bearer" = []))
)]
pub async fn list_clients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClientSearch>,
) -> Result<Json<Vec<ClientResponse>>, ServiceError> {
    let rows = state
        .services
        .clients
        .list_clients(query.search)
        .await
        .context("Erro ao buscar clientes")?;
    Ok(Json(rows.into_iter().map(ClientResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client with totals", body = ClientResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ClientResponse>, ServiceError> {
    let row = state
        .services
        .clients
        .get_client(id)
        .await
        .context("Erro ao buscar cliente")?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "clients",
    request_body = CreateClientInput,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateClientInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let row = state
        .services
        .clients
        .create_client(input)
        .await
        .context("Erro ao cadastrar cliente")?;
    Ok(created_response(ClientResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = i32, Path, description = "Client id")),
    request_body = UpdateClientInput,
    responses(
        (status = 200, description = "Client updated", body = ClientResponse),
        (status = 400, description = "Empty or invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateClientInput>,
) -> Result<Json<ClientResponse>, ServiceError> {
    let row = state
        .services
        .clients
        .update_client(id, input)
        .await
        .context("Erro ao atualizar cliente")?;
    Ok(Json(row.into()))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = i32, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client removed; ledger entries are kept", body = SuccessResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .clients
        .delete_client(id)
        .await
        .context("Erro ao excluir cliente")?;
    Ok(success_response(SuccessResponse::ok()))
}
