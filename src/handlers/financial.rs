use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::common::{created_response, success_response, today, SuccessResponse};
use super::AppState;
use crate::{
    auth::AuthUser,
    common::{ApiJson, ApiPath, ApiQuery},
    entities::financial_record::{RecordType, ENTRADA_CATEGORIES, SAIDA_CATEGORIES},
    errors::{ResultExt, ServiceError},
    services::financial::{
        CreateFinancialRecordInput, FinancialFilters, FinancialRecordView, FinancialSummary,
        UpdateFinancialRecordInput,
    },
};

/// Ledger routes; mount behind authentication
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/financial/records", get(list_records).post(create_record))
        .route(
            "/financial/records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/financial/summary", get(summary))
        .route("/financial/categories", get(categories))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MotorcycleInfo {
    pub brand: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialRecordResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    pub motorcycle_id: Option<i32>,
    pub client_id: Option<i32>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motorcycle_info: Option<MotorcycleInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
}

impl From<FinancialRecordView> for FinancialRecordResponse {
    fn from(view: FinancialRecordView) -> Self {
        let r = view.record;
        Self {
            id: r.id,
            record_type: r.record_type,
            description: r.description,
            amount: r.amount,
            category: r.category,
            date: r.date,
            motorcycle_id: r.motorcycle_id,
            client_id: r.client_id,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
            motorcycle_info: view
                .motorcycle
                .map(|(brand, model)| MotorcycleInfo { brand, model }),
            client_info: view.client_name.map(|name| ClientInfo { name }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_entradas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_saidas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub saldo: Decimal,
    pub transacoes_hoje: u64,
    /// Entradas minus saidas in the current month
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub lucro_mes: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub gastos_mes: Decimal,
    pub categorias: BTreeMap<String, f64>,
}

impl From<FinancialSummary> for SummaryResponse {
    fn from(summary: FinancialSummary) -> Self {
        use rust_decimal::prelude::ToPrimitive;

        Self {
            total_entradas: summary.totals.entradas,
            total_saidas: summary.totals.saidas,
            saldo: summary.totals.saldo(),
            transacoes_hoje: summary.transactions_today,
            lucro_mes: summary.month.saldo(),
            gastos_mes: summary.month.saidas,
            categorias: summary
                .categories
                .into_iter()
                .map(|(category, total)| (category, total.to_f64().unwrap_or_default()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    pub entrada: Vec<String>,
    pub saida: Vec<String>,
}

fn to_responses(views: Vec<FinancialRecordView>) -> Vec<FinancialRecordResponse> {
    views.into_iter().map(FinancialRecordResponse::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/financial/records",
    tag = "financial",
    params(FinancialFilters),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = [FinancialRecordResponse]),
        (status = 400, description = "Malformed date filter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_records(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<FinancialFilters>,
) -> Result<Json<Vec<FinancialRecordResponse>>, ServiceError> {
    let views = state
        .services
        .financial
        .list_records(filters)
        .await
        .context("Erro ao buscar registros financeiros")?;
    Ok(Json(to_responses(views)))
}

#[utoipa::path(
    get,
    path = "/api/financial/records/{id}",
    tag = "financial",
    params(("id" = i32, Path, description = "Record id")),
    responses(
        (status = 200, description = "Ledger entry", body = FinancialRecordResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_record(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<FinancialRecordResponse>, ServiceError> {
    let view = state
        .services
        .financial
        .get_record(id)
        .await
        .context("Erro ao buscar registro financeiro")?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    post,
    path = "/api/financial/records",
    tag = "financial",
    request_body = CreateFinancialRecordInput,
    responses(
        (status = 201, description = "Entry recorded", body = FinancialRecordResponse),
        (status = 400, description = "Invalid amount, category or link", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_record(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(input): ApiJson<CreateFinancialRecordInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state
        .services
        .financial
        .create_record(input, Some(caller.user_id))
        .await
        .context("Erro ao criar registro financeiro")?;
    Ok(created_response(FinancialRecordResponse::from(view)))
}

#[utoipa::path(
    put,
    path = "/api/financial/records/{id}",
    tag = "financial",
    params(("id" = i32, Path, description = "Record id")),
    request_body = UpdateFinancialRecordInput,
    responses(
        (status = 200, description = "Entry updated", body = FinancialRecordResponse),
        (status = 400, description = "Empty or invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_record(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateFinancialRecordInput>,
) -> Result<Json<FinancialRecordResponse>, ServiceError> {
    let view = state
        .services
        .financial
        .update_record(id, input)
        .await
        .context("Erro ao atualizar registro financeiro")?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    delete,
    path = "/api/financial/records/{id}",
    tag = "financial",
    params(("id" = i32, Path, description = "Record id")),
    responses(
        (status = 200, description = "Entry removed", body = SuccessResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_record(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .financial
        .delete_record(id)
        .await
        .context("Erro ao excluir registro financeiro")?;
    Ok(success_response(SuccessResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/api/financial/summary",
    tag = "financial",
    responses((status = 200, description = "Ledger totals", body = SummaryResponse)),
    security(("Bearer" = []))
)]
pub async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ServiceError> {
    let summary = state
        .services
        .financial
        .summary(today())
        .await
        .context("Erro ao buscar resumo financeiro")?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    get,
    path = "/api/financial/categories",
    tag = "financial",
    responses((status = 200, description = "Allowed categories per type", body = CategoriesResponse)),
    security(("Bearer" = []))
)]
pub async fn categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        entrada: ENTRADA_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        saida: SAIDA_CATEGORIES.iter().map(|c| c.to_string()).collect(),
    })
}
