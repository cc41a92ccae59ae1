use axum::{extract::State, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::today;
use super::AppState;
use crate::{
    errors::{ResultExt, ServiceError},
    services::dashboard::{DashboardStats, MonthlyBucket},
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(get_stats))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_motos: u64,
    pub motos_disponiveis: u64,
    pub motos_vendidas: u64,
    pub motos_reservadas: u64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_entradas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_saidas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub saldo: Decimal,
    pub motos_financiadas: u64,
    pub motos_atrasadas: u64,
    pub clientes_ativos: u64,
    pub vendas_mes: u64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub lucro_mes: Decimal,
}

/// One point of the six-month chart
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPoint {
    /// `Mmm/YY`, e.g. `Fev/25`
    pub month: String,
    pub vendas: u64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub entradas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub saidas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub lucro: Decimal,
}

impl From<&MonthlyBucket> for MonthlyPoint {
    fn from(bucket: &MonthlyBucket) -> Self {
        Self {
            month: bucket.label(),
            vendas: bucket.vendas,
            entradas: bucket.totals.entradas,
            saidas: bucket.totals.saidas,
            lucro: bucket.lucro(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: StatsSummary,
    pub monthly_data: Vec<MonthlyPoint>,
}

impl From<DashboardStats> for DashboardResponse {
    fn from(stats: DashboardStats) -> Self {
        let (vendas_mes, lucro_mes) = stats
            .current_month()
            .map(|m| (m.vendas, m.lucro()))
            .unwrap_or_default();

        Self {
            stats: StatsSummary {
                total_motos: stats.inventory.total,
                motos_disponiveis: stats.inventory.disponiveis,
                motos_vendidas: stats.inventory.vendidas,
                motos_reservadas: stats.inventory.reservadas,
                total_entradas: stats.totals.entradas,
                total_saidas: stats.totals.saidas,
                saldo: stats.totals.saldo(),
                motos_financiadas: stats.inventory.financiadas,
                motos_atrasadas: stats.inventory.atrasadas,
                clientes_ativos: stats.clients,
                vendas_mes,
                lucro_mes,
            },
            monthly_data: stats.monthly.iter().map(MonthlyPoint::from).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Inventory, ledger and six-month figures", body = DashboardResponse),
        (status = 500, description = "Aggregation failed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ServiceError> {
    let stats = state
        .services
        .dashboard
        .stats(today())
        .await
        .context("Erro ao buscar dados do dashboard")?;
    Ok(Json(stats.into()))
}
