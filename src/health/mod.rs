/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the Repasses API:
 *
 * - Basic health check (`/health`) with the running version
 * - Liveness check (`/health/live`), answered without touching dependencies
 * - Readiness check (`/health/ready`), which pings the database
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::error;
use utoipa::ToSchema;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ProbeResult {
    pub status: HealthStatus,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthInfo))
)]
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    Json(HealthInfo {
        status: HealthStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime(),
    })
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = ProbeResult))
)]
pub async fn liveness_check() -> impl IntoResponse {
    Json(ProbeResult {
        status: HealthStatus::Up,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = ProbeResult),
        (status = 503, description = "Database unreachable", body = ProbeResult)
    )
)]
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    match crate::db::check_connection(&state.db_pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ProbeResult {
                status: HealthStatus::Up,
            }),
        ),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResult {
                    status: HealthStatus::Down,
                }),
            )
        }
    }
}

/// Health routes with their own state so they can be merged into any router
pub fn health_routes_with_state<S>(db_pool: Arc<DatabaseConnection>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = Arc::new(HealthState::new(db_pool));
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn ready_reports_up_when_db_answers() {
        let pool = Arc::new(crate::db::test_pool().await);
        let app: Router = health_routes_with_state(pool.clone());

        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let probe: ProbeResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(probe.status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn ready_reports_down_when_db_is_closed() {
        let pool = crate::db::test_pool().await;
        let closed = pool.clone();
        crate::db::close_pool(closed).await.unwrap();
        let app: Router = health_routes_with_state(Arc::new(pool));

        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
