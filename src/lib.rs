//! Repasses API Library
//!
//! Backend for a motorcycle resale business: public catalog, admin dashboard,
//! client register, financial ledger and user accounts.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService, SessionGuard};
use crate::entities::user::UserRole;
use crate::storage::ImageStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    pub store: Arc<dyn ImageStore>,
}

impl AppState {
    /// Wires services, the token service and the image store around one pool
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        store: Arc<dyn ImageStore>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        let services = handlers::AppServices::new(db.clone(), store.clone(), config.max_upload_bytes);
        Self {
            db,
            config,
            services,
            auth,
            store,
        }
    }
}

/// Routes mounted under `/api`
///
/// Unmatched methods on a known path get a JSON 405 for every caller,
/// signed in or not.
pub fn api_routes(guard: SessionGuard, max_upload_bytes: usize) -> Router<AppState> {
    use axum::routing::{get, post};
    use handlers::{auth as session, clients, dashboard, files, financial, images, motorcycles, users};

    let public = Router::new()
        .route("/auth/register", post(session::register))
        .route("/auth/login", post(session::login))
        .route("/auth/logout", post(session::logout))
        .merge(motorcycles::public_routes())
        .merge(images::public_routes())
        .merge(files::routes());

    let signed_in = Router::new()
        .route("/auth/me", get(session::me))
        .merge(users::self_routes())
        .merge(motorcycles::protected_routes())
        .merge(images::protected_routes(max_upload_bytes))
        .merge(clients::routes())
        .merge(financial::routes())
        .merge(dashboard::routes())
        .with_auth(guard.clone());

    let admin = users::admin_routes().with_role(UserRole::Admin, guard);

    Router::new()
        .merge(public)
        .merge(signed_in)
        .merge(admin)
        .method_not_allowed_fallback(method_not_allowed)
}

/// Full application router with request ids, HTTP tracing, health probes and API docs
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            api_routes(
                SessionGuard::new(state.auth.clone(), state.db.clone()),
                state.config.max_upload_bytes,
            ),
        )
        .merge(health::health_routes_with_state(state.db.clone()))
        .merge(openapi::swagger_ui())
        .fallback(route_not_found)
        .layer(middleware_helpers::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn route_not_found() -> errors::ServiceError {
    errors::ServiceError::not_found("Rota não encontrada")
}

async fn method_not_allowed() -> errors::ServiceError {
    errors::ServiceError::MethodNotAllowed("Método não permitido".to_string())
}
