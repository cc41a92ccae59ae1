use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::common::{created_response, success_response, SuccessResponse};
use super::AppState;
use crate::{
    auth::AuthUser,
    common::{ApiJson, ApiPath},
    entities::user::{self, UserRole},
    errors::{ResultExt, ServiceError},
    services::users::CreateUserInput,
};

/// Account management routes; mount behind the admin role
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
}

/// `GET /users/me`, available to any signed-in account
pub fn self_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(super::auth::me))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "email": "vendas@repasses.com.br",
    "name": "Equipe de vendas",
    "role": "user",
    "created_at": "2025-02-01T12:00:00Z"
}))]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedUserResponse {
    pub success: bool,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Missing fields, short password or unknown role", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .create_user(input)
        .await
        .context("Erro ao criar usuário")?;
    info!(user_id = user.id, created_by = caller.user_id, "user created by admin");

    Ok(created_response(CreatedUserResponse {
        success: true,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users, newest first", body = [UserResponse]),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ServiceError> {
    let users = state
        .services
        .users
        .list_users()
        .await
        .context("Erro ao buscar usuários")?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User removed", body = SuccessResponse),
        (status = 400, description = "Attempt to remove oneself", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .users
        .delete_user(id, caller.user_id)
        .await
        .context("Erro ao remover usuário")?;
    Ok(success_response(SuccessResponse::ok()))
}
