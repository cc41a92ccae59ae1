use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use super::common::SuccessResponse;
use super::AppState;
use crate::{
    auth::{clear_session_cookie, session_cookie, token_from_headers, AuthUser},
    common::ApiJson,
    entities::user::{self, UserRole},
    errors::ServiceError,
    services::users::{LoginInput, RegisterInput},
};

/// Public view of the signed-in account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl SessionUser {
    fn with_role(user: &user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: Some(user.role),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user: SessionUser,
    /// Session JWT, also set as the `repasses_session` cookie
    pub token: String,
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    user: SessionUser,
    model: &user::Model,
) -> Result<Response, ServiceError> {
    let issued = state.auth.issue_token(model)?;
    let cookie = session_cookie(&issued.token, issued.expires_in, state.config.secure_cookies());

    Ok((
        status,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            user,
            token: issued.token,
        }),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created and session started", body = AuthResponse),
        (status = 400, description = "Missing fields, short password or email taken", body = crate::errors::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<Response, ServiceError> {
    let user = state.services.users.register(input).await?;
    info!(user_id = user.id, "account registered");

    let public = SessionUser {
        role: None,
        ..SessionUser::with_role(&user)
    };
    session_response(&state, StatusCode::CREATED, public, &user)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Session started", body = AuthResponse),
        (status = 400, description = "Missing fields", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Response, ServiceError> {
    let user = state.services.users.login(input).await?;
    session_response(&state, StatusCode::OK, SessionUser::with_role(&user), &user)
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Session ended", body = SuccessResponse))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = token_from_headers(&headers) {
        match state.auth.authenticate(&token).await {
            Ok(caller) => state.auth.revoke(&caller.token_id, caller.expires_at).await,
            Err(e) => debug!(error = %e, "logout with unusable token"),
        }
    }

    (
        [(SET_COOKIE, clear_session_cookie(state.config.secure_cookies()))],
        Json(SuccessResponse::ok()),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Signed-in account", body = SessionUser),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []), ("Cookie" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<SessionUser>, ServiceError> {
    let user = state
        .services
        .users
        .get_user(caller.user_id)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::Unauthorized("Não autorizado".to_string()),
            other => other,
        })?;
    Ok(Json(SessionUser::with_role(&user)))
}
