/*!
 * # Authentication and Authorization Module
 *
 * Session handling for the admin dashboard:
 *
 * - HS256 JWTs issued at login/registration, accepted from the
 *   `Authorization: Bearer` header or the `repasses_session` cookie
 * - An in-memory revocation list consulted on every validation
 * - Middleware that resolves the caller into an [`AuthUser`] and
 *   role gating for admin-only routes
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user::{self, UserRole};
use crate::errors::{ErrorResponse, ServiceError};

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use session::{clear_session_cookie, session_cookie, token_from_headers, SESSION_COOKIE};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub email: String,      // User's email
    pub roles: Vec<String>, // User's roles
    pub jti: String,        // JWT ID (unique identifier for this token)
    pub iat: i64,           // Issued at time
    pub exp: i64,           // Expiration time
    pub nbf: i64,           // Not valid before time
    pub iss: String,        // Issuer
    pub aud: String,        // Audience
}

/// Authenticated caller resolved from a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&UserRole::Admin.to_string())
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub session_ttl: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        session_ttl: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            session_ttl,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )
    }
}

/// A freshly signed session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Signs a session token for a user
    pub fn issue_token(&self, user: &user::Model) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.session_ttl)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            roles: vec![user.role.to_string()],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.config.session_ttl.as_secs(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Resolves a token into the caller it was issued to
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token).await?;
        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Revokes a token until it would have expired anyway
    pub async fn revoke(&self, jti: &str, expires_at: i64) {
        let expiry = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: jti.to_string(),
            expiry,
        });
        self.clean_blacklist(&mut blacklist);
        debug!(jti, "session token revoked");
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    fn clean_blacklist(&self, blacklist: &mut Vec<BlacklistedToken>) {
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Account no longer exists")]
    UnknownAccount,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingAuth
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::RevokedToken
            | Self::UnknownAccount => (StatusCode::UNAUTHORIZED, "Não autorizado"),
            Self::InsufficientPermissions => (StatusCode::FORBIDDEN, "Acesso negado"),
            Self::TokenCreation(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno do servidor",
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            warn!(error = %self, "authentication failure");
        } else {
            debug!(reason = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: message.to_string(),
            details: None,
            request_id: crate::middleware_helpers::request_id::current_request_id()
                .map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        let (status, message) = err.status_and_message();
        match status {
            StatusCode::FORBIDDEN => ServiceError::Forbidden(message.to_string()),
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message.to_string()),
            _ => ServiceError::JwtError(err.to_string()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// What the auth middleware needs: the token service and the accounts table
#[derive(Clone)]
pub struct SessionGuard {
    pub auth: Arc<AuthService>,
    pub db: Arc<DatabaseConnection>,
}

impl SessionGuard {
    pub fn new(auth: Arc<AuthService>, db: Arc<DatabaseConnection>) -> Self {
        Self { auth, db }
    }

    /// Resolves a token into a caller whose account still exists.
    /// The role comes from the stored account, not from the token.
    pub async fn resolve(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut caller = self.auth.authenticate(token).await?;
        let account = user::Entity::find_by_id(caller.user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::UnknownAccount)?;

        caller.roles = vec![account.role.to_string()];
        Ok(caller)
    }
}

/// Authentication middleware that extracts and validates session tokens
pub async fn auth_middleware(
    State(guard): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_headers(request.headers()).ok_or(AuthError::MissingAuth)?;
    let user = guard.resolve(&token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<UserRole>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role.to_string()) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, guard: SessionGuard) -> Self;
    fn with_role(self, role: UserRole, guard: SessionGuard) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, guard: SessionGuard) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(guard, auth_middleware))
    }

    fn with_role(self, role: UserRole, guard: SessionGuard) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth(guard)
    }
}
