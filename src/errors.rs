use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::storage::StorageError;

fn current_request_id() -> Option<String> {
    crate::middleware_helpers::request_id::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Moto não encontrada",
    "request_id": "8a6e0804-2bd0-4672-b79d-d97027f9071a",
    "timestamp": "2025-03-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Human-readable message, in Portuguese, suitable for display
    pub error: String,
    /// Field-level details for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request identifier echoed from `x-request-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp of the failure
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    ValidationError {
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// A server-side failure with the message shown to the client.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<ServiceError>,
    },
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = err.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let message = fields
            .iter()
            .find_map(|(_, errors)| errors.iter().find_map(|e| e.message.clone()))
            .map(|m| m.to_string())
            .or_else(|| {
                fields
                    .first()
                    .map(|(field, _)| format!("Campo inválido: {}", field))
            })
            .unwrap_or_else(|| "Dados inválidos".to_string());

        ServiceError::ValidationError {
            message,
            details: Some(err.to_string()),
        }
    }
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Replaces the client-facing message of a server-side failure.
    /// Client errors (4xx) are returned unchanged.
    pub fn context(self, message: impl Into<String>) -> Self {
        if self.status_code().is_server_error() {
            Self::WithContext {
                message: message.into(),
                source: Box::new(self),
            }
        } else {
            self
        }
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::JwtError(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(StorageError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(_)
            | Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WithContext { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::WithContext { message, .. } => message.clone(),
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::InternalError(_)
            | Self::Storage(StorageError::Io(_)) => "Erro interno do servidor".to_string(),
            Self::Storage(StorageError::InvalidKey(_)) => "Caminho de arquivo inválido".to_string(),
            Self::JwtError(_) => "Não autorizado".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::ValidationError { details, .. } => details.clone(),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        }

        let body = ErrorResponse {
            error: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// Attaches a client-facing message to server-side failures of a result.
pub trait ResultExt<T> {
    fn context(self, message: &str) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn context(self, message: &str) -> Result<T, ServiceError> {
        self.map_err(|e| e.into().context(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres"))]
        password: String,
    }

    #[test]
    fn context_only_wraps_server_errors() {
        let wrapped = ServiceError::InternalError("boom".into()).context("Erro ao buscar motos");
        assert_eq!(wrapped.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(wrapped.response_message(), "Erro ao buscar motos");

        let passthrough = ServiceError::not_found("Moto não encontrada").context("Erro ao buscar motos");
        assert_eq!(passthrough.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(passthrough.response_message(), "Moto não encontrada");
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let err = ServiceError::from(DbErr::Custom("relation \"x\" does not exist".into()));
        assert_eq!(err.response_message(), "Erro interno do servidor");
    }

    #[test]
    fn validation_errors_use_field_message() {
        let input = Input {
            password: "12345".into(),
        };
        let err: ServiceError = input.validate().unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.response_message(),
            "A senha deve ter pelo menos 6 caracteres"
        );
    }

    #[test]
    fn storage_key_errors_are_client_errors() {
        let err = ServiceError::from(StorageError::InvalidKey("../etc/passwd".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
