use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid lifetime: {0}")]
    InvalidLifetime(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden")]
    Forbidden,

    #[error("a token with this identifier already exists")]
    DuplicateIdentifier,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidIdentifier(_) => "invalid_identifier",
            AppError::InvalidLifetime(_) => "invalid_lifetime",
            AppError::InvalidGrant(_) => "invalid_grant",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden => "forbidden",
            AppError::DuplicateIdentifier => "duplicate_identifier",
            AppError::StorageUnavailable(_) => "storage_unavailable",
            AppError::SigningError(_) => "signing_error",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Internal(_) => "internal_server_error",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::DuplicateIdentifier;
            }
        }
        AppError::StorageUnavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, msg) = match &self {
            AppError::InvalidIdentifier(m) | AppError::InvalidLifetime(m) | AppError::InvalidGrant(m) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                m.clone(),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                format!("{} not found", what),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "caller lacks the required permission".to_string(),
            ),
            AppError::DuplicateIdentifier => (
                StatusCode::CONFLICT,
                "conflict_error",
                self.to_string(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid or missing session token".to_string(),
            ),
            AppError::StorageUnavailable(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "internal_error",
                    "storage unavailable".to_string(),
                )
            }
            AppError::SigningError(e) => {
                tracing::error!("Signing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}
