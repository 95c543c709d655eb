use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::payment::GatewayError;
use crate::storage::StorageError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {}", .0.join(", "))]
    ValidationError(Vec<String>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Insufficient balance, please top up your balance first")]
    InsufficientFunds,

    #[error("Seat {0} is no longer available for this showing")]
    SeatUnavailable(String),

    #[error("Email / Password incorrect")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Database error")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![message.into()])
    }

    /// Business failures are 400, a bad credential is 401 and anything the
    /// caller cannot fix is 500. The `code` field is what tells them apart.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::NotFound(_)
            | AppError::InsufficientFunds
            | AppError::SeatUnavailable(_)
            | AppError::InvalidCredentials
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamError(_)
            | AppError::DatabaseError(_)
            | AppError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AppError::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UpstreamError(_) => "UPSTREAM_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::UnexpectedError(_) => "UNEXPECTED_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::UpstreamError(msg) | AppError::UnexpectedError(msg) => {
                error!(code = self.code(), message = %msg, "Application error");
            }
            _ => {
                warn!(code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::SeatTaken { seat } => AppError::SeatUnavailable(seat),
            StoreError::InsufficientBalance { .. } => AppError::InsufficientFunds,
            StoreError::IllegalTransition(id) => {
                AppError::Conflict(format!("top-up {id} was already settled differently"))
            }
            StoreError::BalanceOverflow => AppError::validation("wallet balance limit exceeded"),
            StoreError::Corrupt(msg) => AppError::UnexpectedError(msg),
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature | GatewayError::NotConfigured => {
                AppError::Unauthorized(err.to_string())
            }
            other => AppError::UpstreamError(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType(content_type) => AppError::validation(format!(
                "file type {content_type} is not allowed, use png or jpeg"
            )),
            other => AppError::UnexpectedError(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(msg) | AuthError::Signing(msg) => AppError::UnexpectedError(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::validation(format!("malformed multipart body: {}", err.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(_) => "Invalid request".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::UpstreamError(_) => "Payment provider is unavailable".to_string(),
            AppError::UnexpectedError(_) => "Unexpected error".to_string(),
            AppError::NotFound(msg) | AppError::Unauthorized(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::InsufficientFunds
            | AppError::SeatUnavailable(_)
            | AppError::InvalidCredentials => self.to_string(),
        };

        let data = match &self {
            AppError::ValidationError(details) => Some(json!({ "errors": details })),
            _ => None,
        };

        error_response(code, public_message, data, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_failures_are_bad_request() {
        assert_eq!(AppError::InsufficientFunds.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::SeatUnavailable("A1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation("seats must not be empty").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_errors_keep_their_kind() {
        let missing: AppError = StoreError::NotFound("wallet").into();
        assert_eq!(missing.code(), "NOT_FOUND");

        let broke: AppError = StoreError::InsufficientBalance { required: 10 }.into();
        assert_eq!(broke.code(), "INSUFFICIENT_FUNDS");

        let taken: AppError = StoreError::SeatTaken { seat: "B2".into() }.into();
        assert!(matches!(taken, AppError::SeatUnavailable(seat) if seat == "B2"));
    }

    #[test]
    fn test_upstream_is_server_error() {
        let err: AppError = GatewayError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_forged_notification_is_unauthorized() {
        let err: AppError = GatewayError::InvalidSignature.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let err: AppError = GatewayError::NotConfigured.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
