use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::services::{
    earnings::WithdrawalError, event_planner::EventPlanningError, mailer::MailError,
    media_market::MediaMarketError, otp::OtpError, password::PasswordError, pricing::PricingError,
    storage::UploadError, token::TokenError, withdrawals::WithdrawalServiceError,
};

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::TooManyRequests => "too_many_requests",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Missing rows and key violations map to client errors
        let this = match self {
            AppError::Database(sqlx::Error::RowNotFound) => {
                AppError::NotFound("Resource not found".to_string())
            }
            AppError::Database(sqlx::Error::Database(ref db))
                if db.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::Conflict("Resource already exists".to_string())
            }
            AppError::Database(sqlx::Error::Database(ref db))
                if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                AppError::Conflict("Resource is referenced by other records".to_string())
            }
            other => other,
        };

        let kind = this.kind();
        let (status, message, fields) = match this {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(fields),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
                None,
            ),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({
                "error": kind,
                "message": message,
                "fields": fields,
            }),
            None => json!({
                "error": kind,
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<OtpError> for AppError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::TooManyAttempts => AppError::BadRequest(e.to_string()),
            _ => AppError::BadRequest("Invalid or expired OTP".to_string()),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(e: PricingError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<WithdrawalError> for AppError {
    fn from(e: WithdrawalError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<WithdrawalServiceError> for AppError {
    fn from(e: WithdrawalServiceError) -> Self {
        match e {
            WithdrawalServiceError::Database(e) => AppError::Database(e),
            WithdrawalServiceError::Rejected(e) => e.into(),
            WithdrawalServiceError::UserNotFound => AppError::not_found("User"),
            WithdrawalServiceError::NotFound => AppError::not_found("Withdrawal"),
            e @ WithdrawalServiceError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<EventPlanningError> for AppError {
    fn from(e: EventPlanningError) -> Self {
        match e {
            EventPlanningError::Database(e) => AppError::Database(e),
            EventPlanningError::Pricing(e) => e.into(),
            EventPlanningError::EventNotFound => AppError::not_found("Event"),
            EventPlanningError::RentalNotFound => AppError::not_found("Rental"),
            e @ (EventPlanningError::CateringNotFound(_) | EventPlanningError::EquipmentNotFound(_)) => {
                AppError::NotFound(e.to_string())
            }
            e @ (EventPlanningError::CateringInactive(_)
            | EventPlanningError::EquipmentUnavailable(_)
            | EventPlanningError::EquipmentOnRental(_)) => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<MediaMarketError> for AppError {
    fn from(e: MediaMarketError) -> Self {
        match e {
            MediaMarketError::Database(e) => AppError::Database(e),
            MediaMarketError::NotFound => AppError::not_found("Media"),
            e @ MediaMarketError::OwnMedia => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::NotFound => AppError::not_found("File"),
            UploadError::Io(e) => AppError::Internal(e.into()),
            UploadError::Url(e) => AppError::Internal(e.into()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid(_) => AppError::Unauthorized,
            TokenError::Signing(_) => AppError::Internal(e.into()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        AppError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation(vec![]).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("Course").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("dup".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_service_errors_map_to_client_errors() {
        assert_eq!(
            AppError::from(OtpError::Expired).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(WithdrawalError::InsufficientBalance {
                requested: 10,
                available: 5
            })
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(UploadError::NotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(EventPlanningError::EventNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_otp_errors_share_one_message() {
        match AppError::from(OtpError::Mismatch) {
            AppError::BadRequest(msg) => assert_eq!(msg, "Invalid or expired OTP"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_internal_error_is_generic() {
        let response = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
