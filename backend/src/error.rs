//! Error handling for the coffee shop material ledger
//!
//! Maps service failures onto a small, stable set of HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shared::ledger::AllocationRejected;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Caller-correctable errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    BusinessRule {
        code: &'static str,
        message: String,
        available: Option<Decimal>,
        unit: Option<String>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn contracting_exists(material_id: i32, date: chrono::NaiveDate) -> Self {
        AppError::BusinessRule {
            code: "CONTRACTING_EXISTS",
            message: format!(
                "Contracting for material {} on {} already exists",
                material_id, date
            ),
            available: None,
            unit: None,
        }
    }

    pub fn contracting_closed(date: chrono::NaiveDate) -> Self {
        AppError::BusinessRule {
            code: "CONTRACTING_CLOSED",
            message: format!("Contracting day {} is closed", date),
            available: None,
            unit: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<AllocationRejected> for AppError {
    fn from(rejected: AllocationRejected) -> Self {
        AppError::BusinessRule {
            code: "INSUFFICIENT_MATERIAL",
            message: rejected.to_string(),
            available: Some(rejected.available),
            unit: Some(rejected.unit),
        }
    }
}

impl From<sqlx::Error> for AppError {
    /// Unique-constraint violations become a generic conflict, everything
    /// else stays a database error.
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let detail = db_err
                    .constraint()
                    .map(|c| format!("duplicate value violates {}", c))
                    .unwrap_or_else(|| "duplicate value".to_string());
                return AppError::Conflict(detail);
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("body".to_string(), "invalid request".to_string()));
        AppError::Validation { field, message }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            field: None,
            available: None,
            unit: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::BusinessRule {
                code,
                message,
                available,
                unit,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    available: *available,
                    unit: unit.clone(),
                    ..ErrorDetail::new(code, message.clone())
                },
            ),
            AppError::Conflict(detail) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", format!("Conflict: {}", detail)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_rejection_carries_available_and_unit() {
        let err: AppError = AllocationRejected {
            requested: Decimal::from(60),
            available: Decimal::from(50),
            unit: "kg".to_string(),
        }
        .into();

        match err {
            AppError::BusinessRule { code, available, unit, .. } => {
                assert_eq!(code, "INSUFFICIENT_MATERIAL");
                assert_eq!(available, Some(Decimal::from(50)));
                assert_eq!(unit.as_deref(), Some("kg"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::validation("quantity", "bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Material".into()), StatusCode::NOT_FOUND),
            (
                AppError::contracting_exists(
                    5,
                    chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                ),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
