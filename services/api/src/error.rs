//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! rendering into the uniform response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_core::ports::{FieldError, PortError};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network
    /// socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The failure half of the uniform envelope: `success` is always false and
/// `errors` carries field-level messages when the failure was a validation
/// one.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    fn render(&self) -> (StatusCode, ErrorBody) {
        let (status, message, errors) = match self {
            ApiError::Port(PortError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors.clone()),
            ),
            ApiError::Port(PortError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "Not authorized to access this resource".to_string(),
                None,
            ),
            ApiError::Port(PortError::Forbidden(reason)) => {
                (StatusCode::FORBIDDEN, reason.clone(), None)
            }
            ApiError::Port(PortError::NotFound(reason)) => {
                (StatusCode::NOT_FOUND, reason.clone(), None)
            }
            ApiError::Port(PortError::Conflict(reason)) => {
                (StatusCode::CONFLICT, reason.clone(), None)
            }
            ApiError::Port(PortError::Upstream(reason)) => {
                (StatusCode::BAD_GATEWAY, reason.clone(), None)
            }
            // Everything else is an internal fault; log the detail but keep
            // the response generic.
            other => {
                error!("internal error: {other:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };
        (
            status,
            ErrorBody {
                success: false,
                message,
                errors,
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.render();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.render().0
    }

    #[test]
    fn port_errors_map_to_the_documented_status_codes() {
        assert_eq!(
            status_of(ApiError::Port(PortError::invalid("email", "bad"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Port(PortError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Port(PortError::Forbidden("nope".into()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Port(PortError::NotFound("gone".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Port(PortError::Conflict("taken".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Port(PortError::Upstream("mail".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_failures_carry_field_level_errors() {
        let (_, body) = ApiError::Port(PortError::invalid("email", "required")).render();
        assert!(!body.success);
        let errors = body.errors.unwrap();
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[0].message, "required");
    }
}
