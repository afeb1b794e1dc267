//! Error types for web handlers.
//!
//! [`AppError`] bridges the domain error taxonomy and HTTP responses,
//! implementing Axum's `IntoResponse`. Validation failures carry their
//! field-level messages into the body; role refusals carry the required
//! and actual roles so clients can explain the 403.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use libreria_core::{DomainError, FieldError, Role};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Field-level validation messages, when applicable
    errors: Vec<FieldError>,
    /// Role the operation required, on role-based refusals
    required_role: Option<Role>,
    /// Role the caller actually held, on role-based refusals
    actual_role: Option<Role>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            errors: Vec::new(),
            required_role: None,
            actual_role: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHENTICATED".to_string(),
        )
    }

    /// Create a 422 validation error with field messages.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        let mut err = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        );
        err.errors = errors;
        err
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidInput { errors } => {
                Self::validation("Datos inválidos", errors)
            }
            DomainError::NotFound { recurso } => Self::new(
                StatusCode::NOT_FOUND,
                format!("{recurso} no encontrado"),
                "NOT_FOUND".to_string(),
            ),
            DomainError::InsufficientStock { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                err.to_string(),
                "INSUFFICIENT_STOCK".to_string(),
            ),
            DomainError::InvalidState(message) => Self::new(
                StatusCode::BAD_REQUEST,
                message,
                "INVALID_STATE".to_string(),
            ),
            DomainError::Forbidden {
                message,
                required_role,
                actual_role,
            } => {
                let mut app = Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN".to_string());
                app.required_role = required_role;
                app.actual_role = actual_role;
                app
            }
            DomainError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                err.to_string(),
                "INVALID_CREDENTIALS".to_string(),
            ),
            DomainError::Unauthenticated => Self::unauthorized(err.to_string()),
            DomainError::Internal(detail) => {
                // Detail reaches the client only in debug builds.
                let message = if cfg!(debug_assertions) {
                    format!("Error interno del servidor: {detail}")
                } else {
                    "Error interno del servidor".to_string()
                };
                Self::internal(message).with_source(anyhow::anyhow!(detail))
            }
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Field-level validation messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
    /// Role the operation required.
    #[serde(skip_serializing_if = "Option::is_none")]
    required_role: Option<Role>,
    /// Role the caller holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_role: Option<Role>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            errors: self.errors,
            required_role: self.required_role,
            actual_role: self.actual_role,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::from(DomainError::not_found("Libro"));
        assert_eq!(err.to_string(), "[NOT_FOUND] Libro no encontrado");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_carries_fields() {
        let err = AppError::from(DomainError::field("cantidad", "La cantidad mínima es 1"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "cantidad");
    }

    #[test]
    fn test_insufficient_stock_is_bad_request() {
        let err = AppError::from(DomainError::InsufficientStock { disponible: 2 });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message,
            "Stock insuficiente. Solo quedan 2 unidades disponibles."
        );
    }

    #[test]
    fn test_forbidden_carries_roles() {
        let err = AppError::from(DomainError::role_required(Role::Admin, Role::User));
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.required_role, Some(Role::Admin));
        assert_eq!(err.actual_role, Some(Role::User));
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let err = AppError::from(DomainError::Unauthenticated);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
