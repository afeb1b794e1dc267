//! Error taxonomy shared by the store, engine, and web layers.

use crate::user::Role;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// A validation failure tied to a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as it appears on the wire.
    pub field: String,
    /// Human-readable message for that field.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Domain error taxonomy.
///
/// Every fallible operation in the store and engine layers returns one of
/// these variants. The web layer maps them onto HTTP status codes:
/// `InvalidInput` → 422, `NotFound` → 404, `InsufficientStock` and
/// `InvalidState` → 400, `Forbidden` → 403, `InvalidCredentials` and
/// `Unauthenticated` → 401, `Internal` → 500.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("Datos inválidos")]
    InvalidInput {
        /// Field-level messages.
        errors: Vec<FieldError>,
    },

    /// The referenced entity does not exist, or is not visible to the
    /// caller. Ownership-scoped lookups report missing rows the same way.
    #[error("{recurso} no encontrado")]
    NotFound {
        /// Display name of the missing resource ("Libro", "Compra", ...).
        recurso: &'static str,
    },

    /// A stock-tracked book cannot cover the requested quantity.
    #[error("Stock insuficiente. Solo quedan {disponible} unidades disponibles.")]
    InsufficientStock {
        /// Units still available at the time of the check.
        disponible: u32,
    },

    /// The operation is not legal in the entity's current state.
    #[error("{0}")]
    InvalidState(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("{message}")]
    Forbidden {
        /// Human-readable refusal.
        message: String,
        /// Role the operation requires, when role-based.
        required_role: Option<Role>,
        /// Role the caller actually has, when role-based.
        actual_role: Option<Role>,
    },

    /// Login failed: unknown email or wrong password.
    #[error("Credenciales inválidas")]
    InvalidCredentials,

    /// The request carried no valid bearer token.
    #[error("No autenticado.")]
    Unauthenticated,

    /// Unexpected persistence or logic failure. The inner detail is logged
    /// server-side and only surfaced to callers in debug mode.
    #[error("Error interno: {0}")]
    Internal(String),
}

impl DomainError {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Shorthand for a missing-entity error.
    #[must_use]
    pub const fn not_found(recurso: &'static str) -> Self {
        Self::NotFound { recurso }
    }

    /// Shorthand for a non-role-based refusal.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            required_role: None,
            actual_role: None,
        }
    }

    /// Refusal naming the required and actual roles, for the 403 body.
    #[must_use]
    pub fn role_required(required: Role, actual: Role) -> Self {
        Self::Forbidden {
            message: "No tienes permisos de administrador.".to_string(),
            required_role: Some(required),
            actual_role: Some(actual),
        }
    }

    /// Wrap an unexpected failure, preserving its message for the log.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// True when the variant is caller-correctable input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InsufficientStock { .. }
                | Self::InvalidState(_)
                | Self::InvalidCredentials
        )
    }
}
