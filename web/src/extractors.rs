//! Custom Axum extractors for authentication.
//!
//! - `BearerToken`: the raw token from the `Authorization` header
//! - `CurrentUser`: the authenticated user resolved through the identity
//!   service, with the [`Identity`] claims handlers pass to the engine
//!
//! Missing or invalid credentials reject with a 401 before the handler
//! runs.

use crate::error::AppError;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use libreria_core::{Identity, User};

/// Raw bearer token from the `Authorization: Bearer ...` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("No autenticado."))?;
        Ok(Self(token.to_string()))
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Full user record.
    pub user: User,
    /// Claims passed to the engine for authorization decisions.
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.identity.authenticate(&token).await?;
        let identity = Identity::new(user.id, user.role);
        Ok(Self { user, identity })
    }
}
