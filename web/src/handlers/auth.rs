//! Registration, login, sessions, and user administration.

use super::UserDto;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use libreria_core::UserId;
use libreria_engine::{Credentials, ProfileUpdate, RegisterInput, Session};
use serde::{Deserialize, Serialize};

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email, unique across users.
    pub email: String,
    /// Plaintext password, at least 8 characters.
    pub password: String,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}

/// Profile update request body.
#[derive(Debug, Deserialize)]
pub struct PerfilRequest {
    /// New display name.
    pub name: String,
    /// New email, unique across users.
    pub email: String,
    /// New plaintext password; omitted keeps the current one.
    pub password: Option<String>,
}

impl From<PerfilRequest> for ProfileUpdate {
    fn from(req: PerfilRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Session response: the user plus their fresh bearer token.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The authenticated user.
    pub user: UserDto,
    /// Bearer token for subsequent requests.
    pub token: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
        }
    }
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = state.identity.register(req.into()).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .identity
        .login(Credentials {
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok(Json(session.into()))
}

/// `POST /api/logout`
pub async fn logout(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<StatusCode, AppError> {
    state.identity.logout(&caller.identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/user`
pub async fn me(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<UserDto>, AppError> {
    let user = state.identity.me(&caller.identity).await?;
    Ok(Json(user.into()))
}

/// `PUT /api/user`
pub async fn update_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(req): Json<PerfilRequest>,
) -> Result<Json<UserDto>, AppError> {
    let user = state
        .identity
        .update_profile(&caller.identity, req.into())
        .await?;
    Ok(Json(user.into()))
}

/// `POST /api/admin/register`
pub async fn register_admin(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = state
        .identity
        .register_admin(&caller.identity, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// `GET /api/admin/usuarios`
pub async fn list_users(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<UserDto>>, AppError> {
    let users = state.identity.list_users(&caller.identity).await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// `DELETE /api/admin/usuarios/:id`
pub async fn delete_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserDto>, AppError> {
    let user = state.identity.delete_user(&caller.identity, id).await?;
    Ok(Json(user.into()))
}
