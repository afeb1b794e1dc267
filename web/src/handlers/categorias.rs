//! Catalog category endpoints.
//!
//! Categories serialize directly: they carry no secrets and their wire
//! shape matches the domain type.

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use libreria_core::{Category, CategoryId};
use libreria_engine::CategoryInput;
use serde::Deserialize;

/// Category create/update request body.
#[derive(Debug, Deserialize)]
pub struct CategoriaRequest {
    /// Display name, unique across categories.
    pub nombre: String,
    /// Optional description.
    pub descripcion: Option<String>,
}

impl From<CategoriaRequest> for CategoryInput {
    fn from(req: CategoriaRequest) -> Self {
        Self {
            nombre: req.nombre,
            descripcion: req.descripcion,
        }
    }
}

/// `GET /api/categorias`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// `GET /api/categorias/:id`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.catalog.get_category(id).await?))
}

/// `POST /api/admin/categorias`
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(req): Json<CategoriaRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state
        .catalog
        .create_category(&caller.identity, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/admin/categorias/:id`
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<CategoryId>,
    Json(req): Json<CategoriaRequest>,
) -> Result<Json<Category>, AppError> {
    let category = state
        .catalog
        .update_category(&caller.identity, id, req.into())
        .await?;
    Ok(Json(category))
}

/// `DELETE /api/admin/categorias/:id`
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_category(&caller.identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
