//! Catalog book endpoints.

use super::PageDto;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use libreria_core::{BookId, Category, CategoryId, Cents};
use libreria_engine::BookInput;
use libreria_store::{BookFilter, BookRecord, PageRequest};
use serde::{Deserialize, Serialize};

/// A book as it appears on the wire.
#[derive(Debug, Serialize)]
pub struct BookDto {
    /// Identifier.
    pub id: BookId,
    /// Title.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// Description.
    pub descripcion: Option<String>,
    /// Unit price in cents.
    pub precio_cents: Cents,
    /// Currency code.
    pub moneda: String,
    /// Remaining units; `null` when inventory is not tracked.
    pub stock: Option<u32>,
    /// Cover URL, when stored.
    pub imagen_url: Option<String>,
    /// Content URL, when stored.
    pub contenido_url: Option<String>,
    /// Attached categories.
    pub categorias: Vec<Category>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<BookRecord> for BookDto {
    fn from(record: BookRecord) -> Self {
        let libro = record.libro;
        Self {
            imagen_url: libro.imagen_url(),
            contenido_url: libro.contenido_url(),
            id: libro.id,
            titulo: libro.titulo,
            autor: libro.autor,
            descripcion: libro.descripcion,
            precio_cents: libro.precio_cents,
            moneda: libro.moneda,
            stock: libro.stock.available(),
            categorias: record.categorias,
            created_at: libro.created_at,
            updated_at: libro.updated_at,
        }
    }
}

/// Book create/update request body. `precio` is in major currency units.
#[derive(Debug, Deserialize)]
pub struct LibroRequest {
    /// Title.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// Description.
    pub descripcion: Option<String>,
    /// Unit price in major units (`19.99`).
    pub precio: Option<f64>,
    /// Initial stock; omitted means untracked. Ignored on update.
    pub stock: Option<i64>,
    /// Stored cover reference.
    pub imagen_path: Option<String>,
    /// Stored content reference.
    pub contenido_path: Option<String>,
    /// Full category set; omitted behaves as empty.
    pub categorias: Option<Vec<CategoryId>>,
}

impl From<LibroRequest> for BookInput {
    fn from(req: LibroRequest) -> Self {
        Self {
            titulo: req.titulo,
            autor: req.autor,
            descripcion: req.descripcion,
            precio: req.precio,
            stock: req.stock,
            imagen_path: req.imagen_path,
            contenido_path: req.contenido_path,
            categorias: req.categorias.unwrap_or_default(),
        }
    }
}

/// Storefront listing query parameters.
///
/// Price bounds arrive in major currency units. Unrecognized `sort_by` and
/// `sort_order` values fall back to newest-first.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page number, 1-based.
    pub page: Option<u32>,
    /// Items per page, capped at 100.
    pub per_page: Option<u32>,
    /// Lowest acceptable price, in major units.
    pub min: Option<f64>,
    /// Highest acceptable price, in major units.
    pub max: Option<f64>,
    /// Category slug to restrict to.
    pub categoria: Option<String>,
    /// Substring matched against title and author.
    pub search: Option<String>,
    /// Sort column: `created_at`, `precio`, or `titulo`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc`.
    pub sort_order: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> BookFilter {
        BookFilter {
            min_cents: self.min.map(Cents::from_major),
            max_cents: self.max.map(Cents::from_major),
            categoria_slug: self.categoria.clone().filter(|s| !s.is_empty()),
            search: self.search.clone().filter(|s| !s.is_empty()),
            sort_by: self
                .sort_by
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            sort_order: self
                .sort_order
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// `GET /api/libros`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PageDto<BookDto>>, AppError> {
    let page = state
        .catalog
        .list_books(query.filter(), PageRequest::new(query.page, query.per_page))
        .await?;
    Ok(Json(PageDto::from_page(page, BookDto::from)))
}

/// `GET /api/libros/:id`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<BookDto>, AppError> {
    let record = state.catalog.get_book(id).await?;
    Ok(Json(record.into()))
}

/// `POST /api/admin/libros`
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(req): Json<LibroRequest>,
) -> Result<(StatusCode, Json<BookDto>), AppError> {
    let record = state
        .catalog
        .create_book(&caller.identity, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// `PUT /api/admin/libros/:id`
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<BookId>,
    Json(req): Json<LibroRequest>,
) -> Result<Json<BookDto>, AppError> {
    let record = state
        .catalog
        .update_book(&caller.identity, id, req.into())
        .await?;
    Ok(Json(record.into()))
}

/// `DELETE /api/admin/libros/:id`
pub async fn delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<BookId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_book(&caller.identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
