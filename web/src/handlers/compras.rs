//! Purchase endpoints for the buyer.

use super::libros::BookDto;
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
use libreria_core::{
    BookId, Cents, DomainError, PaymentMethod, Purchase, PurchaseId, PurchaseStatus,
};
use libreria_engine::{PurchaseInput, Receipt};
use libreria_store::{BookRecord, PageRequest, PurchaseRecord, UserStatistics};
use serde::{Deserialize, Serialize};

/// Purchase request body.
#[derive(Debug, Deserialize)]
pub struct CompraRequest {
    /// Book to purchase.
    pub libro_id: BookId,
    /// Quantity; defaults to 1.
    pub cantidad: Option<i64>,
    /// Payment method; defaults to `no_especificado`.
    pub metodo_pago: Option<String>,
}

/// A purchase with its book, as the owner sees it.
#[derive(Debug, Serialize)]
pub struct CompraDto {
    /// Identifier.
    pub id: PurchaseId,
    /// Units purchased.
    pub cantidad: u32,
    /// Unit price at purchase time, in cents.
    pub precio_unitario_cents: Cents,
    /// Total charged, in cents.
    pub total_cents: Cents,
    /// Currency code.
    pub moneda: String,
    /// Declared payment method.
    pub metodo_pago: PaymentMethod,
    /// Lifecycle state.
    pub estado: PurchaseStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The purchased book as listed today.
    pub libro: BookDto,
}

impl From<PurchaseRecord> for CompraDto {
    fn from(record: PurchaseRecord) -> Self {
        let compra = record.compra;
        Self {
            id: compra.id,
            cantidad: compra.cantidad,
            precio_unitario_cents: compra.precio_unitario_cents,
            total_cents: compra.total_cents,
            moneda: compra.moneda,
            metodo_pago: compra.metodo_pago,
            estado: compra.estado,
            created_at: compra.created_at,
            libro: BookRecord {
                libro: record.libro,
                categorias: record.categorias,
            }
            .into(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ComprasQuery {
    /// Filter by status (`pendiente`, `completada`, `rechazada`,
    /// `cancelada`).
    pub estado: Option<String>,
    /// Page number, 1-based.
    pub page: Option<u32>,
    /// Items per page, capped at 100.
    pub per_page: Option<u32>,
}

fn parse_estado(raw: Option<&str>) -> Result<Option<PurchaseStatus>, AppError> {
    raw.map(|s| {
        s.parse()
            .map_err(|()| DomainError::field("estado", "Estado no válido").into())
    })
    .transpose()
}

/// `POST /api/compras`
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(req): Json<CompraRequest>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let receipt = state
        .purchases
        .purchase(
            &caller.identity,
            PurchaseInput {
                libro_id: req.libro_id,
                cantidad: req.cantidad,
                metodo_pago: req.metodo_pago,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// `GET /api/compras`
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<ComprasQuery>,
) -> Result<Json<PageDto<CompraDto>>, AppError> {
    let estado = parse_estado(query.estado.as_deref())?;
    let page = state
        .purchases
        .list_own(
            &caller.identity,
            estado,
            PageRequest::new(query.page, query.per_page),
        )
        .await?;
    Ok(Json(PageDto::from_page(page, CompraDto::from)))
}

/// `GET /api/compras/:id`
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<PurchaseId>,
) -> Result<Json<CompraDto>, AppError> {
    let record = state.purchases.get_own(&caller.identity, id).await?;
    Ok(Json(record.into()))
}

/// `PATCH /api/compras/:id/cancelar`
pub async fn cancel(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<PurchaseId>,
) -> Result<Json<Purchase>, AppError> {
    let compra = state.purchases.cancel(&caller.identity, id).await?;
    Ok(Json(compra))
}

/// `GET /api/compras/estadisticas`
pub async fn statistics(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<UserStatistics>, AppError> {
    let stats = state.reporting.user_statistics(&caller.identity).await?;
    Ok(Json(stats))
}
