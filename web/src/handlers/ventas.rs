//! Admin sales ledger endpoints.

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use libreria_core::{
    Cents, DomainError, EstadoPago, PaymentMethod, Purchase, PurchaseId, PurchaseStatus,
};
use libreria_store::SaleRecord;
use serde::{Deserialize, Serialize};

/// Buyer info embedded in a sale.
#[derive(Debug, Serialize)]
pub struct SaleBuyerDto {
    /// Display name, or a placeholder when the account is gone.
    pub name: String,
    /// Email, or `N/A` when the account is gone.
    pub email: String,
}

/// Book info embedded in a sale.
#[derive(Debug, Serialize)]
pub struct SaleBookDto {
    /// Title, or a placeholder when the book is gone.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// Cover URL, when stored.
    pub imagen_url: Option<String>,
}

/// A sale as administrators see it.
#[derive(Debug, Serialize)]
pub struct VentaDto {
    /// Purchase identifier.
    pub id: PurchaseId,
    /// Units sold.
    pub cantidad: u32,
    /// Unit price at sale time, in cents.
    pub precio_unitario_cents: Cents,
    /// Total charged, in cents.
    pub total_cents: Cents,
    /// Currency code.
    pub moneda: String,
    /// Declared payment method.
    pub metodo_pago: PaymentMethod,
    /// Lifecycle state.
    pub estado: PurchaseStatus,
    /// Sale timestamp.
    pub created_at: DateTime<Utc>,
    /// The buyer.
    pub usuario: SaleBuyerDto,
    /// The book.
    pub libro: SaleBookDto,
}

impl From<SaleRecord> for VentaDto {
    fn from(sale: SaleRecord) -> Self {
        let compra = sale.compra;
        Self {
            id: compra.id,
            cantidad: compra.cantidad,
            precio_unitario_cents: compra.precio_unitario_cents,
            total_cents: compra.total_cents,
            moneda: compra.moneda,
            metodo_pago: compra.metodo_pago,
            estado: compra.estado,
            created_at: compra.created_at,
            usuario: SaleBuyerDto {
                name: sale.user_name,
                email: sale.user_email,
            },
            libro: SaleBookDto {
                titulo: sale.libro_titulo,
                autor: sale.libro_autor,
                imagen_url: sale.libro_imagen_url,
            },
        }
    }
}

/// Payment state assignment request body.
#[derive(Debug, Deserialize)]
pub struct EstadoRequest {
    /// One of `pendiente`, `pagado`, `rechazado`.
    pub estado_pago: String,
}

/// `GET /api/admin/ventas`
pub async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<VentaDto>>, AppError> {
    let sales = state.reporting.list_sales(&caller.identity).await?;
    Ok(Json(sales.into_iter().map(VentaDto::from).collect()))
}

/// `GET /api/admin/ventas/:id`
pub async fn get(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<PurchaseId>,
) -> Result<Json<VentaDto>, AppError> {
    let sale = state.reporting.get_sale(&caller.identity, id).await?;
    Ok(Json(sale.into()))
}

/// `PATCH /api/admin/ventas/:id/estado`
pub async fn update_estado(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<PurchaseId>,
    Json(req): Json<EstadoRequest>,
) -> Result<Json<Purchase>, AppError> {
    let estado: EstadoPago = req
        .estado_pago
        .parse()
        .map_err(|()| DomainError::field("estado_pago", "Estado de pago no válido"))?;
    let compra = state
        .purchases
        .update_status(&caller.identity, id, estado)
        .await?;
    Ok(Json(compra))
}
