//! Admin dashboard endpoint.

use super::ventas::VentaDto;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, Json};
use libreria_core::Cents;
use libreria_store::DashboardReport;
use serde::Serialize;

/// Dashboard aggregates.
#[derive(Debug, Serialize)]
pub struct DashboardDto {
    /// Sales recorded today, in cents.
    pub ventas_hoy_cents: Cents,
    /// All-time sales, in cents.
    pub total_ventas_cents: Cents,
    /// Number of books in the catalog.
    pub total_libros: u64,
    /// Latest sales, newest first, capped at 20.
    pub ultimas_ventas: Vec<VentaDto>,
}

impl From<DashboardReport> for DashboardDto {
    fn from(report: DashboardReport) -> Self {
        Self {
            ventas_hoy_cents: report.ventas_hoy_cents,
            total_ventas_cents: report.total_ventas_cents,
            total_libros: report.total_libros,
            ultimas_ventas: report.ventas.into_iter().map(VentaDto::from).collect(),
        }
    }
}

/// `GET /api/admin/dashboard`
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<DashboardDto>, AppError> {
    let report = state.reporting.dashboard(&caller.identity).await?;
    Ok(Json(report.into()))
}
