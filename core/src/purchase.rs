//! Purchases: the one entity with real invariants.
//!
//! A purchase snapshots the book's unit price at creation time, so the
//! total recorded then (`precio_unitario_cents * cantidad`) stays valid
//! even if the book's listed price later changes. Status transitions are
//! deliberately permissive for administrators, who may move a purchase
//! freely among `pendiente`, `completada` and `rechazada`, while
//! `cancelada` is reachable only through user-initiated cancellation of a
//! pending purchase, and nothing leaves `cancelada`.

use crate::error::{DomainError, FieldError, Result};
use crate::ids::{BookId, PurchaseId, UserId};
use crate::money::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest accepted quantity per purchase.
pub const CANTIDAD_MIN: u32 = 1;
/// Largest accepted quantity per purchase.
pub const CANTIDAD_MAX: u32 = 10;

/// Payment method declared by the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank transfer.
    Transferencia,
    /// Credit or debit card.
    Tarjeta,
    /// `PayPal`.
    Paypal,
    /// Cash.
    Efectivo,
    /// The buyer declared no method.
    NoEspecificado,
}

impl PaymentMethod {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transferencia => "transferencia",
            Self::Tarjeta => "tarjeta",
            Self::Paypal => "paypal",
            Self::Efectivo => "efectivo",
            Self::NoEspecificado => "no_especificado",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "transferencia" => Ok(Self::Transferencia),
            "tarjeta" => Ok(Self::Tarjeta),
            "paypal" => Ok(Self::Paypal),
            "efectivo" => Ok(Self::Efectivo),
            "no_especificado" => Ok(Self::NoEspecificado),
            _ => Err(()),
        }
    }
}

/// Lifecycle state of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Awaiting payment confirmation.
    Pendiente,
    /// Paid and fulfilled (purchases auto-confirm on creation).
    Completada,
    /// Rejected by an administrator.
    Rechazada,
    /// Cancelled by the buyer while still pending.
    Cancelada,
}

impl PurchaseStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Completada => "completada",
            Self::Rechazada => "rechazada",
            Self::Cancelada => "cancelada",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(Self::Pendiente),
            "completada" => Ok(Self::Completada),
            "rechazada" => Ok(Self::Rechazada),
            "cancelada" => Ok(Self::Cancelada),
            _ => Err(()),
        }
    }
}

/// Payment state an administrator may assign, as it appears on the wire.
///
/// This is the request-side vocabulary of `PATCH /admin/ventas/:id/estado`;
/// it maps onto [`PurchaseStatus`], with `pagado` landing on `completada`.
/// `cancelada` is intentionally absent: administrators cannot cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoPago {
    /// Back to awaiting payment.
    Pendiente,
    /// Payment confirmed.
    Pagado,
    /// Payment rejected.
    Rechazado,
}

impl EstadoPago {
    /// The purchase status this assignment produces.
    #[must_use]
    pub const fn into_status(self) -> PurchaseStatus {
        match self {
            Self::Pendiente => PurchaseStatus::Pendiente,
            Self::Pagado => PurchaseStatus::Completada,
            Self::Rechazado => PurchaseStatus::Rechazada,
        }
    }
}

impl FromStr for EstadoPago {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(Self::Pendiente),
            "pagado" => Ok(Self::Pagado),
            "rechazado" => Ok(Self::Rechazado),
            _ => Err(()),
        }
    }
}

/// A recorded purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    /// Identifier.
    pub id: PurchaseId,
    /// Owning user.
    pub user_id: UserId,
    /// Purchased book.
    pub libro_id: BookId,
    /// Units purchased, in `[CANTIDAD_MIN, CANTIDAD_MAX]`.
    pub cantidad: u32,
    /// Unit price at purchase time. Immutable thereafter.
    pub precio_unitario_cents: Cents,
    /// `precio_unitario_cents * cantidad`, fixed at creation.
    pub total_cents: Cents,
    /// Currency code copied from the book.
    pub moneda: String,
    /// Declared payment method.
    pub metodo_pago: PaymentMethod,
    /// Lifecycle state.
    pub estado: PurchaseStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// Build a purchase, enforcing `total == unit price * cantidad`.
    ///
    /// Both store implementations go through this constructor inside their
    /// transaction, so the total invariant holds no matter the backend.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        libro_id: BookId,
        cantidad: u32,
        precio_unitario_cents: Cents,
        moneda: String,
        metodo_pago: PaymentMethod,
        estado: PurchaseStatus,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let total_cents = precio_unitario_cents
            .checked_total(cantidad)
            .ok_or_else(|| DomainError::internal("desbordamiento al calcular el total"))?;
        Ok(Self {
            id: PurchaseId::new(),
            user_id,
            libro_id,
            cantidad,
            precio_unitario_cents,
            total_cents,
            moneda,
            metodo_pago,
            estado,
            created_at: now,
        })
    }

    /// Only pending purchases can be cancelled by their owner.
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        matches!(self.estado, PurchaseStatus::Pendiente)
    }

    /// Administrators may reassign any state except out of `cancelada`.
    #[must_use]
    pub const fn admin_can_update(&self) -> bool {
        !matches!(self.estado, PurchaseStatus::Cancelada)
    }
}

/// Validate a raw quantity, defaulting to 1 when absent.
pub fn validate_cantidad(raw: Option<i64>) -> std::result::Result<u32, FieldError> {
    match raw {
        None => Ok(CANTIDAD_MIN),
        Some(n) if n < i64::from(CANTIDAD_MIN) => Err(FieldError::new(
            "cantidad",
            format!("La cantidad mínima es {CANTIDAD_MIN}"),
        )),
        Some(n) if n > i64::from(CANTIDAD_MAX) => Err(FieldError::new(
            "cantidad",
            format!("La cantidad máxima es {CANTIDAD_MAX}"),
        )),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n) => Ok(n as u32),
    }
}

/// Parse a raw payment method, defaulting to `no_especificado` when absent.
pub fn validate_metodo_pago(raw: Option<&str>) -> std::result::Result<PaymentMethod, FieldError> {
    match raw {
        None => Ok(PaymentMethod::NoEspecificado),
        Some(s) => s
            .parse()
            .map_err(|()| FieldError::new("metodo_pago", "Método de pago no válido")),
    }
}
