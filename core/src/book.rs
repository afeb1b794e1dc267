//! Books and their optional inventory tracking.

use crate::ids::BookId;
use crate::money::Cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inventory state of a book.
///
/// Stock tracking is opt-in per book. `Untracked` books sell without any
/// inventory check; `Tracked` books carry an explicit count that the
/// purchase engine decrements on purchase and restores on cancellation.
/// The count can never go negative: [`Stock::reserve`] refuses before that
/// happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Stock {
    /// The book does not track inventory.
    Untracked,
    /// The book tracks inventory; this many units remain.
    Tracked(u32),
}

impl Stock {
    /// Reserve `cantidad` units. Returns the decremented stock, or
    /// `Err(available)` when a tracked count cannot cover the request.
    /// Untracked stock always succeeds unchanged.
    pub fn reserve(self, cantidad: u32) -> std::result::Result<Self, u32> {
        match self {
            Self::Untracked => Ok(Self::Untracked),
            Self::Tracked(disponible) => match disponible.checked_sub(cantidad) {
                Some(resto) => Ok(Self::Tracked(resto)),
                None => Err(disponible),
            },
        }
    }

    /// Return `cantidad` units to stock (purchase cancellation).
    /// Untracked stock is unchanged.
    #[must_use]
    pub const fn restore(self, cantidad: u32) -> Self {
        match self {
            Self::Untracked => Self::Untracked,
            Self::Tracked(disponible) => Self::Tracked(disponible.saturating_add(cantidad)),
        }
    }

    /// Remaining units, or `None` when untracked.
    #[must_use]
    pub const fn available(self) -> Option<u32> {
        match self {
            Self::Untracked => None,
            Self::Tracked(disponible) => Some(disponible),
        }
    }
}

impl From<Option<u32>> for Stock {
    fn from(count: Option<u32>) -> Self {
        count.map_or(Self::Untracked, Self::Tracked)
    }
}

impl From<Stock> for Option<u32> {
    fn from(stock: Stock) -> Self {
        stock.available()
    }
}

/// A book in the catalog.
///
/// Prices are minor-currency integers; `moneda` is a 3-letter code.
/// `imagen_path` and `contenido_path` reference stored assets; the public
/// URLs are derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Identifier.
    pub id: BookId,
    /// Title.
    pub titulo: String,
    /// Author, when known.
    pub autor: Option<String>,
    /// Free-form description.
    pub descripcion: Option<String>,
    /// Unit price in cents. Never negative.
    pub precio_cents: Cents,
    /// 3-letter currency code.
    pub moneda: String,
    /// Inventory state.
    pub stock: Stock,
    /// Stored cover image reference.
    pub imagen_path: Option<String>,
    /// Stored digital content reference.
    pub contenido_path: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Public URL of the cover image, if one is stored.
    #[must_use]
    pub fn imagen_url(&self) -> Option<String> {
        self.imagen_path.as_deref().map(|p| format!("/storage/{p}"))
    }

    /// Public URL of the digital content, if any is stored.
    #[must_use]
    pub fn contenido_url(&self) -> Option<String> {
        self.contenido_path
            .as_deref()
            .map(|p| format!("/storage/{p}"))
    }
}
