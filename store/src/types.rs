//! Input and output types for the store traits.

use chrono::{DateTime, Utc};
use libreria_core::{
    Book, BookId, Category, CategoryId, Cents, PaymentMethod, Purchase, Stock, UserId,
};
use serde::Serialize;

/// Data required to create a book.
#[derive(Debug, Clone)]
pub struct NewBook {
    /// Title.
    pub titulo: String,
    /// Author, when known.
    pub autor: Option<String>,
    /// Description.
    pub descripcion: Option<String>,
    /// Unit price in cents.
    pub precio_cents: Cents,
    /// Currency code.
    pub moneda: String,
    /// Inventory state.
    pub stock: Stock,
    /// Stored cover reference.
    pub imagen_path: Option<String>,
    /// Stored content reference.
    pub contenido_path: Option<String>,
    /// Full category set to attach. Empty attaches none.
    pub categorias: Vec<CategoryId>,
}

/// Full-replacement update of a book.
///
/// `categorias` is the complete new membership set: the store diffs it
/// against the current joins and applies the difference atomically with the
/// book row update. An empty set detaches everything.
#[derive(Debug, Clone)]
pub struct BookUpdate {
    /// New title.
    pub titulo: String,
    /// New author.
    pub autor: Option<String>,
    /// New description.
    pub descripcion: Option<String>,
    /// New unit price in cents.
    ///
    /// Stock is deliberately absent: it is set at creation and thereafter
    /// mutated only by the purchase engine.
    pub precio_cents: Cents,
    /// Replacement cover reference; `None` keeps the current one.
    pub imagen_path: Option<String>,
    /// Replacement content reference; `None` keeps the current one.
    pub contenido_path: Option<String>,
    /// Full replacement category set.
    pub categorias: Vec<CategoryId>,
}

/// A book together with its categories.
#[derive(Debug, Clone, Serialize)]
pub struct BookRecord {
    /// The book.
    pub libro: Book,
    /// Attached categories, ordered by name.
    pub categorias: Vec<Category>,
}

/// Column the public book listing sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSortField {
    /// Creation timestamp.
    #[default]
    CreatedAt,
    /// Unit price.
    Precio,
    /// Title.
    Titulo,
}

impl std::str::FromStr for BookSortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "precio" => Ok(Self::Precio),
            "titulo" => Ok(Self::Titulo),
            _ => Err(()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Storefront filters for the book listing.
///
/// The default matches every book and sorts newest first. Price bounds are
/// inclusive; `search` matches title or author as a case-insensitive
/// substring; `categoria_slug` keeps only books tagged with that category.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Lowest acceptable unit price.
    pub min_cents: Option<Cents>,
    /// Highest acceptable unit price.
    pub max_cents: Option<Cents>,
    /// Slug of the category to restrict to.
    pub categoria_slug: Option<String>,
    /// Substring to look for in title or author.
    pub search: Option<String>,
    /// Sort column.
    pub sort_by: BookSortField,
    /// Sort direction.
    pub sort_order: SortOrder,
}

/// Validated input for the atomic purchase transaction.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseDraft {
    /// Buyer.
    pub user_id: UserId,
    /// Book to purchase.
    pub libro_id: BookId,
    /// Validated quantity in `[1, 10]`.
    pub cantidad: u32,
    /// Declared payment method.
    pub metodo_pago: PaymentMethod,
}

/// A purchase joined with its book, as the owner sees it.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    /// The purchase.
    pub compra: Purchase,
    /// The purchased book.
    pub libro: Book,
    /// Names of the book's categories.
    pub categorias: Vec<Category>,
}

/// A purchase joined with buyer and book info, as administrators see it.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    /// The purchase.
    pub compra: Purchase,
    /// Buyer display name.
    pub user_name: String,
    /// Buyer email.
    pub user_email: String,
    /// Book title.
    pub libro_titulo: String,
    /// Book author.
    pub libro_autor: Option<String>,
    /// Book cover URL, when stored.
    pub libro_imagen_url: Option<String>,
}

/// The most frequently purchased book of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopBook {
    /// Book identifier.
    pub libro_id: BookId,
    /// Title.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// How many purchases reference it.
    pub total: u64,
}

/// Per-user purchase statistics.
#[derive(Debug, Clone, Serialize)]
pub struct UserStatistics {
    /// All purchases of the user.
    pub total_compras: u64,
    /// Sum of purchase totals, in cents.
    pub total_gastado_cents: Cents,
    /// Purchases in `completada` state.
    pub compras_completadas: u64,
    /// Purchases in `pendiente` state.
    pub compras_pendientes: u64,
    /// Most-purchased book. Tie-break is whichever comes first in
    /// descending-count order.
    pub libro_mas_comprado: Option<TopBook>,
}

/// Point-in-time aggregates for the admin dashboard.
#[derive(Debug, Clone)]
pub struct DashboardReport {
    /// Sales recorded today, in cents.
    pub ventas_hoy_cents: Cents,
    /// All-time sales, in cents.
    pub total_ventas_cents: Cents,
    /// Number of books in the catalog.
    pub total_libros: u64,
    /// Latest sales, newest first, capped at 20.
    pub ventas: Vec<SaleRecord>,
}

/// Pagination parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    /// Page number, starting at 1.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl PageRequest {
    /// Default page size for listings.
    pub const DEFAULT_PER_PAGE: u32 = 15;

    /// Build a page request, clamping degenerate values.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, 100),
        }
    }

    /// Offset of the first item of this page.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total matching items across all pages.
    pub total: u64,
    /// Page number, 1-based.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Map the items, keeping the pagination envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Timestamp source used by both store backends.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_degenerate_values() {
        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 1);

        let req = PageRequest::new(Some(3), Some(500));
        assert_eq!(req.page, 3);
        assert_eq!(req.per_page, 100);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest::new(Some(1), Some(15)).offset(), 0);
        assert_eq!(PageRequest::new(Some(3), Some(15)).offset(), 30);
    }
}
