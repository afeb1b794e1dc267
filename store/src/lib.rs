//! Persistence layer for the Librería bookstore backend.
//!
//! Three async store traits ([`CatalogStore`], [`IdentityStore`],
//! [`PurchaseStore`]) with two implementations:
//!
//! - [`MemoryStore`]: in-process storage behind a single mutex. Used by the
//!   test suite and for running the server without a database. The mutex
//!   makes every operation trivially serializable, which is exactly the
//!   discipline the purchase transaction needs.
//! - [`PostgresStore`]: sqlx-backed storage. The purchase create/cancel
//!   sequence runs inside a transaction with `SELECT ... FOR UPDATE` on the
//!   book row, so concurrent purchases cannot oversell.
//!
//! The traits return `libreria_core::DomainError` directly: backends map
//! their native failures (unique violations, missing rows) onto the domain
//! taxonomy so the engine never sees database error types.

pub mod memory;
pub mod postgres;
pub mod traits;
pub mod types;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use traits::{CatalogStore, IdentityStore, PurchaseStore};
pub use types::{
    BookFilter, BookRecord, BookSortField, BookUpdate, DashboardReport, NewBook, Page, PageRequest,
    PurchaseDraft, PurchaseRecord, SaleRecord, SortOrder, TopBook, UserStatistics,
};
