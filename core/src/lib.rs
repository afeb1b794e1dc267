//! Domain model for the Librería bookstore backend.
//!
//! This crate holds the pure domain: identifiers, money, the catalog
//! entities (books and categories), users and roles, purchases with their
//! status machine, and the error taxonomy shared by every layer above.
//!
//! Nothing here performs I/O. Persistence lives in `libreria-store`,
//! use-case orchestration in `libreria-engine`, and the HTTP surface in
//! `libreria-web`.

pub mod book;
pub mod category;
pub mod error;
pub mod identity;
pub mod ids;
pub mod money;
pub mod purchase;
pub mod slug;
pub mod user;

pub use book::{Book, Stock};
pub use category::Category;
pub use error::{DomainError, FieldError, Result};
pub use identity::Identity;
pub use ids::{BookId, CategoryId, PurchaseId, UserId};
pub use money::{Cents, DEFAULT_CURRENCY};
pub use purchase::{
    validate_cantidad, validate_metodo_pago, EstadoPago, PaymentMethod, Purchase, PurchaseStatus,
};
pub use user::{Role, User};
