//! Domain services for the Librería bookstore backend.
//!
//! Each service wraps a store trait and owns one slice of the business
//! rules:
//!
//! - [`PurchaseEngine`]: the purchase lifecycle. Validates input, delegates
//!   the atomic transaction to the store, and emits the audit trail.
//! - [`CatalogService`]: book and category administration.
//! - [`IdentityService`]: registration, login, bearer tokens, user
//!   administration.
//! - [`ReportingService`]: read-only aggregates for users and
//!   administrators.
//!
//! Authorization lives here, not in the HTTP layer: admin-only operations
//! take the caller's [`Identity`](libreria_core::Identity) and reject
//! non-administrators with a `Forbidden` error naming the required role.

pub mod catalog;
pub mod identity;
pub mod purchase;
pub mod reporting;

pub use catalog::{BookInput, CatalogService, CategoryInput};
pub use identity::{Credentials, IdentityService, ProfileUpdate, RegisterInput, Session};
pub use purchase::{PurchaseEngine, PurchaseInput, Receipt, ReceiptBook};
pub use reporting::ReportingService;

use libreria_core::{DomainError, Identity, Result, Role};

/// Reject callers that do not hold the administrator role.
pub(crate) fn ensure_admin(who: &Identity) -> Result<()> {
    if who.is_admin() {
        Ok(())
    } else {
        Err(DomainError::role_required(Role::Admin, who.role))
    }
}
