//! Store traits implemented by every backend.

use crate::types::{
    BookFilter, BookRecord, BookUpdate, DashboardReport, NewBook, Page, PageRequest, PurchaseDraft,
    PurchaseRecord, SaleRecord, UserStatistics,
};
use async_trait::async_trait;
use libreria_core::{
    Book, BookId, Category, CategoryId, Purchase, PurchaseId, PurchaseStatus, Result, User, UserId,
};

/// Books and categories.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a book and attach the given category set.
    ///
    /// Unknown category ids fail with `NotFound`; nothing is written then.
    async fn create_book(&self, draft: NewBook) -> Result<BookRecord>;

    /// Replace a book's fields and its full category set in one unit.
    async fn update_book(&self, id: BookId, update: BookUpdate) -> Result<BookRecord>;

    /// Delete a book, its join rows, and its stored asset references.
    async fn delete_book(&self, id: BookId) -> Result<Book>;

    /// Fetch a book with its categories.
    async fn get_book(&self, id: BookId) -> Result<BookRecord>;

    /// List books matching the filter, ordered per its sort settings.
    async fn list_books(&self, filter: BookFilter, page: PageRequest) -> Result<Page<BookRecord>>;

    /// Insert a category. Name and slug must both be unique.
    async fn create_category(&self, category: Category) -> Result<Category>;

    /// Persist a modified category, re-validating name and slug uniqueness.
    async fn update_category(&self, category: Category) -> Result<Category>;

    /// Delete a category and its join rows.
    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    /// Fetch a category.
    async fn get_category(&self, id: CategoryId) -> Result<Category>;

    /// List all categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;
}

/// Users, roles, and bearer tokens.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a user. Fails with a field-level error on duplicate email.
    async fn create_user(&self, user: User) -> Result<User>;

    /// Fetch a user by id.
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Fetch a user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<User>;

    /// Persist a modified user, re-validating email uniqueness.
    async fn update_user(&self, user: User) -> Result<User>;

    /// List all users, newest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Delete a user and all their tokens.
    async fn delete_user(&self, id: UserId) -> Result<User>;

    /// Number of users holding the administrator role.
    async fn count_admins(&self) -> Result<u64>;

    /// Record a token hash for a user.
    async fn insert_token(&self, user_id: UserId, token_hash: String) -> Result<()>;

    /// Resolve a token hash to its user, or `Unauthenticated`.
    async fn user_by_token_hash(&self, token_hash: &str) -> Result<User>;

    /// Invalidate every token issued to a user.
    async fn delete_tokens(&self, user_id: UserId) -> Result<()>;
}

/// Purchases and their aggregates.
///
/// `create_purchase` and `cancel_purchase` are the two operations with a
/// strict atomicity contract (see crate docs): the stock check, price
/// snapshot, row insert/update, and stock mutation happen as one
/// serializable unit or not at all.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Atomically record a purchase with status `completada`.
    ///
    /// Inside one transaction: load the book (locked), check tracked stock
    /// against the quantity (`InsufficientStock` naming the remaining
    /// count), snapshot the unit price, insert the purchase row, and
    /// decrement tracked stock. Returns the purchase and the book as it was
    /// at snapshot time.
    async fn create_purchase(&self, draft: PurchaseDraft) -> Result<(Purchase, Book)>;

    /// Atomically cancel an owner's pending purchase, restoring tracked
    /// stock by the purchase quantity.
    ///
    /// Lookups are owner-scoped: a purchase belonging to someone else is
    /// `NotFound`, not `Forbidden`. Non-pending purchases fail with
    /// `InvalidState` and leave stock untouched.
    async fn cancel_purchase(&self, user_id: UserId, id: PurchaseId) -> Result<Purchase>;

    /// Set a purchase's status (administrator path).
    ///
    /// Any status may be assigned except that nothing leaves `cancelada`.
    async fn set_status(&self, id: PurchaseId, estado: PurchaseStatus) -> Result<Purchase>;

    /// Fetch one of the owner's purchases with its book.
    async fn get_for_user(&self, user_id: UserId, id: PurchaseId) -> Result<PurchaseRecord>;

    /// List the owner's purchases, newest first, optionally filtered by
    /// status.
    async fn list_for_user(
        &self,
        user_id: UserId,
        estado: Option<PurchaseStatus>,
        page: PageRequest,
    ) -> Result<Page<PurchaseRecord>>;

    /// List every sale with buyer and book info, newest first.
    async fn list_sales(&self) -> Result<Vec<SaleRecord>>;

    /// Fetch one sale with buyer and book info.
    async fn get_sale(&self, id: PurchaseId) -> Result<SaleRecord>;

    /// Aggregate a user's purchase statistics.
    async fn user_statistics(&self, user_id: UserId) -> Result<UserStatistics>;

    /// Aggregate the admin dashboard numbers.
    async fn dashboard(&self) -> Result<DashboardReport>;
}
