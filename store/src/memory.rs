//! In-memory store.
//!
//! All state lives behind a single mutex, so every store operation is
//! serializable by construction. The purchase transaction's
//! check-snapshot-insert-decrement sequence runs under one lock acquisition
//! and can never interleave with another purchase, which makes this backend
//! both the test double and a faithful model of the concurrency contract.

use crate::traits::{CatalogStore, IdentityStore, PurchaseStore};
use crate::types::{
    now, BookFilter, BookRecord, BookSortField, BookUpdate, DashboardReport, NewBook, Page,
    PageRequest, PurchaseDraft, PurchaseRecord, SaleRecord, SortOrder, TopBook, UserStatistics,
};
use async_trait::async_trait;
use libreria_core::{
    Book, BookId, Category, CategoryId, Cents, DomainError, Purchase, PurchaseId, PurchaseStatus,
    Result, Role, User, UserId,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    books: HashMap<BookId, Book>,
    book_categories: HashMap<BookId, BTreeSet<CategoryId>>,
    categories: HashMap<CategoryId, Category>,
    users: HashMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    purchases: HashMap<PurchaseId, Purchase>,
}

impl Inner {
    fn categories_of(&self, libro_id: BookId) -> Vec<Category> {
        let mut cats: Vec<Category> = self
            .book_categories
            .get(&libro_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.categories.get(id).cloned())
            .collect();
        cats.sort_by(|a, b| a.nombre.cmp(&b.nombre));
        cats
    }

    fn book_record(&self, libro: Book) -> BookRecord {
        let categorias = self.categories_of(libro.id);
        BookRecord { libro, categorias }
    }

    fn purchase_record(&self, compra: Purchase) -> Result<PurchaseRecord> {
        let libro = self
            .books
            .get(&compra.libro_id)
            .cloned()
            .ok_or(DomainError::not_found("Libro"))?;
        let categorias = self.categories_of(libro.id);
        Ok(PurchaseRecord {
            compra,
            libro,
            categorias,
        })
    }

    fn sale_record(&self, compra: Purchase) -> SaleRecord {
        let user = self.users.get(&compra.user_id);
        let libro = self.books.get(&compra.libro_id);
        SaleRecord {
            user_name: user.map_or_else(|| "Usuario no disponible".to_string(), |u| u.name.clone()),
            user_email: user.map_or_else(|| "N/A".to_string(), |u| u.email.clone()),
            libro_titulo: libro
                .map_or_else(|| "Libro no disponible".to_string(), |l| l.titulo.clone()),
            libro_autor: libro.and_then(|l| l.autor.clone()),
            libro_imagen_url: libro.and_then(Book::imagen_url),
            compra,
        }
    }

    fn check_category_ids(&self, ids: &[CategoryId]) -> Result<()> {
        for id in ids {
            if !self.categories.contains_key(id) {
                return Err(DomainError::not_found("Categoría"));
            }
        }
        Ok(())
    }

    fn check_category_unique(&self, category: &Category) -> Result<()> {
        let clash = self.categories.values().any(|c| {
            c.id != category.id && (c.nombre == category.nombre || c.slug == category.slug)
        });
        if clash {
            return Err(DomainError::field(
                "nombre",
                "El nombre de la categoría ya existe",
            ));
        }
        Ok(())
    }
}

/// In-memory implementation of all three store traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DomainError::internal("store lock poisoned"))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_book(&self, draft: NewBook) -> Result<BookRecord> {
        let mut inner = self.lock()?;
        inner.check_category_ids(&draft.categorias)?;

        let ts = now();
        let libro = Book {
            id: BookId::new(),
            titulo: draft.titulo,
            autor: draft.autor,
            descripcion: draft.descripcion,
            precio_cents: draft.precio_cents,
            moneda: draft.moneda,
            stock: draft.stock,
            imagen_path: draft.imagen_path,
            contenido_path: draft.contenido_path,
            created_at: ts,
            updated_at: ts,
        };
        inner
            .book_categories
            .insert(libro.id, draft.categorias.into_iter().collect());
        inner.books.insert(libro.id, libro.clone());
        Ok(inner.book_record(libro))
    }

    async fn update_book(&self, id: BookId, update: BookUpdate) -> Result<BookRecord> {
        let mut inner = self.lock()?;
        inner.check_category_ids(&update.categorias)?;

        let libro = {
            let libro = inner
                .books
                .get_mut(&id)
                .ok_or(DomainError::not_found("Libro"))?;
            libro.titulo = update.titulo;
            libro.autor = update.autor;
            libro.descripcion = update.descripcion;
            libro.precio_cents = update.precio_cents;
            if let Some(imagen) = update.imagen_path {
                libro.imagen_path = Some(imagen);
            }
            if let Some(contenido) = update.contenido_path {
                libro.contenido_path = Some(contenido);
            }
            libro.updated_at = now();
            libro.clone()
        };
        inner
            .book_categories
            .insert(id, update.categorias.into_iter().collect());
        Ok(inner.book_record(libro))
    }

    async fn delete_book(&self, id: BookId) -> Result<Book> {
        let mut inner = self.lock()?;
        let libro = inner
            .books
            .remove(&id)
            .ok_or(DomainError::not_found("Libro"))?;
        inner.book_categories.remove(&id);
        Ok(libro)
    }

    async fn get_book(&self, id: BookId) -> Result<BookRecord> {
        let inner = self.lock()?;
        let libro = inner
            .books
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Libro"))?;
        Ok(inner.book_record(libro))
    }

    async fn list_books(&self, filter: BookFilter, page: PageRequest) -> Result<Page<BookRecord>> {
        let inner = self.lock()?;
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut libros: Vec<Book> = inner
            .books
            .values()
            .filter(|l| filter.min_cents.is_none_or(|min| l.precio_cents >= min))
            .filter(|l| filter.max_cents.is_none_or(|max| l.precio_cents <= max))
            .filter(|l| match &filter.categoria_slug {
                None => true,
                Some(slug) => inner
                    .book_categories
                    .get(&l.id)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| inner.categories.get(id))
                    .any(|c| &c.slug == slug),
            })
            .filter(|l| match &search {
                None => true,
                Some(term) => {
                    l.titulo.to_lowercase().contains(term)
                        || l.autor
                            .as_deref()
                            .is_some_and(|a| a.to_lowercase().contains(term))
                }
            })
            .cloned()
            .collect();
        match filter.sort_by {
            BookSortField::CreatedAt => libros.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            BookSortField::Precio => libros.sort_by(|a, b| a.precio_cents.cmp(&b.precio_cents)),
            BookSortField::Titulo => libros.sort_by(|a, b| a.titulo.cmp(&b.titulo)),
        }
        if filter.sort_order == SortOrder::Desc {
            libros.reverse();
        }
        let total = libros.len() as u64;
        let items = libros
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .map(|libro| inner.book_record(libro))
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn create_category(&self, category: Category) -> Result<Category> {
        let mut inner = self.lock()?;
        inner.check_category_unique(&category)?;
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: Category) -> Result<Category> {
        let mut inner = self.lock()?;
        if !inner.categories.contains_key(&category.id) {
            return Err(DomainError::not_found("Categoría"));
        }
        inner.check_category_unique(&category)?;
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .categories
            .remove(&id)
            .ok_or(DomainError::not_found("Categoría"))?;
        for members in inner.book_categories.values_mut() {
            members.remove(&id);
        }
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category> {
        let inner = self.lock()?;
        inner
            .categories
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Categoría"))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let inner = self.lock()?;
        let mut cats: Vec<Category> = inner.categories.values().cloned().collect();
        cats.sort_by(|a, b| a.nombre.cmp(&b.nombre));
        Ok(cats)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::field("email", "Este email ya está registrado"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let inner = self.lock()?;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Usuario"))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let inner = self.lock()?;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DomainError::not_found("Usuario"))
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&user.id) {
            return Err(DomainError::not_found("Usuario"));
        }
        if inner
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(DomainError::field("email", "Este email ya está registrado"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.lock()?;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete_user(&self, id: UserId) -> Result<User> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .remove(&id)
            .ok_or(DomainError::not_found("Usuario"))?;
        inner.tokens.retain(|_, owner| *owner != id);
        Ok(user)
    }

    async fn count_admins(&self) -> Result<u64> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .values()
            .filter(|u| u.role == Role::Admin)
            .count() as u64)
    }

    async fn insert_token(&self, user_id: UserId, token_hash: String) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&user_id) {
            return Err(DomainError::not_found("Usuario"));
        }
        inner.tokens.insert(token_hash, user_id);
        Ok(())
    }

    async fn user_by_token_hash(&self, token_hash: &str) -> Result<User> {
        let inner = self.lock()?;
        let user_id = inner
            .tokens
            .get(token_hash)
            .copied()
            .ok_or(DomainError::Unauthenticated)?;
        inner
            .users
            .get(&user_id)
            .cloned()
            .ok_or(DomainError::Unauthenticated)
    }

    async fn delete_tokens(&self, user_id: UserId) -> Result<()> {
        let mut inner = self.lock()?;
        inner.tokens.retain(|_, owner| *owner != user_id);
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn create_purchase(&self, draft: PurchaseDraft) -> Result<(Purchase, Book)> {
        // The whole read-check-insert-decrement sequence runs under one
        // lock acquisition; a concurrent purchase sees either none or all
        // of its effects.
        let mut inner = self.lock()?;

        let libro = inner
            .books
            .get(&draft.libro_id)
            .cloned()
            .ok_or(DomainError::not_found("Libro"))?;

        let nuevo_stock = libro
            .stock
            .reserve(draft.cantidad)
            .map_err(|disponible| DomainError::InsufficientStock { disponible })?;

        let compra = Purchase::new(
            draft.user_id,
            draft.libro_id,
            draft.cantidad,
            libro.precio_cents,
            libro.moneda.clone(),
            draft.metodo_pago,
            PurchaseStatus::Completada,
            now(),
        )?;

        if let Some(stored) = inner.books.get_mut(&draft.libro_id) {
            stored.stock = nuevo_stock;
        }
        inner.purchases.insert(compra.id, compra.clone());
        Ok((compra, libro))
    }

    async fn cancel_purchase(&self, user_id: UserId, id: PurchaseId) -> Result<Purchase> {
        let mut inner = self.lock()?;

        let compra = inner
            .purchases
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned()
            .ok_or(DomainError::not_found("Compra"))?;

        if !compra.can_cancel() {
            return Err(DomainError::InvalidState(
                "Solo se pueden cancelar compras pendientes".to_string(),
            ));
        }

        if let Some(libro) = inner.books.get_mut(&compra.libro_id) {
            libro.stock = libro.stock.restore(compra.cantidad);
        }
        let compra = {
            let stored = inner
                .purchases
                .get_mut(&id)
                .ok_or(DomainError::not_found("Compra"))?;
            stored.estado = PurchaseStatus::Cancelada;
            stored.clone()
        };
        Ok(compra)
    }

    async fn set_status(&self, id: PurchaseId, estado: PurchaseStatus) -> Result<Purchase> {
        let mut inner = self.lock()?;
        let compra = inner
            .purchases
            .get_mut(&id)
            .ok_or(DomainError::not_found("Compra"))?;
        if !compra.admin_can_update() {
            return Err(DomainError::InvalidState(
                "Una compra cancelada no puede cambiar de estado".to_string(),
            ));
        }
        compra.estado = estado;
        Ok(compra.clone())
    }

    async fn get_for_user(&self, user_id: UserId, id: PurchaseId) -> Result<PurchaseRecord> {
        let inner = self.lock()?;
        let compra = inner
            .purchases
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned()
            .ok_or(DomainError::not_found("Compra"))?;
        inner.purchase_record(compra)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        estado: Option<PurchaseStatus>,
        page: PageRequest,
    ) -> Result<Page<PurchaseRecord>> {
        let inner = self.lock()?;
        let mut compras: Vec<Purchase> = inner
            .purchases
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| estado.is_none_or(|e| c.estado == e))
            .cloned()
            .collect();
        compras.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = compras.len() as u64;
        let items = compras
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .map(|compra| inner.purchase_record(compra))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn list_sales(&self) -> Result<Vec<SaleRecord>> {
        let inner = self.lock()?;
        let mut compras: Vec<Purchase> = inner.purchases.values().cloned().collect();
        compras.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(compras
            .into_iter()
            .map(|compra| inner.sale_record(compra))
            .collect())
    }

    async fn get_sale(&self, id: PurchaseId) -> Result<SaleRecord> {
        let inner = self.lock()?;
        let compra = inner
            .purchases
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Compra"))?;
        Ok(inner.sale_record(compra))
    }

    async fn user_statistics(&self, user_id: UserId) -> Result<UserStatistics> {
        let inner = self.lock()?;
        let compras: Vec<&Purchase> = inner
            .purchases
            .values()
            .filter(|c| c.user_id == user_id)
            .collect();

        let total_gastado = compras.iter().map(|c| c.total_cents.0).sum();
        let mut counts: HashMap<BookId, u64> = HashMap::new();
        for compra in &compras {
            *counts.entry(compra.libro_id).or_default() += 1;
        }
        let libro_mas_comprado = counts
            .iter()
            .max_by_key(|(_, n)| **n)
            .and_then(|(libro_id, n)| {
                inner.books.get(libro_id).map(|libro| TopBook {
                    libro_id: *libro_id,
                    titulo: libro.titulo.clone(),
                    autor: libro.autor.clone(),
                    total: *n,
                })
            });

        Ok(UserStatistics {
            total_compras: compras.len() as u64,
            total_gastado_cents: Cents(total_gastado),
            compras_completadas: compras
                .iter()
                .filter(|c| c.estado == PurchaseStatus::Completada)
                .count() as u64,
            compras_pendientes: compras
                .iter()
                .filter(|c| c.estado == PurchaseStatus::Pendiente)
                .count() as u64,
            libro_mas_comprado,
        })
    }

    async fn dashboard(&self) -> Result<DashboardReport> {
        let inner = self.lock()?;
        let hoy = now().date_naive();
        let ventas_hoy = inner
            .purchases
            .values()
            .filter(|c| c.created_at.date_naive() == hoy)
            .map(|c| c.total_cents.0)
            .sum();
        let total_ventas = inner.purchases.values().map(|c| c.total_cents.0).sum();

        let mut compras: Vec<Purchase> = inner.purchases.values().cloned().collect();
        compras.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let ventas = compras
            .into_iter()
            .take(20)
            .map(|compra| inner.sale_record(compra))
            .collect();

        Ok(DashboardReport {
            ventas_hoy_cents: Cents(ventas_hoy),
            total_ventas_cents: Cents(total_ventas),
            total_libros: inner.books.len() as u64,
            ventas,
        })
    }
}
