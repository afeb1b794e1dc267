//! Book and category administration.

use crate::ensure_admin;
use libreria_core::{
    Book, BookId, Category, CategoryId, Cents, DomainError, FieldError, Identity, Result, Stock,
    DEFAULT_CURRENCY,
};
use libreria_store::{
    types::now, BookFilter, BookRecord, BookUpdate, CatalogStore, NewBook, Page, PageRequest,
};
use std::sync::Arc;

/// Maximum accepted title length.
const TITULO_MAX: usize = 255;

/// Raw book input as submitted by an administrator.
///
/// `precio` arrives in major currency units and is converted to cents.
/// On update, `imagen_path` and `contenido_path` replace the stored
/// reference when present and keep it when absent; `stock` is honored only
/// at creation, since thereafter only the purchase engine mutates it.
#[derive(Debug, Clone, Default)]
pub struct BookInput {
    /// Title.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// Description.
    pub descripcion: Option<String>,
    /// Unit price in major units (`19.99`).
    pub precio: Option<f64>,
    /// Initial stock count; absent means inventory is not tracked.
    pub stock: Option<i64>,
    /// Stored cover reference.
    pub imagen_path: Option<String>,
    /// Stored content reference.
    pub contenido_path: Option<String>,
    /// Full category set to attach.
    pub categorias: Vec<CategoryId>,
}

/// Raw category input.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    /// Display name.
    pub nombre: String,
    /// Optional description.
    pub descripcion: Option<String>,
}

struct ValidatedBook {
    titulo: String,
    precio_cents: Cents,
    stock: Stock,
}

fn validate_book(input: &BookInput) -> Result<ValidatedBook> {
    let mut errors = Vec::new();

    let titulo = input.titulo.trim().to_string();
    if titulo.is_empty() {
        errors.push(FieldError::new("titulo", "El título es obligatorio"));
    } else if titulo.len() > TITULO_MAX {
        errors.push(FieldError::new("titulo", "El título es demasiado largo"));
    }

    let precio_cents = match input.precio {
        None => {
            errors.push(FieldError::new("precio", "El precio es obligatorio"));
            Cents::ZERO
        }
        Some(p) if p < 0.0 => {
            errors.push(FieldError::new("precio", "El precio no puede ser negativo"));
            Cents::ZERO
        }
        Some(p) => Cents::from_major(p),
    };

    let stock = match input.stock {
        None => Stock::Untracked,
        Some(n) => match u32::try_from(n) {
            Ok(count) => Stock::Tracked(count),
            Err(_) => {
                errors.push(FieldError::new("stock", "El stock no puede ser negativo"));
                Stock::Untracked
            }
        },
    };

    if errors.is_empty() {
        Ok(ValidatedBook {
            titulo,
            precio_cents,
            stock,
        })
    } else {
        Err(DomainError::InvalidInput { errors })
    }
}

/// Catalog administration and public reads over a [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    /// Build the service over a store backend.
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// List books matching the storefront filter. Public.
    ///
    /// The default filter matches everything, newest first.
    pub async fn list_books(
        &self,
        filter: BookFilter,
        page: PageRequest,
    ) -> Result<Page<BookRecord>> {
        self.store.list_books(filter, page).await
    }

    /// Fetch a book with its categories. Public.
    pub async fn get_book(&self, id: BookId) -> Result<BookRecord> {
        self.store.get_book(id).await
    }

    /// Create a book. Administrators only.
    pub async fn create_book(&self, who: &Identity, input: BookInput) -> Result<BookRecord> {
        ensure_admin(who)?;
        let valid = validate_book(&input)?;
        let record = self
            .store
            .create_book(NewBook {
                titulo: valid.titulo,
                autor: input.autor,
                descripcion: input.descripcion,
                precio_cents: valid.precio_cents,
                moneda: DEFAULT_CURRENCY.to_string(),
                stock: valid.stock,
                imagen_path: input.imagen_path,
                contenido_path: input.contenido_path,
                categorias: input.categorias,
            })
            .await?;
        tracing::info!(libro_id = %record.libro.id, titulo = %record.libro.titulo, "Libro creado");
        Ok(record)
    }

    /// Update a book and replace its category set. Administrators only.
    ///
    /// The stock field of the input is ignored here.
    pub async fn update_book(
        &self,
        who: &Identity,
        id: BookId,
        input: BookInput,
    ) -> Result<BookRecord> {
        ensure_admin(who)?;
        let valid = validate_book(&input)?;
        let record = self
            .store
            .update_book(
                id,
                BookUpdate {
                    titulo: valid.titulo,
                    autor: input.autor,
                    descripcion: input.descripcion,
                    precio_cents: valid.precio_cents,
                    imagen_path: input.imagen_path,
                    contenido_path: input.contenido_path,
                    categorias: input.categorias,
                },
            )
            .await?;
        tracing::info!(libro_id = %record.libro.id, "Libro actualizado");
        Ok(record)
    }

    /// Delete a book with its category joins and asset references.
    /// Administrators only.
    pub async fn delete_book(&self, who: &Identity, id: BookId) -> Result<Book> {
        ensure_admin(who)?;
        let libro = self.store.delete_book(id).await?;
        tracing::info!(libro_id = %libro.id, titulo = %libro.titulo, "Libro eliminado");
        Ok(libro)
    }

    /// List all categories ordered by name. Public.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories().await
    }

    /// Fetch a category. Public.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.store.get_category(id).await
    }

    /// Create a category. Administrators only.
    pub async fn create_category(&self, who: &Identity, input: CategoryInput) -> Result<Category> {
        ensure_admin(who)?;
        let category = Category::new(&input.nombre, input.descripcion, now())?;
        let category = self.store.create_category(category).await?;
        tracing::info!(categoria_id = %category.id, nombre = %category.nombre, "Categoría creada");
        Ok(category)
    }

    /// Rename or re-describe a category. Administrators only.
    ///
    /// The slug is regenerated from the new name.
    pub async fn update_category(
        &self,
        who: &Identity,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category> {
        ensure_admin(who)?;
        let mut category = self.store.get_category(id).await?;
        category.rename(&input.nombre, now())?;
        category.descripcion = input.descripcion;
        let category = self.store.update_category(category).await?;
        tracing::info!(categoria_id = %category.id, slug = %category.slug, "Categoría actualizada");
        Ok(category)
    }

    /// Delete a category and detach it from every book. Administrators only.
    pub async fn delete_category(&self, who: &Identity, id: CategoryId) -> Result<()> {
        ensure_admin(who)?;
        self.store.delete_category(id).await?;
        tracing::info!(categoria_id = %id, "Categoría eliminada");
        Ok(())
    }
}
