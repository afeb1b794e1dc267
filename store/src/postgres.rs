//! PostgreSQL store.
//!
//! Uses runtime-bound sqlx queries against the schema in `migrations/`.
//! The purchase create/cancel paths acquire a `SELECT ... FOR UPDATE` lock
//! on the book row inside a transaction, so the stock check and decrement
//! cannot interleave with a concurrent purchase: the second transaction
//! blocks on the row lock and re-reads the committed stock.

use crate::traits::{CatalogStore, IdentityStore, PurchaseStore};
use crate::types::{
    now, BookFilter, BookRecord, BookSortField, BookUpdate, DashboardReport, NewBook, Page,
    PageRequest, PurchaseDraft, PurchaseRecord, SaleRecord, SortOrder, TopBook, UserStatistics,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libreria_core::{
    Book, BookId, Category, CategoryId, Cents, DomainError, PaymentMethod, Purchase, PurchaseId,
    PurchaseStatus, Result, Role, Stock, User, UserId,
};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

/// PostgreSQL implementation of all three store traits.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| DomainError::internal(format!("conexión a la base de datos: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::internal(format!("migración fallida: {e}")))?;
        Ok(())
    }

    async fn categories_of(&self, libro_id: BookId) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r"
            SELECT c.id, c.nombre, c.slug, c.descripcion, c.created_at, c.updated_at
            FROM categorias c
            JOIN categoria_libro cl ON cl.categoria_id = c.id
            WHERE cl.libro_id = $1
            ORDER BY c.nombre
            ",
        )
        .bind(libro_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("cargar categorías del libro", &e))?;
        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }
}

fn db_err(context: &str, e: &sqlx::Error) -> DomainError {
    DomainError::internal(format!("{context}: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

async fn begin(pool: &PgPool) -> Result<Transaction<'_, Postgres>> {
    pool.begin()
        .await
        .map_err(|e| db_err("abrir transacción", &e))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| db_err("confirmar transacción", &e))
}

fn stock_to_db(stock: Stock) -> Result<Option<i32>> {
    match stock.available() {
        None => Ok(None),
        Some(n) => i32::try_from(n)
            .map(Some)
            .map_err(|_| DomainError::internal("stock fuera de rango")),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Row types
// ═══════════════════════════════════════════════════════════════════════

#[derive(FromRow)]
struct BookRow {
    id: Uuid,
    titulo: String,
    autor: Option<String>,
    descripcion: Option<String>,
    precio_cents: i64,
    moneda: String,
    stock: Option<i32>,
    imagen_path: Option<String>,
    contenido_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookRow {
    fn into_book(self) -> Result<Book> {
        let stock = match self.stock {
            None => Stock::Untracked,
            Some(n) => Stock::Tracked(
                u32::try_from(n)
                    .map_err(|_| DomainError::internal("stock negativo en la base de datos"))?,
            ),
        };
        Ok(Book {
            id: BookId::from_uuid(self.id),
            titulo: self.titulo,
            autor: self.autor,
            descripcion: self.descripcion,
            precio_cents: Cents(self.precio_cents),
            moneda: self.moneda,
            stock,
            imagen_path: self.imagen_path,
            contenido_path: self.contenido_path,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    nombre: String,
    slug: String,
    descripcion: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_category(self) -> Category {
        Category {
            id: CategoryId::from_uuid(self.id),
            nombre: self.nombre,
            slug: self.slug,
            descripcion: self.descripcion,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let role: Role = self
            .role
            .parse()
            .map_err(|()| DomainError::internal("rol inválido en la base de datos"))?;
        Ok(User {
            id: UserId::from_uuid(self.id),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            avatar: self.avatar,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: Uuid,
    libro_id: Uuid,
    cantidad: i32,
    precio_unitario_cents: i64,
    total_cents: i64,
    moneda: String,
    metodo_pago: String,
    estado: String,
    created_at: DateTime<Utc>,
}

impl PurchaseRow {
    fn into_purchase(self) -> Result<Purchase> {
        let metodo_pago: PaymentMethod = self
            .metodo_pago
            .parse()
            .map_err(|()| DomainError::internal("método de pago inválido en la base de datos"))?;
        let estado: PurchaseStatus = self
            .estado
            .parse()
            .map_err(|()| DomainError::internal("estado inválido en la base de datos"))?;
        Ok(Purchase {
            id: PurchaseId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            libro_id: BookId::from_uuid(self.libro_id),
            cantidad: u32::try_from(self.cantidad)
                .map_err(|_| DomainError::internal("cantidad negativa en la base de datos"))?,
            precio_unitario_cents: Cents(self.precio_unitario_cents),
            total_cents: Cents(self.total_cents),
            moneda: self.moneda,
            metodo_pago,
            estado,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SaleRow {
    #[sqlx(flatten)]
    compra: PurchaseRow,
    user_name: Option<String>,
    user_email: Option<String>,
    libro_titulo: Option<String>,
    libro_autor: Option<String>,
    libro_imagen_path: Option<String>,
}

impl SaleRow {
    fn into_sale(self) -> Result<SaleRecord> {
        Ok(SaleRecord {
            compra: self.compra.into_purchase()?,
            user_name: self
                .user_name
                .unwrap_or_else(|| "Usuario no disponible".to_string()),
            user_email: self.user_email.unwrap_or_else(|| "N/A".to_string()),
            libro_titulo: self
                .libro_titulo
                .unwrap_or_else(|| "Libro no disponible".to_string()),
            libro_autor: self.libro_autor,
            libro_imagen_url: self.libro_imagen_path.map(|p| format!("/storage/{p}")),
        })
    }
}

const SALE_QUERY: &str = r"
    SELECT c.id, c.user_id, c.libro_id, c.cantidad, c.precio_unitario_cents,
           c.total_cents, c.moneda, c.metodo_pago, c.estado, c.created_at,
           u.name AS user_name, u.email AS user_email,
           l.titulo AS libro_titulo, l.autor AS libro_autor,
           l.imagen_path AS libro_imagen_path
    FROM compras c
    LEFT JOIN users u ON u.id = c.user_id
    LEFT JOIN libros l ON l.id = c.libro_id
";

async fn sync_categories(
    tx: &mut Transaction<'_, Postgres>,
    libro_id: BookId,
    categorias: &[CategoryId],
) -> Result<()> {
    sqlx::query("DELETE FROM categoria_libro WHERE libro_id = $1")
        .bind(libro_id.0)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("limpiar categorías del libro", &e))?;

    for categoria_id in categorias {
        sqlx::query("INSERT INTO categoria_libro (libro_id, categoria_id) VALUES ($1, $2)")
            .bind(libro_id.0)
            .bind(categoria_id.0)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DomainError::not_found("Categoría")
                } else {
                    db_err("asociar categoría", &e)
                }
            })?;
    }
    Ok(())
}

async fn book_for_update(
    tx: &mut Transaction<'_, Postgres>,
    libro_id: BookId,
) -> Result<Book> {
    let row: Option<BookRow> = sqlx::query_as(
        r"
        SELECT id, titulo, autor, descripcion, precio_cents, moneda, stock,
               imagen_path, contenido_path, created_at, updated_at
        FROM libros
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(libro_id.0)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_err("bloquear libro", &e))?;
    row.ok_or(DomainError::not_found("Libro"))?.into_book()
}

async fn write_stock(
    tx: &mut Transaction<'_, Postgres>,
    libro_id: BookId,
    stock: Stock,
) -> Result<()> {
    sqlx::query("UPDATE libros SET stock = $2, updated_at = $3 WHERE id = $1")
        .bind(libro_id.0)
        .bind(stock_to_db(stock)?)
        .bind(now())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("actualizar stock", &e))?;
    Ok(())
}

async fn insert_purchase(tx: &mut Transaction<'_, Postgres>, compra: &Purchase) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO compras
            (id, user_id, libro_id, cantidad, precio_unitario_cents,
             total_cents, moneda, metodo_pago, estado, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(compra.id.0)
    .bind(compra.user_id.0)
    .bind(compra.libro_id.0)
    .bind(i32::try_from(compra.cantidad).map_err(|_| DomainError::internal("cantidad fuera de rango"))?)
    .bind(compra.precio_unitario_cents.0)
    .bind(compra.total_cents.0)
    .bind(&compra.moneda)
    .bind(compra.metodo_pago.as_str())
    .bind(compra.estado.as_str())
    .bind(compra.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| db_err("insertar compra", &e))?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// CatalogStore
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_book(&self, draft: NewBook) -> Result<BookRecord> {
        let mut tx = begin(&self.pool).await?;
        let id = BookId::new();
        let ts = now();

        sqlx::query(
            r"
            INSERT INTO libros
                (id, titulo, autor, descripcion, precio_cents, moneda, stock,
                 imagen_path, contenido_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ",
        )
        .bind(id.0)
        .bind(&draft.titulo)
        .bind(&draft.autor)
        .bind(&draft.descripcion)
        .bind(draft.precio_cents.0)
        .bind(&draft.moneda)
        .bind(stock_to_db(draft.stock)?)
        .bind(&draft.imagen_path)
        .bind(&draft.contenido_path)
        .bind(ts)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("insertar libro", &e))?;

        sync_categories(&mut tx, id, &draft.categorias).await?;
        commit(tx).await?;
        self.get_book(id).await
    }

    async fn update_book(&self, id: BookId, update: BookUpdate) -> Result<BookRecord> {
        let mut tx = begin(&self.pool).await?;
        let current = book_for_update(&mut tx, id).await?;

        sqlx::query(
            r"
            UPDATE libros
            SET titulo = $2, autor = $3, descripcion = $4, precio_cents = $5,
                imagen_path = $6, contenido_path = $7, updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .bind(&update.titulo)
        .bind(&update.autor)
        .bind(&update.descripcion)
        .bind(update.precio_cents.0)
        .bind(update.imagen_path.as_ref().or(current.imagen_path.as_ref()))
        .bind(
            update
                .contenido_path
                .as_ref()
                .or(current.contenido_path.as_ref()),
        )
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_err("actualizar libro", &e))?;

        sync_categories(&mut tx, id, &update.categorias).await?;
        commit(tx).await?;
        self.get_book(id).await
    }

    async fn delete_book(&self, id: BookId) -> Result<Book> {
        let mut tx = begin(&self.pool).await?;
        let libro = book_for_update(&mut tx, id).await?;

        // Join rows first; the FK carries no cascade.
        sqlx::query("DELETE FROM categoria_libro WHERE libro_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar asociaciones del libro", &e))?;
        sqlx::query("DELETE FROM libros WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar libro", &e))?;

        commit(tx).await?;
        Ok(libro)
    }

    async fn get_book(&self, id: BookId) -> Result<BookRecord> {
        let row: Option<BookRow> = sqlx::query_as(
            r"
            SELECT id, titulo, autor, descripcion, precio_cents, moneda, stock,
                   imagen_path, contenido_path, created_at, updated_at
            FROM libros
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("cargar libro", &e))?;
        let libro = row.ok_or(DomainError::not_found("Libro"))?.into_book()?;
        let categorias = self.categories_of(id).await?;
        Ok(BookRecord { libro, categorias })
    }

    async fn list_books(&self, filter: BookFilter, page: PageRequest) -> Result<Page<BookRecord>> {
        // NULL binds disable their clause, so one statement covers every
        // filter combination. The ORDER BY column comes from the enum, never
        // from request text.
        const MATCHING: &str = r"
            FROM libros
            WHERE ($1::bigint IS NULL OR precio_cents >= $1)
              AND ($2::bigint IS NULL OR precio_cents <= $2)
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1
                    FROM categoria_libro cl
                    JOIN categorias c ON c.id = cl.categoria_id
                    WHERE cl.libro_id = libros.id AND c.slug = $3))
              AND ($4::text IS NULL
                   OR titulo ILIKE '%' || $4 || '%'
                   OR autor ILIKE '%' || $4 || '%')
        ";
        let min = filter.min_cents.map(|c| c.0);
        let max = filter.max_cents.map(|c| c.0);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {MATCHING}"))
            .bind(min)
            .bind(max)
            .bind(&filter.categoria_slug)
            .bind(&filter.search)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("contar libros", &e))?;

        let column = match filter.sort_by {
            BookSortField::CreatedAt => "created_at",
            BookSortField::Precio => "precio_cents",
            BookSortField::Titulo => "titulo",
        };
        let direction = match filter.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            r"
            SELECT id, titulo, autor, descripcion, precio_cents, moneda, stock,
                   imagen_path, contenido_path, created_at, updated_at
            {MATCHING}
            ORDER BY {column} {direction}
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(min)
        .bind(max)
        .bind(&filter.categoria_slug)
        .bind(&filter.search)
        .bind(i64::from(page.per_page))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("listar libros", &e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let libro = row.into_book()?;
            let categorias = self.categories_of(libro.id).await?;
            items.push(BookRecord { libro, categorias });
        }
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn create_category(&self, category: Category) -> Result<Category> {
        sqlx::query(
            r"
            INSERT INTO categorias (id, nombre, slug, descripcion, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(category.id.0)
        .bind(&category.nombre)
        .bind(&category.slug)
        .bind(&category.descripcion)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::field("nombre", "El nombre de la categoría ya existe")
            } else {
                db_err("insertar categoría", &e)
            }
        })?;
        Ok(category)
    }

    async fn update_category(&self, category: Category) -> Result<Category> {
        let result = sqlx::query(
            r"
            UPDATE categorias
            SET nombre = $2, slug = $3, descripcion = $4, updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(category.id.0)
        .bind(&category.nombre)
        .bind(&category.slug)
        .bind(&category.descripcion)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::field("nombre", "El nombre de la categoría ya existe")
            } else {
                db_err("actualizar categoría", &e)
            }
        })?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Categoría"));
        }
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut tx = begin(&self.pool).await?;
        sqlx::query("DELETE FROM categoria_libro WHERE categoria_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar asociaciones de la categoría", &e))?;
        let result = sqlx::query("DELETE FROM categorias WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar categoría", &e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Categoría"));
        }
        commit(tx).await
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, nombre, slug, descripcion, created_at, updated_at FROM categorias WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("cargar categoría", &e))?;
        Ok(row
            .ok_or(DomainError::not_found("Categoría"))?
            .into_category())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, nombre, slug, descripcion, created_at, updated_at FROM categorias ORDER BY nombre",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("listar categorías", &e))?;
        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// IdentityStore
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn create_user(&self, user: User) -> Result<User> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, password_hash, role, avatar, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::field("email", "Este email ya está registrado")
            } else {
                db_err("insertar usuario", &e)
            }
        })?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, role, avatar, created_at FROM users WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("cargar usuario", &e))?;
        row.ok_or(DomainError::not_found("Usuario"))?.into_user()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, role, avatar, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("cargar usuario", &e))?;
        row.ok_or(DomainError::not_found("Usuario"))?.into_user()
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, avatar = $5
            WHERE id = $1
            ",
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::field("email", "Este email ya está registrado")
            } else {
                db_err("actualizar usuario", &e)
            }
        })?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Usuario"));
        }
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, role, avatar, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("listar usuarios", &e))?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn delete_user(&self, id: UserId) -> Result<User> {
        let user = self.get_user(id).await?;
        let mut tx = begin(&self.pool).await?;
        sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar tokens", &e))?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("eliminar usuario", &e))?;
        commit(tx).await?;
        Ok(user)
    }

    async fn count_admins(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("contar administradores", &e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_token(&self, user_id: UserId, token_hash: String) -> Result<()> {
        sqlx::query("INSERT INTO tokens (token_hash, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(&token_hash)
            .bind(user_id.0)
            .bind(now())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("insertar token", &e))?;
        Ok(())
    }

    async fn user_by_token_hash(&self, token_hash: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT u.id, u.name, u.email, u.password_hash, u.role, u.avatar, u.created_at
            FROM users u
            JOIN tokens t ON t.user_id = u.id
            WHERE t.token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("resolver token", &e))?;
        row.ok_or(DomainError::Unauthenticated)?.into_user()
    }

    async fn delete_tokens(&self, user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("eliminar tokens", &e))?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PurchaseStore
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
impl PurchaseStore for PostgresStore {
    async fn create_purchase(&self, draft: PurchaseDraft) -> Result<(Purchase, Book)> {
        let mut tx = begin(&self.pool).await?;

        // Row lock: a concurrent purchase of the same book blocks here and
        // re-reads the committed stock once we finish.
        let libro = book_for_update(&mut tx, draft.libro_id).await?;

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

        insert_purchase(&mut tx, &compra).await?;
        if nuevo_stock != libro.stock {
            write_stock(&mut tx, libro.id, nuevo_stock).await?;
        }
        commit(tx).await?;
        Ok((compra, libro))
    }

    async fn cancel_purchase(&self, user_id: UserId, id: PurchaseId) -> Result<Purchase> {
        let mut tx = begin(&self.pool).await?;

        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, user_id, libro_id, cantidad, precio_unitario_cents,
                   total_cents, moneda, metodo_pago, estado, created_at
            FROM compras
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            ",
        )
        .bind(id.0)
        .bind(user_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_err("bloquear compra", &e))?;
        let mut compra = row.ok_or(DomainError::not_found("Compra"))?.into_purchase()?;

        if !compra.can_cancel() {
            return Err(DomainError::InvalidState(
                "Solo se pueden cancelar compras pendientes".to_string(),
            ));
        }

        let libro = book_for_update(&mut tx, compra.libro_id).await?;
        let restaurado = libro.stock.restore(compra.cantidad);
        if restaurado != libro.stock {
            write_stock(&mut tx, libro.id, restaurado).await?;
        }

        sqlx::query("UPDATE compras SET estado = 'cancelada' WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("cancelar compra", &e))?;
        commit(tx).await?;

        compra.estado = PurchaseStatus::Cancelada;
        Ok(compra)
    }

    async fn set_status(&self, id: PurchaseId, estado: PurchaseStatus) -> Result<Purchase> {
        let mut tx = begin(&self.pool).await?;

        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, user_id, libro_id, cantidad, precio_unitario_cents,
                   total_cents, moneda, metodo_pago, estado, created_at
            FROM compras
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_err("bloquear compra", &e))?;
        let mut compra = row.ok_or(DomainError::not_found("Compra"))?.into_purchase()?;

        if !compra.admin_can_update() {
            return Err(DomainError::InvalidState(
                "Una compra cancelada no puede cambiar de estado".to_string(),
            ));
        }

        sqlx::query("UPDATE compras SET estado = $2 WHERE id = $1")
            .bind(id.0)
            .bind(estado.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("actualizar estado", &e))?;
        commit(tx).await?;

        compra.estado = estado;
        Ok(compra)
    }

    async fn get_for_user(&self, user_id: UserId, id: PurchaseId) -> Result<PurchaseRecord> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, user_id, libro_id, cantidad, precio_unitario_cents,
                   total_cents, moneda, metodo_pago, estado, created_at
            FROM compras
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id.0)
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("cargar compra", &e))?;
        let compra = row.ok_or(DomainError::not_found("Compra"))?.into_purchase()?;

        let record = self.get_book(compra.libro_id).await?;
        Ok(PurchaseRecord {
            compra,
            libro: record.libro,
            categorias: record.categorias,
        })
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        estado: Option<PurchaseStatus>,
        page: PageRequest,
    ) -> Result<Page<PurchaseRecord>> {
        let estado_str = estado.map(PurchaseStatus::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM compras WHERE user_id = $1 AND ($2::text IS NULL OR estado = $2)",
        )
        .bind(user_id.0)
        .bind(estado_str)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("contar compras", &e))?;

        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, user_id, libro_id, cantidad, precio_unitario_cents,
                   total_cents, moneda, metodo_pago, estado, created_at
            FROM compras
            WHERE user_id = $1 AND ($2::text IS NULL OR estado = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(user_id.0)
        .bind(estado_str)
        .bind(i64::from(page.per_page))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("listar compras", &e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let compra = row.into_purchase()?;
            let record = self.get_book(compra.libro_id).await?;
            items.push(PurchaseRecord {
                compra,
                libro: record.libro,
                categorias: record.categorias,
            });
        }
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn list_sales(&self) -> Result<Vec<SaleRecord>> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!("{SALE_QUERY} ORDER BY c.created_at DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("listar ventas", &e))?;
        rows.into_iter().map(SaleRow::into_sale).collect()
    }

    async fn get_sale(&self, id: PurchaseId) -> Result<SaleRecord> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SALE_QUERY} WHERE c.id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("cargar venta", &e))?;
        row.ok_or(DomainError::not_found("Compra"))?.into_sale()
    }

    async fn user_statistics(&self, user_id: UserId) -> Result<UserStatistics> {
        let (total, gastado, completadas, pendientes): (i64, i64, i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COALESCE(SUM(total_cents), 0),
                   COUNT(*) FILTER (WHERE estado = 'completada'),
                   COUNT(*) FILTER (WHERE estado = 'pendiente')
            FROM compras
            WHERE user_id = $1
            ",
        )
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("calcular estadísticas", &e))?;

        let top: Option<(Uuid, String, Option<String>, i64)> = sqlx::query_as(
            r"
            SELECT c.libro_id, l.titulo, l.autor, COUNT(*) AS total
            FROM compras c
            JOIN libros l ON l.id = c.libro_id
            WHERE c.user_id = $1
            GROUP BY c.libro_id, l.titulo, l.autor
            ORDER BY total DESC
            LIMIT 1
            ",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("calcular libro más comprado", &e))?;

        Ok(UserStatistics {
            total_compras: u64::try_from(total).unwrap_or(0),
            total_gastado_cents: Cents(gastado),
            compras_completadas: u64::try_from(completadas).unwrap_or(0),
            compras_pendientes: u64::try_from(pendientes).unwrap_or(0),
            libro_mas_comprado: top.map(|(libro_id, titulo, autor, n)| TopBook {
                libro_id: BookId::from_uuid(libro_id),
                titulo,
                autor,
                total: u64::try_from(n).unwrap_or(0),
            }),
        })
    }

    async fn dashboard(&self) -> Result<DashboardReport> {
        let (hoy, total): (i64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_cents) FILTER (WHERE created_at::date = CURRENT_DATE), 0),
                   COALESCE(SUM(total_cents), 0)
            FROM compras
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("calcular ventas", &e))?;

        let total_libros: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM libros")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("contar libros", &e))?;

        let rows: Vec<SaleRow> =
            sqlx::query_as(&format!("{SALE_QUERY} ORDER BY c.created_at DESC LIMIT 20"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_err("listar últimas ventas", &e))?;

        Ok(DashboardReport {
            ventas_hoy_cents: Cents(hoy),
            total_ventas_cents: Cents(total),
            total_libros: u64::try_from(total_libros).unwrap_or(0),
            ventas: rows
                .into_iter()
                .map(SaleRow::into_sale)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}
