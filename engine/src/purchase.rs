//! The purchase lifecycle: create, cancel, status administration, reads.

use crate::ensure_admin;
use chrono::{DateTime, Utc};
use libreria_core::{
    validate_cantidad, validate_metodo_pago, Book, BookId, Cents, DomainError, EstadoPago,
    Identity, PaymentMethod, Purchase, PurchaseId, PurchaseStatus, Result,
};
use libreria_store::{Page, PageRequest, PurchaseDraft, PurchaseRecord, PurchaseStore};
use serde::Serialize;
use std::sync::Arc;

/// Raw purchase request as it arrives from the caller.
///
/// `cantidad` and `metodo_pago` are optional on the wire and default to 1
/// and `no_especificado` respectively.
#[derive(Debug, Clone)]
pub struct PurchaseInput {
    /// Book to purchase.
    pub libro_id: BookId,
    /// Requested quantity, unvalidated.
    pub cantidad: Option<i64>,
    /// Declared payment method, unvalidated.
    pub metodo_pago: Option<String>,
}

/// Book snapshot embedded in a purchase receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptBook {
    /// Book identifier.
    pub id: BookId,
    /// Title.
    pub titulo: String,
    /// Author.
    pub autor: Option<String>,
    /// Cover URL, when stored.
    pub imagen_url: Option<String>,
    /// Unit price charged, in cents.
    pub precio_cents: Cents,
}

/// What the buyer gets back from a successful purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    /// Purchase identifier.
    pub id: PurchaseId,
    /// Units purchased.
    pub cantidad: u32,
    /// Total charged, in cents.
    pub total_cents: Cents,
    /// Currency code.
    pub moneda: String,
    /// Declared payment method.
    pub metodo_pago: PaymentMethod,
    /// Purchase state.
    pub estado: PurchaseStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The purchased book as it was at purchase time.
    pub libro: ReceiptBook,
}

impl Receipt {
    fn new(compra: &Purchase, libro: &Book) -> Self {
        Self {
            id: compra.id,
            cantidad: compra.cantidad,
            total_cents: compra.total_cents,
            moneda: compra.moneda.clone(),
            metodo_pago: compra.metodo_pago,
            estado: compra.estado,
            created_at: compra.created_at,
            libro: ReceiptBook {
                id: libro.id,
                titulo: libro.titulo.clone(),
                autor: libro.autor.clone(),
                imagen_url: libro.imagen_url(),
                precio_cents: compra.precio_unitario_cents,
            },
        }
    }
}

/// Orchestrates the purchase lifecycle on top of a [`PurchaseStore`].
#[derive(Clone)]
pub struct PurchaseEngine {
    store: Arc<dyn PurchaseStore>,
}

impl PurchaseEngine {
    /// Build the engine over a store backend.
    pub fn new(store: Arc<dyn PurchaseStore>) -> Self {
        Self { store }
    }

    /// Record a purchase for the caller.
    ///
    /// Validation failures are aggregated: a request with a bad quantity
    /// and a bad payment method reports both fields at once. The atomic
    /// stock-check / price-snapshot / insert sequence is the store's
    /// contract; the audit event fires only after it commits.
    pub async fn purchase(&self, who: &Identity, input: PurchaseInput) -> Result<Receipt> {
        let mut errors = Vec::new();
        let cantidad = validate_cantidad(input.cantidad).unwrap_or_else(|e| {
            errors.push(e);
            0
        });
        let metodo_pago = validate_metodo_pago(input.metodo_pago.as_deref()).unwrap_or_else(|e| {
            errors.push(e);
            PaymentMethod::NoEspecificado
        });
        if !errors.is_empty() {
            return Err(DomainError::InvalidInput { errors });
        }

        let draft = PurchaseDraft {
            user_id: who.user_id,
            libro_id: input.libro_id,
            cantidad,
            metodo_pago,
        };
        let (compra, libro) = self.store.create_purchase(draft).await?;

        tracing::info!(
            compra_id = %compra.id,
            user_id = %compra.user_id,
            libro_id = %compra.libro_id,
            cantidad = compra.cantidad,
            total_cents = compra.total_cents.0,
            "Nueva compra registrada"
        );

        Ok(Receipt::new(&compra, &libro))
    }

    /// Cancel one of the caller's pending purchases, restoring stock.
    pub async fn cancel(&self, who: &Identity, id: PurchaseId) -> Result<Purchase> {
        let compra = self.store.cancel_purchase(who.user_id, id).await?;
        tracing::info!(
            compra_id = %compra.id,
            user_id = %compra.user_id,
            "Compra cancelada"
        );
        Ok(compra)
    }

    /// Assign a payment state to a purchase. Administrators only.
    pub async fn update_status(
        &self,
        who: &Identity,
        id: PurchaseId,
        estado: EstadoPago,
    ) -> Result<Purchase> {
        ensure_admin(who)?;
        let compra = self.store.set_status(id, estado.into_status()).await?;
        tracing::info!(
            compra_id = %compra.id,
            estado = %compra.estado,
            "Estado de compra actualizado"
        );
        Ok(compra)
    }

    /// Fetch one of the caller's purchases.
    pub async fn get_own(&self, who: &Identity, id: PurchaseId) -> Result<PurchaseRecord> {
        self.store.get_for_user(who.user_id, id).await
    }

    /// List the caller's purchases, optionally filtered by status.
    pub async fn list_own(
        &self,
        who: &Identity,
        estado: Option<PurchaseStatus>,
        page: PageRequest,
    ) -> Result<Page<PurchaseRecord>> {
        self.store.list_for_user(who.user_id, estado, page).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use libreria_core::{Role, Stock, UserId};
    use libreria_store::{CatalogStore, MemoryStore, NewBook};

    async fn seed_book(store: &MemoryStore, stock: Stock, precio: Cents) -> BookId {
        store
            .create_book(NewBook {
                titulo: "Cien años de soledad".to_string(),
                autor: Some("Gabriel García Márquez".to_string()),
                descripcion: None,
                precio_cents: precio,
                moneda: "COP".to_string(),
                stock,
                imagen_path: None,
                contenido_path: None,
                categorias: Vec::new(),
            })
            .await
            .expect("seed book")
            .libro
            .id
    }

    fn buyer() -> Identity {
        Identity::new(UserId::new(), Role::User)
    }

    #[tokio::test]
    async fn purchase_snapshots_price_and_computes_total() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1999)).await;
        let engine = PurchaseEngine::new(Arc::new(store));

        let receipt = engine
            .purchase(
                &buyer(),
                PurchaseInput {
                    libro_id,
                    cantidad: Some(3),
                    metodo_pago: Some("tarjeta".to_string()),
                },
            )
            .await
            .expect("purchase succeeds");

        assert_eq!(receipt.total_cents, Cents(5997));
        assert_eq!(receipt.libro.precio_cents, Cents(1999));
        assert_eq!(receipt.estado, PurchaseStatus::Completada);
    }

    #[tokio::test]
    async fn purchase_decrements_tracked_stock() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));

        engine
            .purchase(
                &buyer(),
                PurchaseInput {
                    libro_id,
                    cantidad: Some(2),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        let record = store.get_book(libro_id).await.expect("book exists");
        assert_eq!(record.libro.stock, Stock::Tracked(3));
    }

    #[tokio::test]
    async fn untracked_stock_never_blocks() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Untracked, Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));

        for _ in 0..3 {
            engine
                .purchase(
                    &buyer(),
                    PurchaseInput {
                        libro_id,
                        cantidad: Some(10),
                        metodo_pago: None,
                    },
                )
                .await
                .expect("untracked purchase succeeds");
        }
    }

    #[tokio::test]
    async fn insufficient_stock_names_remaining_units() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(2), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));

        let err = engine
            .purchase(
                &buyer(),
                PurchaseInput {
                    libro_id,
                    cantidad: Some(5),
                    metodo_pago: None,
                },
            )
            .await
            .expect_err("stock check rejects");

        assert_eq!(err, DomainError::InsufficientStock { disponible: 2 });
    }

    #[tokio::test]
    async fn failed_purchase_writes_nothing() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(1), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let who = buyer();

        engine
            .purchase(
                &who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(2),
                    metodo_pago: None,
                },
            )
            .await
            .expect_err("stock check rejects");

        let record = store.get_book(libro_id).await.expect("book exists");
        assert_eq!(record.libro.stock, Stock::Tracked(1));
        let page = engine
            .list_own(&who, None, PageRequest::default())
            .await
            .expect("listing works");
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn validation_failures_aggregate_both_fields() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));

        let err = engine
            .purchase(
                &buyer(),
                PurchaseInput {
                    libro_id,
                    cantidad: Some(0),
                    metodo_pago: Some("bitcoin".to_string()),
                },
            )
            .await
            .expect_err("validation rejects");

        match err {
            DomainError::InvalidInput { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "cantidad");
                assert_eq!(errors[1].field, "metodo_pago");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn later_price_change_leaves_recorded_total_alone() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1999)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let who = buyer();

        let receipt = engine
            .purchase(
                &who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(1),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        let current = store.get_book(libro_id).await.expect("book exists").libro;
        store
            .update_book(
                libro_id,
                libreria_store::BookUpdate {
                    titulo: current.titulo,
                    autor: current.autor,
                    descripcion: current.descripcion,
                    precio_cents: Cents(9999),
                    imagen_path: None,
                    contenido_path: None,
                    categorias: Vec::new(),
                },
            )
            .await
            .expect("price update succeeds");

        let record = engine.get_own(&who, receipt.id).await.expect("purchase exists");
        assert_eq!(record.compra.precio_unitario_cents, Cents(1999));
        assert_eq!(record.compra.total_cents, Cents(1999));
    }

    #[tokio::test]
    async fn concurrent_purchases_of_last_unit_sell_exactly_one() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(1), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .purchase(
                        &buyer(),
                        PurchaseInput {
                            libro_id,
                            cantidad: Some(1),
                            metodo_pago: None,
                        },
                    )
                    .await
            }));
        }

        let mut ok = 0;
        let mut sold_out = 0;
        for handle in handles {
            match handle.await.expect("task completes") {
                Ok(_) => ok += 1,
                Err(DomainError::InsufficientStock { disponible: 0 }) => sold_out += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(sold_out, 7);

        let record = store.get_book(libro_id).await.expect("book exists");
        assert_eq!(record.libro.stock, Stock::Tracked(0));
    }

    #[tokio::test]
    async fn cancel_restores_stock_once() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let who = buyer();
        let admin = Identity::new(UserId::new(), Role::Admin);

        let receipt = engine
            .purchase(
                &who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(2),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        // Move it back to pending so the owner may cancel.
        engine
            .update_status(&admin, receipt.id, EstadoPago::Pendiente)
            .await
            .expect("status update succeeds");

        let cancelled = engine.cancel(&who, receipt.id).await.expect("cancel succeeds");
        assert_eq!(cancelled.estado, PurchaseStatus::Cancelada);

        let record = store.get_book(libro_id).await.expect("book exists");
        assert_eq!(record.libro.stock, Stock::Tracked(5));

        // A second cancellation is an invalid state, not a second refill.
        let err = engine.cancel(&who, receipt.id).await.expect_err("repeat rejected");
        assert!(matches!(err, DomainError::InvalidState(_)));
        let record = store.get_book(libro_id).await.expect("book exists");
        assert_eq!(record.libro.stock, Stock::Tracked(5));
    }

    #[tokio::test]
    async fn cancel_rejects_non_pending_purchase() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));
        let who = buyer();

        let receipt = engine
            .purchase(
                &who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(1),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        // Purchases auto-confirm, so the fresh one is already completada.
        let err = engine.cancel(&who, receipt.id).await.expect_err("cancel rejected");
        assert_eq!(
            err,
            DomainError::InvalidState("Solo se pueden cancelar compras pendientes".to_string())
        );
    }

    #[tokio::test]
    async fn cancel_is_owner_scoped() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));
        let owner = buyer();
        let stranger = buyer();

        let receipt = engine
            .purchase(
                &owner,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(1),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        let err = engine
            .cancel(&stranger, receipt.id)
            .await
            .expect_err("stranger sees nothing");
        assert_eq!(err, DomainError::not_found("Compra"));
    }

    #[tokio::test]
    async fn status_updates_require_admin_and_respect_cancelada() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(5), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));
        let who = buyer();
        let admin = Identity::new(UserId::new(), Role::Admin);

        let receipt = engine
            .purchase(
                &who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(1),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");

        let err = engine
            .update_status(&who, receipt.id, EstadoPago::Rechazado)
            .await
            .expect_err("non-admin rejected");
        assert!(matches!(err, DomainError::Forbidden { .. }));

        engine
            .update_status(&admin, receipt.id, EstadoPago::Pendiente)
            .await
            .expect("admin may update");
        let cancelled = engine.cancel(&who, receipt.id).await.expect("cancel succeeds");
        assert_eq!(cancelled.estado, PurchaseStatus::Cancelada);

        let err = engine
            .update_status(&admin, receipt.id, EstadoPago::Pagado)
            .await
            .expect_err("cancelada is final");
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn list_own_filters_by_status() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, Stock::Tracked(10), Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store));
        let who = buyer();
        let admin = Identity::new(UserId::new(), Role::Admin);

        for _ in 0..3 {
            engine
                .purchase(
                    &who,
                    PurchaseInput {
                        libro_id,
                        cantidad: Some(1),
                        metodo_pago: None,
                    },
                )
                .await
                .expect("purchase succeeds");
        }
        let page = engine
            .list_own(&who, None, PageRequest::default())
            .await
            .expect("listing works");
        assert_eq!(page.total, 3);

        let first = page.items[0].compra.id;
        engine
            .update_status(&admin, first, EstadoPago::Rechazado)
            .await
            .expect("status update succeeds");

        let rejected = engine
            .list_own(&who, Some(PurchaseStatus::Rechazada), PageRequest::default())
            .await
            .expect("filtered listing works");
        assert_eq!(rejected.total, 1);
        assert_eq!(rejected.items[0].compra.id, first);
    }
}
