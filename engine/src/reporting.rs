//! Read-only aggregates: the admin dashboard, the sales ledger, and
//! per-user purchase statistics.

use crate::ensure_admin;
use libreria_core::{Identity, PurchaseId, Result, UserId};
use libreria_store::{DashboardReport, PurchaseStore, SaleRecord, UserStatistics};
use std::sync::Arc;

/// Reporting reads over a [`PurchaseStore`].
#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn PurchaseStore>,
}

impl ReportingService {
    /// Build the service over a store backend.
    pub fn new(store: Arc<dyn PurchaseStore>) -> Self {
        Self { store }
    }

    /// Dashboard aggregates. Administrators only.
    pub async fn dashboard(&self, who: &Identity) -> Result<DashboardReport> {
        ensure_admin(who)?;
        self.store.dashboard().await
    }

    /// Every sale with buyer and book info, newest first. Administrators
    /// only.
    pub async fn list_sales(&self, who: &Identity) -> Result<Vec<SaleRecord>> {
        ensure_admin(who)?;
        self.store.list_sales().await
    }

    /// One sale with buyer and book info. Administrators only.
    pub async fn get_sale(&self, who: &Identity, id: PurchaseId) -> Result<SaleRecord> {
        ensure_admin(who)?;
        self.store.get_sale(id).await
    }

    /// A user's own purchase statistics.
    pub async fn user_statistics(&self, who: &Identity) -> Result<UserStatistics> {
        self.statistics_for(who.user_id).await
    }

    async fn statistics_for(&self, user_id: UserId) -> Result<UserStatistics> {
        self.store.user_statistics(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::purchase::{PurchaseEngine, PurchaseInput};
    use libreria_core::{Cents, DomainError, EstadoPago, Role, Stock};
    use libreria_store::{CatalogStore, MemoryStore, NewBook};

    async fn seed_book(store: &MemoryStore, titulo: &str, precio: Cents) -> libreria_core::BookId {
        store
            .create_book(NewBook {
                titulo: titulo.to_string(),
                autor: None,
                descripcion: None,
                precio_cents: precio,
                moneda: "COP".to_string(),
                stock: Stock::Tracked(50),
                imagen_path: None,
                contenido_path: None,
                categorias: Vec::new(),
            })
            .await
            .expect("seed book")
            .libro
            .id
    }

    fn admin() -> Identity {
        Identity::new(UserId::new(), Role::Admin)
    }

    fn user() -> Identity {
        Identity::new(UserId::new(), Role::User)
    }

    async fn buy(engine: &PurchaseEngine, who: &Identity, libro_id: libreria_core::BookId, n: i64) {
        engine
            .purchase(
                who,
                PurchaseInput {
                    libro_id,
                    cantidad: Some(n),
                    metodo_pago: None,
                },
            )
            .await
            .expect("purchase succeeds");
    }

    #[tokio::test]
    async fn dashboard_is_admin_only() {
        let svc = ReportingService::new(Arc::new(MemoryStore::new()));
        let err = svc.dashboard(&user()).await.expect_err("non-admin rejected");
        assert!(matches!(err, DomainError::Forbidden { .. }));
        svc.dashboard(&admin()).await.expect("admin allowed");
    }

    #[tokio::test]
    async fn dashboard_totals_and_latest_sales() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, "El Aleph", Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let svc = ReportingService::new(Arc::new(store));
        let who = user();

        buy(&engine, &who, libro_id, 2).await;
        buy(&engine, &who, libro_id, 3).await;

        let report = svc.dashboard(&admin()).await.expect("dashboard");
        assert_eq!(report.total_ventas_cents, Cents(5000));
        assert_eq!(report.ventas_hoy_cents, Cents(5000));
        assert_eq!(report.total_libros, 1);
        assert_eq!(report.ventas.len(), 2);
    }

    #[tokio::test]
    async fn dashboard_caps_latest_sales_at_twenty() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, "El Aleph", Cents(100)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let svc = ReportingService::new(Arc::new(store));
        let who = user();

        for _ in 0..25 {
            buy(&engine, &who, libro_id, 1).await;
        }

        let report = svc.dashboard(&admin()).await.expect("dashboard");
        assert_eq!(report.ventas.len(), 20);
        assert_eq!(report.total_ventas_cents, Cents(2500));
    }

    #[tokio::test]
    async fn user_statistics_count_by_status_and_pick_top_book() {
        let store = MemoryStore::new();
        let aleph = seed_book(&store, "El Aleph", Cents(1000)).await;
        let ficciones = seed_book(&store, "Ficciones", Cents(2000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let svc = ReportingService::new(Arc::new(store));
        let who = user();
        let boss = admin();

        buy(&engine, &who, aleph, 1).await;
        buy(&engine, &who, aleph, 1).await;
        buy(&engine, &who, ficciones, 1).await;

        // Push one purchase back to pending.
        let page = engine
            .list_own(&who, None, libreria_store::PageRequest::default())
            .await
            .expect("listing works");
        engine
            .update_status(&boss, page.items[0].compra.id, EstadoPago::Pendiente)
            .await
            .expect("status update");

        let stats = svc.user_statistics(&who).await.expect("statistics");
        assert_eq!(stats.total_compras, 3);
        assert_eq!(stats.compras_completadas, 2);
        assert_eq!(stats.compras_pendientes, 1);
        assert_eq!(stats.total_gastado_cents, Cents(4000));
        let top = stats.libro_mas_comprado.expect("has a top book");
        assert_eq!(top.libro_id, aleph);
        assert_eq!(top.total, 2);
    }

    #[tokio::test]
    async fn statistics_for_a_fresh_user_are_empty() {
        let svc = ReportingService::new(Arc::new(MemoryStore::new()));
        let stats = svc.user_statistics(&user()).await.expect("statistics");
        assert_eq!(stats.total_compras, 0);
        assert_eq!(stats.total_gastado_cents, Cents::ZERO);
        assert!(stats.libro_mas_comprado.is_none());
    }

    #[tokio::test]
    async fn sales_ledger_is_admin_only_and_joins_buyer_info() {
        let store = MemoryStore::new();
        let libro_id = seed_book(&store, "El Aleph", Cents(1000)).await;
        let engine = PurchaseEngine::new(Arc::new(store.clone()));
        let svc = ReportingService::new(Arc::new(store));
        let who = user();

        buy(&engine, &who, libro_id, 1).await;

        let err = svc.list_sales(&who).await.expect_err("non-admin rejected");
        assert!(matches!(err, DomainError::Forbidden { .. }));

        let sales = svc.list_sales(&admin()).await.expect("ledger");
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].libro_titulo, "El Aleph");
        // The buyer was never registered through the identity service, so
        // the join falls back to the placeholder.
        assert_eq!(sales[0].user_name, "Usuario no disponible");

        let sale = svc
            .get_sale(&admin(), sales[0].compra.id)
            .await
            .expect("single sale");
        assert_eq!(sale.compra.id, sales[0].compra.id);
    }
}
