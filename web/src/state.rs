//! Application state for Axum handlers.

use libreria_engine::{CatalogService, IdentityService, PurchaseEngine, ReportingService};
use libreria_store::{CatalogStore, IdentityStore, MemoryStore, PurchaseStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Holds one instance of each domain service, all backed by the same store.
#[derive(Clone)]
pub struct AppState {
    /// Purchase lifecycle.
    pub purchases: PurchaseEngine,
    /// Catalog administration and reads.
    pub catalog: CatalogService,
    /// Users, sessions, tokens.
    pub identity: IdentityService,
    /// Read-only aggregates.
    pub reporting: ReportingService,
}

impl AppState {
    /// Build the state from one backend implementing all three store
    /// traits.
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore + IdentityStore + PurchaseStore + 'static,
    {
        Self {
            purchases: PurchaseEngine::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            identity: IdentityService::new(store.clone()),
            reporting: ReportingService::new(store),
        }
    }

    /// State backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
