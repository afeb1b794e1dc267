//! Route table.

use crate::handlers::{auth, categorias, compras, dashboard, health, libros, ventas};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the full application router.
///
/// Everything lives under `/api`. Public routes need no token; the rest
/// authenticate through the bearer-token extractor, and `/api/admin/*`
/// additionally requires the administrator role, enforced by the engine.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/libros", get(libros::list))
        .route("/libros/:id", get(libros::get))
        .route("/categorias", get(categorias::list))
        .route("/categorias/:id", get(categorias::get));

    let authed = Router::new()
        .route("/user", get(auth::me).put(auth::update_profile))
        .route("/logout", post(auth::logout))
        .route("/compras", post(compras::create).get(compras::list))
        .route("/compras/estadisticas", get(compras::statistics))
        .route("/compras/:id", get(compras::get))
        .route("/compras/:id/cancelar", patch(compras::cancel));

    let admin = Router::new()
        .route("/register", post(auth::register_admin))
        .route("/usuarios", get(auth::list_users))
        .route("/usuarios/:id", delete(auth::delete_user))
        .route("/libros", post(libros::create))
        .route("/libros/:id", put(libros::update).delete(libros::delete))
        .route("/categorias", post(categorias::create))
        .route(
            "/categorias/:id",
            put(categorias::update).delete(categorias::delete),
        )
        .route("/ventas", get(ventas::list))
        .route("/ventas/:id", get(ventas::get))
        .route("/ventas/:id/estado", patch(ventas::update_estado))
        .route("/dashboard", get(dashboard::show));

    Router::new()
        .nest("/api", public.merge(authed).nest("/admin", admin))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
