//! Server entry point.
//!
//! Runs against Postgres when `DATABASE_URL` is set (migrations applied on
//! boot) and against the in-memory store otherwise.

use libreria_engine::RegisterInput;
use libreria_store::PostgresStore;
use libreria_web::{build_router, AppState, WebConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = WebConfig::from_env();

    let state = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("Base de datos conectada");
            AppState::new(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL no definida, usando almacenamiento en memoria");
            AppState::in_memory()
        }
    };

    if let Some(bootstrap) = config.admin_bootstrap.clone() {
        let created = state
            .identity
            .bootstrap_admin(RegisterInput {
                name: bootstrap.name,
                email: bootstrap.email,
                password: bootstrap.password,
            })
            .await?;
        match created {
            Some(user) => tracing::info!(email = %user.email, "Administrador inicial creado"),
            None => tracing::debug!("Ya existe un administrador, bootstrap omitido"),
        }
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Servidor escuchando");
    axum::serve(listener, app).await?;
    Ok(())
}
