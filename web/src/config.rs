//! Server configuration.

use std::net::SocketAddr;

/// Configuration for the HTTP server.
///
/// Built either programmatically with the `with_*` methods or from the
/// environment via [`WebConfig::from_env`] (a `.env` file is honored when
/// present).
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address the server binds to.
    pub bind_addr: SocketAddr,
    /// Postgres connection URL. When absent the server runs on the
    /// in-memory store.
    pub database_url: Option<String>,
    /// Credentials for the bootstrap administrator, created at startup
    /// when no administrator exists yet.
    pub admin_bootstrap: Option<AdminBootstrap>,
}

/// Bootstrap administrator credentials.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: None,
            admin_bootstrap: None,
        }
    }
}

impl WebConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the database URL.
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the bootstrap administrator credentials.
    #[must_use]
    pub fn with_admin_bootstrap(mut self, bootstrap: AdminBootstrap) -> Self {
        self.admin_bootstrap = Some(bootstrap);
        self
    }

    /// Read configuration from the environment.
    ///
    /// Recognized variables: `BIND_ADDR`, `DATABASE_URL`, and the bootstrap
    /// administrator trio `ADMIN_EMAIL` + `ADMIN_PASSWORD` (+ optional
    /// `ADMIN_NAME`, defaulting to `Administrador`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.bind_addr = parsed;
            } else {
                tracing::warn!(addr = %addr, "BIND_ADDR inválida, usando la dirección por defecto");
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let (Ok(email), Ok(password)) =
            (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD"))
        {
            config.admin_bootstrap = Some(AdminBootstrap {
                name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrador".to_string()),
                email,
                password,
            });
        }
        config
    }
}
