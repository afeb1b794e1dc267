//! HTTP surface of the Librería bookstore backend.
//!
//! Thin Axum handlers over the domain services in `libreria-engine`:
//! extract and deserialize, call the service, serialize the result. All
//! business rules, including authorization, live below this layer; the
//! handlers only translate between the wire and the domain.
//!
//! # Request flow
//!
//! 1. The bearer-token extractor resolves `Authorization` to a user.
//! 2. The handler builds the service input from path/query/body.
//! 3. The engine runs the use case against the configured store.
//! 4. `AppError` maps domain errors onto HTTP statuses and JSON bodies.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::{AdminBootstrap, WebConfig};
pub use error::AppError;
pub use extractors::{BearerToken, CurrentUser};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
