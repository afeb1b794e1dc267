//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain, together
//! with the wire DTOs they serialize.

pub mod auth;
pub mod categorias;
pub mod compras;
pub mod dashboard;
pub mod health;
pub mod libros;
pub mod ventas;

pub use health::health_check;

use libreria_core::User;
use libreria_store::Page;
use serde::Serialize;

/// A user as it appears on the wire. The password hash never leaves the
/// server.
#[derive(Debug, Serialize)]
pub struct UserDto {
    /// Identifier.
    pub id: libreria_core::UserId,
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Role string (`admin` or `user`).
    pub role: libreria_core::Role,
    /// Avatar URL, with the default fallback applied.
    pub avatar_url: String,
    /// Registration timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            avatar_url: user.avatar_url(),
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Pagination envelope shared by every listing endpoint.
#[derive(Debug, Serialize)]
pub struct PageDto<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Total matching items.
    pub total: u64,
    /// Page number, 1-based.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
}

impl<T> PageDto<T> {
    fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            data: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}
