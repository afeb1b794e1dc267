//! Caller identity passed explicitly into every core operation.
//!
//! There is no ambient "current user": the web layer resolves the bearer
//! token once and hands the resulting claims object to the engine. This
//! keeps the services unit-testable without any request framework.

use crate::ids::UserId;
use crate::user::Role;

/// Authenticated caller claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// The authenticated user.
    pub user_id: UserId,
    /// The caller's role.
    pub role: Role,
}

impl Identity {
    /// Build an identity.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// True when the caller holds the administrator role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
