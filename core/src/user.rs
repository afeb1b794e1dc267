//! User accounts and roles.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user account. Exactly one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Regular customer account.
    User,
}

impl Role {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

/// A user account.
///
/// The password is stored only as an Argon2id hash; the plain text never
/// leaves the registration/login path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique email address, the login identifier.
    pub email: String,
    /// Argon2id password hash (PHC string).
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Stored avatar asset reference.
    pub avatar: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public URL of the avatar, falling back to the default image.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        self.avatar
            .as_deref()
            .map_or_else(|| "/images/default-avatar.png".to_string(), |p| format!("/storage/{p}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!(Role::Admin.as_str(), "admin");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn avatar_url_falls_back_to_default() {
        let user = User {
            id: UserId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            role: Role::User,
            avatar: None,
            created_at: Utc::now(),
        };
        assert_eq!(user.avatar_url(), "/images/default-avatar.png");

        let with_avatar = User {
            avatar: Some("avatars/ana.png".to_string()),
            ..user
        };
        assert_eq!(with_avatar.avatar_url(), "/storage/avatars/ana.png");
    }
}
