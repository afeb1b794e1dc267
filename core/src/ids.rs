//! Typed identifiers.
//!
//! Every entity gets its own UUID newtype so that a purchase id can never
//! be passed where a book id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Identifier of a book in the catalog.
    BookId
);
define_id!(
    /// Identifier of a category.
    CategoryId
);
define_id!(
    /// Identifier of a user account.
    UserId
);
define_id!(
    /// Identifier of a purchase.
    PurchaseId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(BookId::new(), BookId::new());
    }

    #[test]
    fn display_matches_inner_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(PurchaseId::from_uuid(uuid).to_string(), uuid.to_string());
    }
}
