//! Globally unique identities for model objects.
//!
//! Every item, container, join and query carries a UUID that stays stable for
//! the lifetime of the object. Copies only keep an identity when asked to
//! (see [`Container::deep_copy`](super::Container::deep_copy) and
//! [`IdentityMode`](crate::snapshot::IdentityMode)).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh identity.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID (used when loading persisted models).
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Identity of an [`Item`](super::Item).
    ItemId,
    "item"
);
define_id!(
    /// Identity of a [`Container`](super::Container).
    ContainerId,
    "container"
);
define_id!(
    /// Identity of a [`Join`](super::Join).
    JoinId,
    "join"
);
define_id!(
    /// Identity of a [`Query`](crate::query::Query).
    QueryId,
    "query"
);
