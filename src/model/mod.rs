//! The query model: items, containers and joins.

pub mod container;
pub mod ids;
pub mod item;
pub mod join;

pub use container::{Container, ContainerKind, BUILTIN_CONSTANTS, CONSTANTS_CONTAINER_NAME};
pub use ids::{ContainerId, ItemId, JoinId, QueryId};
pub use item::{GroupFunction, Item, ItemKind, SortOrder};
pub use join::{Comparator, Join, JoinEnd, JoinKind, JoinSide};
