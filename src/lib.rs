//! # Quarry
//!
//! The model-to-SQL compiler behind a visual query builder.
//!
//! ## Architecture
//!
//! Users assemble tables, columns, joins and filters as a graph; quarry keeps
//! that graph consistent and renders it as a single `SELECT` statement.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Model (items, containers, joins)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query aggregate: mutations, compound edits, events]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Query + Join Registry                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [join graph: DFS finish order]
//! ┌─────────────────────────────────────────────────────────┐
//! │           SQL Generator (+ dialect constants)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                     SELECT ... FROM ...
//! ```
//!
//! ## Example
//!
//! ```
//! use quarry::prelude::*;
//!
//! let mut query = Query::new("orders");
//! let mut orders = Container::table("orders").with_alias("o");
//! let id = orders.push_item(Item::column("id"));
//! query.add_table(orders).unwrap();
//! query.select_item(id).unwrap();
//!
//! assert_eq!(query.generate(), "SELECT o.id FROM orders o");
//! ```

pub mod config;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod source;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::dialect;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::model::{
        Comparator, Container, ContainerId, ContainerKind, GroupFunction, Item, ItemId, ItemKind,
        Join, JoinEnd, JoinId, JoinKind, JoinSide, QueryId, SortOrder,
    };
    pub use crate::query::{
        ListenerHandle, PropertyChange, PropertyValue, Query, QueryError, QueryEvent,
        QueryListener, QueryResult,
    };
    pub use crate::snapshot::{IdentityMode, QueryDocument};
    pub use crate::source::{DataSource, MetadataConnection, SourceError, StaticSource};
    pub use crate::sql::SqlGenerator;
}

// Also export at crate root for convenience
pub use query::{Query, QueryError, QueryEvent};
pub use sql::{Dialect, SqlGenerator};
