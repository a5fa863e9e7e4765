//! Serializable snapshot of a whole query.
//!
//! A [`QueryDocument`] captures every field of the model: containers and
//! their items, joins, the selection and sort lists, and the query-level
//! settings. Listeners and the data source are runtime attachments and are
//! not part of the document.
//!
//! Loading validates references: every join endpoint and every listed item
//! must exist. The selection list is authoritative for each item's
//! `selected` flag.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Container, ItemId, Join, QueryId};
use crate::query::{Query, QueryError, DEFAULT_ROW_LIMIT, DEFAULT_STREAMING_ROW_LIMIT};

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("malformed query document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dangling reference in query document: {0}")]
    DanglingReference(String),

    #[error("invalid query document: {0}")]
    Invalid(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Whether loading keeps the document's identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityMode {
    /// Keep every identifier (normal load).
    #[default]
    Preserve,
    /// Give the query and everything in it fresh identifiers (import/copy).
    Regenerate,
}

fn default_row_limit() -> u64 {
    DEFAULT_ROW_LIMIT
}

fn default_streaming_row_limit() -> u64 {
    DEFAULT_STREAMING_ROW_LIMIT
}

/// Durable form of a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    #[serde(default)]
    pub id: QueryId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Container::constants")]
    pub constants: Container,
    /// The from-list, in order.
    #[serde(default)]
    pub tables: Vec<Container>,
    /// Joins in registration order.
    #[serde(default)]
    pub joins: Vec<Join>,
    #[serde(default)]
    pub selected_items: Vec<ItemId>,
    #[serde(default)]
    pub order_by_items: Vec<ItemId>,
    #[serde(default)]
    pub global_where: Option<String>,
    #[serde(default)]
    pub grouping_enabled: bool,
    #[serde(default = "default_row_limit")]
    pub row_limit: u64,
    #[serde(default = "default_streaming_row_limit")]
    pub streaming_row_limit: u64,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub zoom_level: i32,
    #[serde(default)]
    pub user_override_sql: Option<String>,
}

impl Default for QueryDocument {
    fn default() -> Self {
        Self::from_query(&Query::default())
    }
}

impl QueryDocument {
    /// Capture the full state of `query`.
    pub fn from_query(query: &Query) -> Self {
        Self {
            id: query.id,
            name: query.name.clone(),
            constants: query.constants.clone(),
            tables: query.from_tables().cloned().collect(),
            joins: query.joins.iter().cloned().collect(),
            selected_items: query.selected_items.clone(),
            order_by_items: query.order_by_items.clone(),
            global_where: query.global_where.clone(),
            grouping_enabled: query.grouping_enabled,
            row_limit: query.row_limit,
            streaming_row_limit: query.streaming_row_limit,
            streaming: query.streaming,
            zoom_level: query.zoom_level,
            user_override_sql: query.user_override_sql.clone(),
        }
    }

    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a query from this document. No events are emitted.
    pub fn into_query(self, mode: IdentityMode) -> SnapshotResult<Query> {
        let mut query = Query::with_id(self.id, self.name);

        if !self.constants.is_constants() {
            return Err(SnapshotError::Invalid(format!(
                "container {} is not a constants container",
                self.constants.id()
            )));
        }
        query.constants = self.constants;

        for table in self.tables {
            if table.is_constants() {
                return Err(SnapshotError::Invalid(format!(
                    "constants container {} listed as a table",
                    table.id()
                )));
            }
            let id = table.id();
            if query.tables.insert(id, table).is_some() {
                return Err(SnapshotError::Invalid(format!("container {id} listed twice")));
            }
            query.from_tables.push(id);
        }
        query.rebuild_index();

        let item_count: usize = query
            .from_tables()
            .chain(std::iter::once(&query.constants))
            .map(Container::len)
            .sum();
        if item_count != query.item_index.len() {
            return Err(SnapshotError::Invalid("item identifiers are not unique".into()));
        }

        for join in self.joins {
            for end in [join.left(), join.right()] {
                let owned = query
                    .tables
                    .get(&end.container)
                    .is_some_and(|c| c.contains(end.item));
                if !owned {
                    return Err(SnapshotError::DanglingReference(format!(
                        "join {} references item {} in container {}",
                        join.id(),
                        end.item,
                        end.container
                    )));
                }
            }
            query.joins.add(join)?;
        }

        let mut selected = HashSet::with_capacity(self.selected_items.len());
        for id in &self.selected_items {
            if query.item(*id).is_none() {
                return Err(SnapshotError::DanglingReference(format!(
                    "selected item {id} does not exist"
                )));
            }
            if !selected.insert(*id) {
                return Err(SnapshotError::Invalid(format!("item {id} selected twice")));
            }
        }
        let mut sorted = HashSet::with_capacity(self.order_by_items.len());
        for id in &self.order_by_items {
            let ordered = query
                .item(*id)
                .map(|item| item.sort_order().is_ordered())
                .ok_or_else(|| {
                    SnapshotError::DanglingReference(format!("sort item {id} does not exist"))
                })?;
            if !selected.contains(id) || !ordered || !sorted.insert(*id) {
                return Err(SnapshotError::Invalid(format!(
                    "sort item {id} must be selected, ordered and listed once"
                )));
            }
        }

        let containers = query
            .tables
            .values_mut()
            .chain(std::iter::once(&mut query.constants));
        for container in containers {
            for item in &mut container.items {
                item.selected = selected.contains(&item.id);
            }
        }
        query.selected_items = self.selected_items;
        query.order_by_items = self.order_by_items;

        query.global_where = self.global_where.filter(|t| !t.trim().is_empty());
        query.grouping_enabled = self.grouping_enabled;
        query.row_limit = self.row_limit;
        query.streaming_row_limit = self.streaming_row_limit;
        query.streaming = self.streaming;
        query.zoom_level = self.zoom_level;
        query.user_override_sql = self.user_override_sql;

        tracing::debug!(query = %query.id(), tables = query.from_tables.len(), joins = query.joins.len(), "query loaded");
        Ok(match mode {
            IdentityMode::Preserve => query,
            IdentityMode::Regenerate => query.duplicate(),
        })
    }
}
