//! Selectable expressions.
//!
//! An [`Item`] is either a real column of a table, a constant typed by the
//! user (or one of the built-in placeholders), or the synthetic `COUNT(*)`.
//! Items are owned by exactly one [`Container`](super::Container); the
//! `parent` field is a handle back to it, never ownership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{ContainerId, ItemId};
use crate::query::error::QueryError;

/// What an item renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A real column of a database table.
    Column,
    /// Free text or a built-in placeholder resolved per dialect.
    Constant,
    /// The `COUNT(*)` placeholder. Renders its own literal text.
    CountStar,
}

/// Aggregation state of an item.
///
/// `GroupBy` is the plain marker: the item is a member of the GROUP BY list
/// when grouping is enabled. Every other variant wraps the item in that
/// aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupFunction {
    #[default]
    GroupBy,
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl GroupFunction {
    /// All aggregate functions (everything but the plain marker).
    pub const AGGREGATES: [GroupFunction; 5] = [
        GroupFunction::Sum,
        GroupFunction::Count,
        GroupFunction::Avg,
        GroupFunction::Min,
        GroupFunction::Max,
    ];

    /// Is this an aggregate function (as opposed to the group-by marker)?
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, GroupFunction::GroupBy)
    }

    /// SQL spelling of the function.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupFunction::GroupBy => "GROUP BY",
            GroupFunction::Sum => "SUM",
            GroupFunction::Count => "COUNT",
            GroupFunction::Avg => "AVG",
            GroupFunction::Min => "MIN",
            GroupFunction::Max => "MAX",
        }
    }
}

impl fmt::Display for GroupFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction of an item in the ORDER BY list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
    #[default]
    Unordered,
}

impl SortOrder {
    /// Keyword appended in the ORDER BY clause, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            SortOrder::Ascending => Some("ASC"),
            SortOrder::Descending => Some("DESC"),
            SortOrder::Unordered => None,
        }
    }

    pub fn is_ordered(&self) -> bool {
        !matches!(self, SortOrder::Unordered)
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    /// Parse a sort direction. An empty or unknown direction is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            "none" | "unordered" => Ok(SortOrder::Unordered),
            "" => Err(QueryError::InvalidArgument(
                "sort direction must not be empty".to_string(),
            )),
            other => Err(QueryError::InvalidArgument(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// A single selectable expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: ItemId,
    pub(crate) name: String,
    pub(crate) kind: ItemKind,
    #[serde(default)]
    pub(crate) alias: Option<String>,
    #[serde(default)]
    pub(crate) column_width: Option<u32>,
    #[serde(default)]
    pub(crate) selected: bool,
    #[serde(default)]
    pub(crate) where_fragment: Option<String>,
    #[serde(default)]
    pub(crate) group_function: GroupFunction,
    #[serde(default)]
    pub(crate) having: Option<String>,
    #[serde(default)]
    pub(crate) sort_order: SortOrder,
    /// Owning container. Rebuilt from the containment structure on load.
    #[serde(skip)]
    pub(crate) parent: Option<ContainerId>,
}

impl Item {
    fn with_kind(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            kind,
            alias: None,
            column_width: None,
            selected: false,
            where_fragment: None,
            group_function: GroupFunction::GroupBy,
            having: None,
            sort_order: SortOrder::Unordered,
            parent: None,
        }
    }

    /// A real column.
    pub fn column(name: impl Into<String>) -> Self {
        Self::with_kind(name, ItemKind::Column)
    }

    /// A constant expression (free text, or a built-in placeholder name).
    pub fn constant(text: impl Into<String>) -> Self {
        Self::with_kind(text, ItemKind::Constant)
    }

    /// The synthetic `COUNT(*)` item.
    pub fn count_star() -> Self {
        Self::with_kind("count(*)", ItemKind::CountStar)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_where(mut self, fragment: impl Into<String>) -> Self {
        self.where_fragment = Some(fragment.into());
        self
    }

    pub fn with_group_function(mut self, function: GroupFunction) -> Self {
        self.group_function = function;
        self
    }

    pub fn with_having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(having.into());
        self
    }

    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn with_column_width(mut self, width: u32) -> Self {
        self.column_width = Some(width);
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Explicit alias, if one is set and non-empty.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| !a.is_empty())
    }

    pub fn column_width(&self) -> Option<u32> {
        self.column_width
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Filter fragment, if one is set and non-empty.
    pub fn where_fragment(&self) -> Option<&str> {
        self.where_fragment.as_deref().filter(|w| !w.trim().is_empty())
    }

    pub fn group_function(&self) -> GroupFunction {
        self.group_function
    }

    /// HAVING text, if one is set and non-empty.
    pub fn having(&self) -> Option<&str> {
        self.having.as_deref().filter(|h| !h.trim().is_empty())
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    /// A constant whose text already starts with an aggregate function name,
    /// e.g. a user typing `count(*)` or `Sum(price)` straight into a constant.
    ///
    /// Such constants are treated as aggregated and never join the GROUP BY
    /// list.
    pub fn is_pre_aggregated_constant(&self) -> bool {
        if self.kind == ItemKind::Column {
            return false;
        }
        let text = self.name.trim_start().to_uppercase();
        GroupFunction::AGGREGATES
            .iter()
            .any(|f| text.starts_with(f.as_str()))
    }

    /// Copy of this item with a fresh identity and no parent.
    pub(crate) fn fresh_copy(&self) -> Self {
        Self {
            id: ItemId::new(),
            parent: None,
            ..self.clone()
        }
    }
}
