//! SELECT statement generation.
//!
//! [`SqlGenerator`] renders a [`Query`] as one line of SQL:
//!
//! ```text
//! SELECT <items> FROM <tables and joins> WHERE <filters>
//!     GROUP BY <plain items> HAVING <having> ORDER BY <sort keys>
//! ```
//!
//! Clauses with nothing to say are left out. Generation never fails: an
//! empty selection renders as the empty string and unjoined tables are
//! joined on the visible tautology `0 = 0`.

use crate::model::{Comparator, Container, Item, ItemKind, Join, JoinKind, SortOrder};
use crate::query::Query;
use crate::source::{self, DataSource};

use super::dialect::{Dialect, SqlDialect};
use super::graph;
use super::token::{Token, TokenStream};

const LIST_SEPARATOR: [Token; 2] = [Token::Comma, Token::Space];
const AND_SEPARATOR: [Token; 3] = [Token::Space, Token::And, Token::Space];

/// Renders queries for one dialect and identifier quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlGenerator {
    dialect: Dialect,
    quote: String,
}

impl SqlGenerator {
    /// A generator with unquoted identifiers.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            quote: String::new(),
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = quote.into();
        self
    }

    /// Resolve the dialect from the source's driver and probe its quote
    /// string. Without a source, the generic dialect with bare identifiers.
    pub fn for_source(source: Option<&dyn DataSource>) -> Self {
        match source {
            Some(source) => Self {
                dialect: Dialect::from_driver(source.driver()),
                quote: source::probe_identifier_quote(source),
            },
            None => Self::default(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// The user override if the query has one, otherwise the generated SQL.
    pub fn generate(&self, query: &Query) -> String {
        if let Some(sql) = query.user_override_sql() {
            return sql.to_string();
        }
        self.generate_structural(query)
    }

    /// SQL generated from the model alone.
    pub fn generate_structural(&self, query: &Query) -> String {
        if query.selected_items().is_empty() {
            return String::new();
        }

        let mut ts = TokenStream::new();
        self.emit_select(query, &mut ts);
        self.emit_from(query, &mut ts);
        self.emit_where(query, &mut ts);
        if query.is_grouping_enabled() {
            self.emit_group_by(query, &mut ts);
            self.emit_having(query, &mut ts);
        }
        self.emit_order_by(query, &mut ts);

        let sql = ts.serialize(self.dialect, &self.quote);
        tracing::trace!(query = %query.id(), dialect = %self.dialect, sql = %sql, "generated");
        sql
    }

    // =========================================================================
    // Clauses
    // =========================================================================

    fn emit_select(&self, query: &Query, ts: &mut TokenStream) {
        let members = selected(query)
            .map(|item| {
                let wrapped = aggregated(query, item);
                let mut part = self.item_expr(query, item, wrapped);
                if let Some(alias) = item.alias() {
                    part.space().push(Token::As).space().push(Token::Alias(alias.into()));
                } else if wrapped {
                    let synthetic = format!("{}_{}", item.group_function(), item.name());
                    part.space().push(Token::As).space().push(Token::Alias(synthetic));
                }
                part
            })
            .collect();
        ts.push(Token::Select).space().join(members, &LIST_SEPARATOR);
    }

    fn emit_from(&self, query: &Query, ts: &mut TokenStream) {
        let order = graph::finish_order(query.from_table_ids(), query.joins());
        if order.is_empty() {
            return;
        }
        ts.space().push(Token::From).space();

        for (i, id) in order.iter().enumerate() {
            let Some(table) = query.container(*id) else {
                continue;
            };
            if i == 0 {
                self.table_ref(table, ts);
                continue;
            }

            let previous = order[i - 1];
            let emitted = &order[..i];
            let kind = query
                .joins()
                .joins_between(*id, previous)
                .next()
                .map(Join::kind)
                .unwrap_or(JoinKind::Inner);

            let predicates: Vec<TokenStream> = query
                .joins()
                .joins_for(*id)
                .filter(|join| {
                    join.other_container(*id)
                        .is_some_and(|other| emitted.contains(&other))
                })
                .filter_map(|join| {
                    let left = query.item(join.left().item)?;
                    let right = query.item(join.right().item)?;
                    let mut predicate = self.item_expr(query, left, false);
                    predicate
                        .space()
                        .push(Token::Comparator(join.comparator()))
                        .space()
                        .append(&self.item_expr(query, right, false));
                    Some(predicate)
                })
                .collect();

            ts.space().push(Token::Join(kind)).space();
            self.table_ref(table, ts);
            ts.space().push(Token::On).space();
            if predicates.is_empty() {
                ts.push(Token::LitInt(0))
                    .space()
                    .push(Token::Comparator(Comparator::Eq))
                    .space()
                    .push(Token::LitInt(0));
            } else {
                ts.join(predicates, &AND_SEPARATOR);
            }
        }
    }

    fn emit_where(&self, query: &Query, ts: &mut TokenStream) {
        let containers =
            std::iter::once(query.constants_container()).chain(query.from_tables());
        let mut filters: Vec<TokenStream> = containers
            .flat_map(|container| container.items().iter())
            .filter_map(|item| {
                let fragment = item.where_fragment()?;
                let mut part = self.item_expr(query, item, false);
                part.space().push(Token::Raw(fragment.into()));
                Some(part)
            })
            .collect();
        if let Some(global) = query.global_where() {
            let mut part = TokenStream::new();
            part.push(Token::Raw(global.into()));
            filters.push(part);
        }
        if filters.is_empty() {
            return;
        }
        ts.space().push(Token::Where).space().join(filters, &AND_SEPARATOR);
    }

    fn emit_group_by(&self, query: &Query, ts: &mut TokenStream) {
        let members: Vec<TokenStream> = selected(query)
            .filter(|item| !item.group_function().is_aggregate())
            .filter(|item| !item.is_pre_aggregated_constant())
            .map(|item| self.item_expr(query, item, false))
            .collect();
        if members.is_empty() {
            return;
        }
        ts.space().push(Token::GroupBy).space().join(members, &LIST_SEPARATOR);
    }

    fn emit_having(&self, query: &Query, ts: &mut TokenStream) {
        let members: Vec<TokenStream> = selected(query)
            .filter_map(|item| {
                let having = item.having()?;
                let mut part = self.item_expr(query, item, aggregated(query, item));
                part.space().push(Token::Raw(having.into()));
                Some(part)
            })
            .collect();
        if members.is_empty() {
            return;
        }
        ts.space().push(Token::Having).space().join(members, &AND_SEPARATOR);
    }

    fn emit_order_by(&self, query: &Query, ts: &mut TokenStream) {
        let keys: Vec<TokenStream> = query
            .order_by_items()
            .iter()
            .filter_map(|id| query.item(*id))
            .map(|item| {
                let mut part = self.item_expr(query, item, aggregated(query, item));
                match item.sort_order() {
                    SortOrder::Ascending => {
                        part.space().push(Token::Asc);
                    }
                    SortOrder::Descending => {
                        part.space().push(Token::Desc);
                    }
                    SortOrder::Unordered => {}
                }
                part
            })
            .collect();
        if keys.is_empty() {
            return;
        }
        ts.space().push(Token::OrderBy).space().join(keys, &LIST_SEPARATOR);
    }

    // =========================================================================
    // Fragments
    // =========================================================================

    /// `[schema.]name [alias]` for a FROM entry.
    fn table_ref(&self, table: &Container, ts: &mut TokenStream) {
        ts.push(Token::QualifiedIdent {
            schema: table.schema().map(str::to_string),
            name: table.name().to_string(),
        });
        if let Some(alias) = table.alias() {
            ts.space().push(Token::Alias(alias.into()));
        }
    }

    /// An item as it appears in an expression, qualified by its table and
    /// optionally wrapped in its aggregate function.
    fn item_expr(&self, query: &Query, item: &Item, wrap: bool) -> TokenStream {
        let mut ts = TokenStream::new();
        if wrap {
            ts.push(Token::FunctionName(item.group_function().as_str().into()))
                .lparen();
        }
        if item.kind() == ItemKind::Column {
            if let Some(table) = query.container_of(item.id()).filter(|c| !c.is_constants()) {
                match table.alias() {
                    Some(alias) => ts.push(Token::Alias(alias.into())),
                    None => ts.push(Token::Ident(table.name().into())),
                };
                ts.push(Token::Dot);
            }
        }
        ts.push(Token::Raw(self.dialect.resolve_item(item, &self.quote)));
        if wrap {
            ts.rparen();
        }
        ts
    }
}

fn selected(query: &Query) -> impl Iterator<Item = &Item> {
    query
        .selected_items()
        .iter()
        .filter_map(|id| query.item(*id))
}

/// Does the item render wrapped in its aggregate function?
fn aggregated(query: &Query, item: &Item) -> bool {
    query.is_grouping_enabled()
        && item.group_function().is_aggregate()
        && item.kind() != ItemKind::CountStar
}

/// Does some from-table lack a join to every table emitted before it?
pub fn contains_cross_joins(query: &Query) -> bool {
    graph::has_cross_join(query.from_table_ids(), query.joins())
}
