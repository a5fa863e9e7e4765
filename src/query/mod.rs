//! The query aggregate.
//!
//! A [`Query`] owns its from-list containers (and through them every item),
//! the constants pseudo-table, the selection and sort lists, the join
//! registry and the scalar settings that shape the generated statement. All
//! changes go through its methods so that every change is announced on the
//! [`EventBus`].
//!
//! Multi-step changes are wrapped in compound edits: a depth-counted pair of
//! `start_compound_edit` / `end_compound_edit` calls. Only the outermost pair
//! emits the started/ended markers; the individual changes inside still emit
//! their own events.

pub mod error;
pub mod events;
pub mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{
    Comparator, Container, ContainerId, GroupFunction, Item, ItemId, Join, JoinEnd, JoinId,
    JoinSide, QueryId, SortOrder,
};
use crate::source::{DataSource, SourceSummary};
use crate::sql::{self, SqlGenerator};

pub use error::{QueryError, QueryResult};
pub use events::{
    EventBus, ListenerHandle, PropertyChange, PropertyValue, QueryEvent, QueryListener,
};
pub use registry::{JoinRegistry, OuterFlagChange};

/// Row limit applied to a new query.
pub const DEFAULT_ROW_LIMIT: u64 = 1000;

/// Streaming row limit applied to a new query.
pub const DEFAULT_STREAMING_ROW_LIMIT: u64 = 1000;

/// A visual query: tables, selected items, joins and filters.
pub struct Query {
    pub(crate) id: QueryId,
    pub(crate) name: String,
    pub(crate) tables: HashMap<ContainerId, Container>,
    pub(crate) from_tables: Vec<ContainerId>,
    pub(crate) constants: Container,
    /// Which container owns each item, constants included.
    pub(crate) item_index: HashMap<ItemId, ContainerId>,
    pub(crate) selected_items: Vec<ItemId>,
    pub(crate) order_by_items: Vec<ItemId>,
    pub(crate) joins: JoinRegistry,
    pub(crate) global_where: Option<String>,
    pub(crate) grouping_enabled: bool,
    pub(crate) row_limit: u64,
    pub(crate) streaming_row_limit: u64,
    pub(crate) streaming: bool,
    pub(crate) zoom_level: i32,
    pub(crate) user_override_sql: Option<String>,
    data_source: Option<Arc<dyn DataSource>>,
    bus: EventBus,
    compound_depth: usize,
    compound_message: String,
    /// A model change happened inside the open compound edit.
    pending: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("from_tables", &self.from_tables)
            .field("selected_items", &self.selected_items)
            .field("order_by_items", &self.order_by_items)
            .field("joins", &self.joins.len())
            .field("grouping_enabled", &self.grouping_enabled)
            .field("user_override_sql", &self.user_override_sql)
            .field(
                "data_source",
                &self.data_source.as_deref().map(SourceSummary),
            )
            .field("bus", &self.bus)
            .field("compound_depth", &self.compound_depth)
            .finish()
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

fn integer(value: u64) -> PropertyValue {
    PropertyValue::Integer(i64::try_from(value).ok())
}

impl Query {
    /// An empty query with a freshly populated constants container.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(QueryId::new(), name)
    }

    pub(crate) fn with_id(id: QueryId, name: impl Into<String>) -> Self {
        let mut query = Self {
            id,
            name: name.into(),
            tables: HashMap::new(),
            from_tables: Vec::new(),
            constants: Container::constants(),
            item_index: HashMap::new(),
            selected_items: Vec::new(),
            order_by_items: Vec::new(),
            joins: JoinRegistry::new(),
            global_where: None,
            grouping_enabled: false,
            row_limit: DEFAULT_ROW_LIMIT,
            streaming_row_limit: DEFAULT_STREAMING_ROW_LIMIT,
            streaming: false,
            zoom_level: 0,
            user_override_sql: None,
            data_source: None,
            bus: EventBus::new(),
            compound_depth: 0,
            compound_message: String::new(),
            pending: false,
        };
        query.rebuild_index();
        query
    }

    /// Attach the connection/dialect provider used by [`Query::generate`].
    pub fn with_data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    pub fn set_data_source(&mut self, source: Option<Arc<dyn DataSource>>) {
        self.data_source = source;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_source(&self) -> Option<&dyn DataSource> {
        self.data_source.as_deref()
    }

    /// The from-list, in insertion order.
    pub fn from_tables(&self) -> impl Iterator<Item = &Container> {
        self.from_tables.iter().filter_map(|id| self.tables.get(id))
    }

    pub fn from_table_ids(&self) -> &[ContainerId] {
        &self.from_tables
    }

    pub fn constants_container(&self) -> &Container {
        &self.constants
    }

    /// A from-table or the constants container.
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        if id == self.constants.id {
            Some(&self.constants)
        } else {
            self.tables.get(&id)
        }
    }

    /// First from-table whose name or alias is `name`.
    pub fn table_named(&self, name: &str) -> Option<&Container> {
        self.from_tables()
            .find(|c| c.name() == name || c.alias() == Some(name))
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.container_of(id).and_then(|c| c.item(id))
    }

    /// The container that owns `item`.
    pub fn container_of(&self, item: ItemId) -> Option<&Container> {
        self.item_index
            .get(&item)
            .and_then(|container| self.container(*container))
    }

    /// Selected items, in selection order.
    pub fn selected_items(&self) -> &[ItemId] {
        &self.selected_items
    }

    /// Sort keys, in sort order.
    pub fn order_by_items(&self) -> &[ItemId] {
        &self.order_by_items
    }

    pub fn joins(&self) -> &JoinRegistry {
        &self.joins
    }

    pub fn join(&self, id: JoinId) -> Option<&Join> {
        self.joins.get(id)
    }

    pub fn global_where(&self) -> Option<&str> {
        self.global_where.as_deref()
    }

    pub fn is_grouping_enabled(&self) -> bool {
        self.grouping_enabled
    }

    pub fn row_limit(&self) -> u64 {
        self.row_limit
    }

    pub fn streaming_row_limit(&self) -> u64 {
        self.streaming_row_limit
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom_level
    }

    pub fn user_override_sql(&self) -> Option<&str> {
        self.user_override_sql.as_deref()
    }

    pub fn compound_edit_depth(&self) -> usize {
        self.compound_depth
    }

    pub fn is_in_compound_edit(&self) -> bool {
        self.compound_depth > 0
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn subscribe(&mut self, listener: impl QueryListener + 'static) -> ListenerHandle {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.bus.unsubscribe(handle)
    }

    fn fire(&mut self, event: QueryEvent) {
        if self.compound_depth > 0 && !event.is_marker() {
            self.pending = true;
        }
        self.bus.emit(&event);
    }

    fn fire_query_change(&mut self, property: &'static str, old: PropertyValue, new: PropertyValue) {
        let change = PropertyChange::new(self.id, property, old, new);
        self.fire(QueryEvent::QueryPropertyChanged(change));
    }

    // =========================================================================
    // Compound edits
    // =========================================================================

    /// Open a compound edit. Nested calls only deepen the counter.
    pub fn start_compound_edit(&mut self, message: impl Into<String>) {
        self.compound_depth += 1;
        if self.compound_depth == 1 {
            let message = message.into();
            debug!(query = %self.id, message = %message, "compound edit started");
            self.compound_message = message.clone();
            self.pending = false;
            self.fire(QueryEvent::CompoundEditStarted { message });
        }
    }

    /// Close the innermost compound edit.
    pub fn end_compound_edit(&mut self) -> QueryResult<()> {
        if self.compound_depth == 0 {
            return Err(QueryError::UnbalancedCompoundEdit);
        }
        self.finish_compound_edit();
        Ok(())
    }

    fn finish_compound_edit(&mut self) {
        self.compound_depth = self.compound_depth.saturating_sub(1);
        if self.compound_depth > 0 {
            return;
        }
        let message = std::mem::take(&mut self.compound_message);
        debug!(query = %self.id, message = %message, "compound edit ended");
        self.fire(QueryEvent::CompoundEditEnded { message });
        if std::mem::take(&mut self.pending) {
            self.fire(QueryEvent::CanExecuteQuery);
        }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Append a table to the from-list.
    ///
    /// Items already marked selected join the selection (and the sort list,
    /// if they carry a sort order) in container order.
    pub fn add_table(&mut self, mut container: Container) -> QueryResult<ContainerId> {
        if container.is_constants() {
            return Err(QueryError::ConstantsContainer);
        }
        let id = container.id;
        if self.tables.contains_key(&id) || id == self.constants.id {
            return Err(QueryError::DuplicateContainer(id));
        }
        if let Some(item) = container
            .items
            .iter()
            .find(|item| self.item_index.contains_key(&item.id))
        {
            return Err(QueryError::InvalidArgument(format!(
                "item {} already belongs to this query",
                item.id
            )));
        }

        container.reparent_items();
        for item in &container.items {
            self.item_index.insert(item.id, id);
            if item.selected {
                self.selected_items.push(item.id);
                if item.sort_order.is_ordered() {
                    self.order_by_items.push(item.id);
                }
            }
        }
        debug!(query = %self.id, table = %container.name, "table added");
        self.tables.insert(id, container);
        self.from_tables.push(id);
        self.fire(QueryEvent::ContainerAdded(id));
        Ok(id)
    }

    /// Remove a table, its selection state and every join touching it, all
    /// inside one compound edit. Returns the detached container.
    pub fn remove_table(&mut self, id: ContainerId) -> QueryResult<Container> {
        if id == self.constants.id {
            return Err(QueryError::ConstantsContainer);
        }
        let name = self
            .tables
            .get(&id)
            .map(|c| c.name.clone())
            .ok_or(QueryError::UnknownContainer(id))?;

        self.start_compound_edit(format!("Removing table {name}"));
        let removed = self.detach_table(id);
        self.finish_compound_edit();
        removed
    }

    fn detach_table(&mut self, id: ContainerId) -> QueryResult<Container> {
        let selected: Vec<ItemId> = self
            .tables
            .get(&id)
            .ok_or(QueryError::UnknownContainer(id))?
            .items
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.id)
            .collect();
        for item in selected {
            self.set_item_selected(item, false)?;
        }

        let removed_joins = self.joins.remove_container(id);
        debug!(query = %self.id, container = %id, joins = removed_joins.len(), "cascading table removal");
        for join in removed_joins {
            self.fire(QueryEvent::JoinRemoved(join));
        }

        self.from_tables.retain(|c| *c != id);
        let container = self
            .tables
            .remove(&id)
            .ok_or(QueryError::UnknownContainer(id))?;
        for item in &container.items {
            self.item_index.remove(&item.id);
        }
        self.fire(QueryEvent::ContainerRemoved(id));
        Ok(container)
    }

    pub fn set_container_alias(&mut self, id: ContainerId, alias: Option<&str>) -> QueryResult<()> {
        let alias = non_blank(alias);
        let container = self.container_mut(id)?;
        if container.alias == alias {
            return Ok(());
        }
        let old = std::mem::replace(&mut container.alias, alias.clone());
        let change = PropertyChange::new(
            id,
            "alias",
            PropertyValue::Text(old),
            PropertyValue::Text(alias),
        );
        self.fire(QueryEvent::ContainerPropertyChanged(change));
        Ok(())
    }

    /// Replace a container's layout metadata.
    pub fn set_container_position(
        &mut self,
        id: ContainerId,
        position: serde_json::Value,
    ) -> QueryResult<()> {
        let container = self.container_mut(id)?;
        if container.position == position {
            return Ok(());
        }
        let old = std::mem::replace(&mut container.position, position.clone());
        let change = PropertyChange::new(
            id,
            "position",
            PropertyValue::Text(Some(old.to_string())),
            PropertyValue::Text(Some(position.to_string())),
        );
        self.fire(QueryEvent::ContainerPropertyChanged(change));
        Ok(())
    }

    fn container_mut(&mut self, id: ContainerId) -> QueryResult<&mut Container> {
        if id == self.constants.id {
            Ok(&mut self.constants)
        } else {
            self.tables
                .get_mut(&id)
                .ok_or(QueryError::UnknownContainer(id))
        }
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Append an item to a from-table or the constants container.
    pub fn add_item(&mut self, container: ContainerId, item: Item) -> QueryResult<ItemId> {
        self.insert_item(container, usize::MAX, item)
    }

    /// Insert an item at `index` (clamped to the end) of a container.
    pub fn insert_item(
        &mut self,
        container: ContainerId,
        index: usize,
        item: Item,
    ) -> QueryResult<ItemId> {
        if self.item_index.contains_key(&item.id) {
            return Err(QueryError::InvalidArgument(format!(
                "item {} already belongs to this query",
                item.id
            )));
        }
        let selected = item.selected;
        let ordered = item.sort_order.is_ordered();
        let id = self.container_mut(container)?.insert_item(index, item);

        self.item_index.insert(id, container);
        if selected {
            self.selected_items.push(id);
            if ordered {
                self.order_by_items.push(id);
            }
        }
        self.fire(QueryEvent::ItemAdded {
            container,
            item: id,
        });
        Ok(id)
    }

    /// Add a user-typed constant to the constants container.
    pub fn add_constant(&mut self, text: &str) -> QueryResult<ItemId> {
        if text.trim().is_empty() {
            return Err(QueryError::InvalidArgument(
                "constant text must not be empty".into(),
            ));
        }
        let constants = self.constants.id;
        self.add_item(constants, Item::constant(text.trim()))
    }

    /// Detach an item, deselecting it and removing its joins, inside one
    /// compound edit. Returns the detached item.
    pub fn remove_item(&mut self, id: ItemId) -> QueryResult<Item> {
        let name = self
            .item(id)
            .map(|item| item.name.clone())
            .ok_or(QueryError::UnknownItem(id))?;

        self.start_compound_edit(format!("Removing item {name}"));
        let removed = self.detach_item(id);
        self.finish_compound_edit();
        removed
    }

    fn detach_item(&mut self, id: ItemId) -> QueryResult<Item> {
        self.set_item_selected(id, false)?;
        for join in self.joins.joins_for_item(id) {
            if let Some(join) = self.joins.remove(join) {
                self.fire(QueryEvent::JoinRemoved(join));
            }
        }
        let container = *self.item_index.get(&id).ok_or(QueryError::UnknownItem(id))?;
        let item = self
            .container_mut(container)?
            .remove_item(id)
            .ok_or(QueryError::UnknownItem(id))?;
        self.item_index.remove(&id);
        self.fire(QueryEvent::ItemRemoved {
            container,
            item: id,
        });
        Ok(item)
    }

    fn item_mut(&mut self, id: ItemId) -> QueryResult<&mut Item> {
        let container = *self.item_index.get(&id).ok_or(QueryError::UnknownItem(id))?;
        self.container_mut(container)?
            .item_mut(id)
            .ok_or(QueryError::UnknownItem(id))
    }

    /// Apply `apply` to an item and announce the change it reports, if any.
    fn update_item<F>(&mut self, id: ItemId, property: &'static str, apply: F) -> QueryResult<()>
    where
        F: FnOnce(&mut Item) -> Option<(PropertyValue, PropertyValue)>,
    {
        if let Some((old, new)) = apply(self.item_mut(id)?) {
            let change = PropertyChange::new(id, property, old, new);
            self.fire(QueryEvent::ItemPropertyChanged(change));
        }
        Ok(())
    }

    /// Select or deselect an item.
    ///
    /// Selecting appends it to the selection and, when it has a sort order,
    /// to the sort list. Deselecting removes it from both.
    pub fn set_item_selected(&mut self, id: ItemId, selected: bool) -> QueryResult<()> {
        let item = self.item_mut(id)?;
        if item.selected == selected {
            return Ok(());
        }
        item.selected = selected;
        let ordered = item.sort_order.is_ordered();

        if selected {
            self.selected_items.push(id);
            if ordered {
                self.order_by_items.push(id);
            }
        } else {
            self.selected_items.retain(|i| *i != id);
            self.order_by_items.retain(|i| *i != id);
        }
        let change = PropertyChange::new(
            id,
            "selected",
            PropertyValue::Bool(!selected),
            PropertyValue::Bool(selected),
        );
        self.fire(QueryEvent::ItemPropertyChanged(change));
        Ok(())
    }

    pub fn select_item(&mut self, id: ItemId) -> QueryResult<()> {
        self.set_item_selected(id, true)
    }

    pub fn deselect_item(&mut self, id: ItemId) -> QueryResult<()> {
        self.set_item_selected(id, false)
    }

    /// Change an item's sort direction.
    ///
    /// A selected item always leaves the sort list and, if still ordered,
    /// rejoins it at the end.
    pub fn set_sort_order(&mut self, id: ItemId, order: SortOrder) -> QueryResult<()> {
        let item = self.item_mut(id)?;
        let old = item.sort_order;
        if old == order {
            return Ok(());
        }
        item.sort_order = order;
        let selected = item.selected;

        if selected {
            self.order_by_items.retain(|i| *i != id);
            if order.is_ordered() {
                self.order_by_items.push(id);
            }
        }
        let change = PropertyChange::new(
            id,
            "sort_order",
            PropertyValue::SortOrder(old),
            PropertyValue::SortOrder(order),
        );
        self.fire(QueryEvent::ItemPropertyChanged(change));
        Ok(())
    }

    /// Move a selected item to `index` in the selection (clamped to the end).
    pub fn move_selected_item(&mut self, id: ItemId, index: usize) -> QueryResult<()> {
        let from = self
            .selected_items
            .iter()
            .position(|i| *i == id)
            .ok_or_else(|| QueryError::InvalidArgument(format!("item {id} is not selected")))?;
        self.selected_items.remove(from);
        let index = index.min(self.selected_items.len());
        self.selected_items.insert(index, id);
        self.fire(QueryEvent::ItemOrderChanged { item: id, index });
        Ok(())
    }

    pub fn rename_item(&mut self, id: ItemId, name: &str) -> QueryResult<()> {
        if name.trim().is_empty() {
            return Err(QueryError::InvalidArgument("item name must not be empty".into()));
        }
        self.update_item(id, "name", |item| {
            if item.name == name {
                return None;
            }
            let old = std::mem::replace(&mut item.name, name.to_string());
            Some((
                PropertyValue::Text(Some(old)),
                PropertyValue::Text(Some(name.to_string())),
            ))
        })
    }

    pub fn set_item_alias(&mut self, id: ItemId, alias: Option<&str>) -> QueryResult<()> {
        let alias = non_blank(alias);
        self.update_item(id, "alias", |item| {
            if item.alias == alias {
                return None;
            }
            let old = std::mem::replace(&mut item.alias, alias.clone());
            Some((PropertyValue::Text(old), PropertyValue::Text(alias)))
        })
    }

    /// Set the filter text appended after the item in the WHERE clause,
    /// e.g. `> 100`.
    pub fn set_item_where(&mut self, id: ItemId, fragment: Option<&str>) -> QueryResult<()> {
        let fragment = non_blank(fragment);
        self.update_item(id, "where_fragment", |item| {
            if item.where_fragment == fragment {
                return None;
            }
            let old = std::mem::replace(&mut item.where_fragment, fragment.clone());
            Some((PropertyValue::Text(old), PropertyValue::Text(fragment)))
        })
    }

    pub fn set_group_function(&mut self, id: ItemId, function: GroupFunction) -> QueryResult<()> {
        self.update_item(id, "group_function", |item| {
            if item.group_function == function {
                return None;
            }
            let old = std::mem::replace(&mut item.group_function, function);
            Some((
                PropertyValue::GroupFunction(old),
                PropertyValue::GroupFunction(function),
            ))
        })
    }

    pub fn set_item_having(&mut self, id: ItemId, having: Option<&str>) -> QueryResult<()> {
        let having = non_blank(having);
        self.update_item(id, "having", |item| {
            if item.having == having {
                return None;
            }
            let old = std::mem::replace(&mut item.having, having.clone());
            Some((PropertyValue::Text(old), PropertyValue::Text(having)))
        })
    }

    pub fn set_column_width(&mut self, id: ItemId, width: Option<u32>) -> QueryResult<()> {
        self.update_item(id, "column_width", |item| {
            if item.column_width == width {
                return None;
            }
            let old = std::mem::replace(&mut item.column_width, width);
            Some((
                PropertyValue::Integer(old.map(i64::from)),
                PropertyValue::Integer(width.map(i64::from)),
            ))
        })
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Register a join between two from-tables.
    ///
    /// Both endpoint containers must be in the from-list and own their
    /// endpoint items. The new join's outer flags may be forced to agree with
    /// joins already touching the same containers.
    pub fn add_join(&mut self, join: Join) -> QueryResult<JoinId> {
        for end in [join.left, join.right] {
            if end.container == self.constants.id {
                return Err(QueryError::ConstantsContainer);
            }
            let container = self.tables.get(&end.container).ok_or_else(|| {
                QueryError::topology(format!(
                    "join {} references container {} which is not in the from-list",
                    join.id, end.container
                ))
            })?;
            if !container.contains(end.item) {
                return Err(QueryError::topology(format!(
                    "join {} references item {} which container {} does not own",
                    join.id, end.item, end.container
                )));
            }
        }

        let (id, forced) = self.joins.add(join)?;
        for change in &forced {
            debug!(join = %id, side = ?change.side, outer = change.new, "outer flag forced to match existing joins");
        }
        self.fire(QueryEvent::JoinAdded(id));
        Ok(id)
    }

    /// Join two items by identity, as an inner equi-join.
    pub fn join_items(&mut self, left: ItemId, right: ItemId) -> QueryResult<JoinId> {
        let left_container = *self.item_index.get(&left).ok_or(QueryError::UnknownItem(left))?;
        let right_container = *self
            .item_index
            .get(&right)
            .ok_or(QueryError::UnknownItem(right))?;
        self.add_join(Join::new(
            JoinEnd::new(left_container, left),
            JoinEnd::new(right_container, right),
        ))
    }

    pub fn remove_join(&mut self, id: JoinId) -> QueryResult<Join> {
        let join = self.joins.remove(id).ok_or(QueryError::UnknownJoin(id))?;
        self.fire(QueryEvent::JoinRemoved(join.clone()));
        Ok(join)
    }

    /// Set one side's outer flag. Every join touching that side's container
    /// follows, and each changed flag is announced.
    pub fn set_join_outer(&mut self, id: JoinId, side: JoinSide, outer: bool) -> QueryResult<()> {
        for change in self.joins.set_outer(id, side, outer)? {
            let property = match change.side {
                JoinSide::Left => "left_outer",
                JoinSide::Right => "right_outer",
            };
            let change = PropertyChange::new(
                change.join,
                property,
                PropertyValue::Bool(change.old),
                PropertyValue::Bool(change.new),
            );
            self.fire(QueryEvent::JoinPropertyChanged(change));
        }
        Ok(())
    }

    pub fn set_join_comparator(&mut self, id: JoinId, comparator: Comparator) -> QueryResult<()> {
        let join = self.joins.get_mut(id).ok_or(QueryError::UnknownJoin(id))?;
        if join.comparator == comparator {
            return Ok(());
        }
        let old = std::mem::replace(&mut join.comparator, comparator);
        let change = PropertyChange::new(
            id,
            "comparator",
            PropertyValue::Comparator(old),
            PropertyValue::Comparator(comparator),
        );
        self.fire(QueryEvent::JoinPropertyChanged(change));
        Ok(())
    }

    pub fn set_join_name(&mut self, id: JoinId, name: Option<&str>) -> QueryResult<()> {
        let name = non_blank(name);
        let join = self.joins.get_mut(id).ok_or(QueryError::UnknownJoin(id))?;
        if join.name == name {
            return Ok(());
        }
        let old = std::mem::replace(&mut join.name, name.clone());
        let change =
            PropertyChange::new(id, "name", PropertyValue::Text(old), PropertyValue::Text(name));
        self.fire(QueryEvent::JoinPropertyChanged(change));
        Ok(())
    }

    // =========================================================================
    // Query properties
    // =========================================================================

    pub fn set_name(&mut self, name: &str) {
        if self.name == name {
            return;
        }
        let old = std::mem::replace(&mut self.name, name.to_string());
        self.fire_query_change(
            "name",
            PropertyValue::Text(Some(old)),
            PropertyValue::Text(Some(name.to_string())),
        );
    }

    /// Free-form filter text ANDed onto the WHERE clause.
    pub fn set_global_where(&mut self, text: Option<&str>) {
        let text = non_blank(text);
        if self.global_where == text {
            return;
        }
        let old = std::mem::replace(&mut self.global_where, text.clone());
        self.fire_query_change(
            "global_where",
            PropertyValue::Text(old),
            PropertyValue::Text(text),
        );
    }

    pub fn set_grouping_enabled(&mut self, enabled: bool) {
        if self.grouping_enabled == enabled {
            return;
        }
        self.grouping_enabled = enabled;
        self.fire_query_change(
            "grouping_enabled",
            PropertyValue::Bool(!enabled),
            PropertyValue::Bool(enabled),
        );
    }

    pub fn set_row_limit(&mut self, limit: u64) {
        if self.row_limit == limit {
            return;
        }
        let old = std::mem::replace(&mut self.row_limit, limit);
        self.fire_query_change("row_limit", integer(old), integer(limit));
    }

    pub fn set_streaming_row_limit(&mut self, limit: u64) {
        if self.streaming_row_limit == limit {
            return;
        }
        let old = std::mem::replace(&mut self.streaming_row_limit, limit);
        self.fire_query_change("streaming_row_limit", integer(old), integer(limit));
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        if self.streaming == streaming {
            return;
        }
        self.streaming = streaming;
        self.fire_query_change(
            "streaming",
            PropertyValue::Bool(!streaming),
            PropertyValue::Bool(streaming),
        );
    }

    pub fn set_zoom_level(&mut self, zoom: i32) {
        if self.zoom_level == zoom {
            return;
        }
        let old = std::mem::replace(&mut self.zoom_level, zoom);
        self.fire_query_change(
            "zoom_level",
            PropertyValue::Integer(Some(i64::from(old))),
            PropertyValue::Integer(Some(i64::from(zoom))),
        );
    }

    /// Replace the generated statement with hand-written SQL.
    ///
    /// Text identical to what the model currently generates is not an
    /// override; it clears any override instead.
    pub fn define_user_override(&mut self, sql: &str) {
        if sql == self.generate_structural() {
            self.clear_override();
            return;
        }
        if self.user_override_sql.as_deref() == Some(sql) {
            return;
        }
        let old = self.user_override_sql.replace(sql.to_string());
        self.fire_query_change(
            "user_override_sql",
            PropertyValue::Text(old),
            PropertyValue::Text(Some(sql.to_string())),
        );
    }

    pub fn clear_override(&mut self) {
        if let Some(old) = self.user_override_sql.take() {
            self.fire_query_change(
                "user_override_sql",
                PropertyValue::Text(Some(old)),
                PropertyValue::Text(None),
            );
        }
    }

    // =========================================================================
    // Whole-query operations
    // =========================================================================

    /// Return to the empty state in one compound edit: no tables, default
    /// constants, no filter, no grouping, no override, zoom 0.
    pub fn reset(&mut self) {
        self.start_compound_edit("Resetting query");
        for id in self.from_tables.clone() {
            if let Err(err) = self.detach_table(id) {
                warn!(query = %self.id, container = %id, error = %err, "table removal failed during reset");
            }
        }
        if let Err(err) = self.reset_constants() {
            warn!(query = %self.id, error = %err, "constants reset failed");
        }
        self.set_global_where(None);
        self.set_grouping_enabled(false);
        self.clear_override();
        self.set_zoom_level(0);
        self.finish_compound_edit();
    }

    fn reset_constants(&mut self) -> QueryResult<()> {
        let existing: Vec<ItemId> = self.constants.items.iter().map(|item| item.id).collect();
        for id in existing {
            self.detach_item(id)?;
        }
        self.constants.restore_builtins();
        let container = self.constants.id;
        let added: Vec<ItemId> = self.constants.items.iter().map(|item| item.id).collect();
        for item in added {
            self.item_index.insert(item, container);
            self.fire(QueryEvent::ItemAdded { container, item });
        }
        Ok(())
    }

    /// Deep copy with fresh identities for the query, its containers, items
    /// and joins. Listeners are not copied; the data source is shared.
    pub fn duplicate(&self) -> Query {
        let mut item_map: HashMap<ItemId, ItemId> = HashMap::new();
        let mut container_map: HashMap<ContainerId, ContainerId> = HashMap::new();
        let mut copy_container = |original: &Container| {
            let copy = original.deep_copy();
            container_map.insert(original.id, copy.id);
            for (old, new) in original.items.iter().zip(&copy.items) {
                item_map.insert(old.id, new.id);
            }
            copy
        };

        let mut copy = Query::new(self.name.clone());
        copy.constants = copy_container(&self.constants);
        for table in self.from_tables() {
            let table = copy_container(table);
            copy.from_tables.push(table.id);
            copy.tables.insert(table.id, table);
        }
        copy.rebuild_index();

        let remap = |end: &JoinEnd| -> Option<JoinEnd> {
            Some(JoinEnd {
                container: *container_map.get(&end.container)?,
                item: *item_map.get(&end.item)?,
                outer: end.outer,
            })
        };
        for join in self.joins.iter() {
            let (Some(left), Some(right)) = (remap(&join.left), remap(&join.right)) else {
                continue;
            };
            let mut fresh = Join::new(left, right).with_comparator(join.comparator);
            fresh.name = join.name.clone();
            if let Err(err) = copy.joins.add(fresh) {
                warn!(join = %join.id, error = %err, "join skipped while duplicating query");
            }
        }

        let remap_items = |ids: &[ItemId]| -> Vec<ItemId> {
            ids.iter().filter_map(|id| item_map.get(id).copied()).collect()
        };
        copy.selected_items = remap_items(&self.selected_items);
        copy.order_by_items = remap_items(&self.order_by_items);
        copy.global_where = self.global_where.clone();
        copy.grouping_enabled = self.grouping_enabled;
        copy.row_limit = self.row_limit;
        copy.streaming_row_limit = self.streaming_row_limit;
        copy.streaming = self.streaming;
        copy.zoom_level = self.zoom_level;
        copy.user_override_sql = self.user_override_sql.clone();
        copy.data_source = self.data_source.clone();
        copy
    }

    /// Recompute item ownership from the containers.
    pub(crate) fn rebuild_index(&mut self) {
        self.item_index.clear();
        self.constants.reparent_items();
        for item in &self.constants.items {
            self.item_index.insert(item.id, self.constants.id);
        }
        for (id, table) in &mut self.tables {
            table.reparent_items();
            for item in &table.items {
                self.item_index.insert(item.id, *id);
            }
        }
    }

    /// Check the model's structural invariants:
    ///
    /// - an item is flagged selected exactly when it is in the selection,
    /// - the sort list holds only selected, ordered items, each once,
    /// - the join registry is symmetric with agreeing outer flags,
    /// - every join connects two from-tables that own its endpoint items.
    pub fn is_consistent(&self) -> bool {
        let all_items = self
            .from_tables()
            .chain(std::iter::once(&self.constants))
            .flat_map(|c| c.items.iter());
        for item in all_items {
            let listed = self.selected_items.iter().filter(|i| **i == item.id).count();
            if (item.selected && listed != 1) || (!item.selected && listed != 0) {
                return false;
            }
        }
        if self.selected_items.len() != self.item_count_selected() {
            return false;
        }
        for (pos, id) in self.order_by_items.iter().enumerate() {
            let Some(item) = self.item(*id) else {
                return false;
            };
            if !item.selected
                || !item.sort_order.is_ordered()
                || self.order_by_items[..pos].contains(id)
            {
                return false;
            }
        }
        if !self.joins.is_consistent() {
            return false;
        }
        self.joins.iter().all(|join| {
            [join.left, join.right].iter().all(|end| {
                self.tables
                    .get(&end.container)
                    .is_some_and(|c| c.contains(end.item))
            })
        })
    }

    fn item_count_selected(&self) -> usize {
        self.from_tables()
            .chain(std::iter::once(&self.constants))
            .flat_map(|c| c.items.iter())
            .filter(|item| item.selected)
            .count()
    }

    // =========================================================================
    // SQL
    // =========================================================================

    /// The statement for this query: the user override if one is set,
    /// otherwise the SQL generated from the model.
    pub fn generate(&self) -> String {
        SqlGenerator::for_source(self.data_source()).generate(self)
    }

    /// The SQL generated from the model, ignoring any user override.
    pub fn generate_structural(&self) -> String {
        SqlGenerator::for_source(self.data_source()).generate_structural(self)
    }

    /// Does some from-table have no join to any table emitted before it?
    pub fn contains_cross_joins(&self) -> bool {
        sql::contains_cross_joins(self)
    }
}
