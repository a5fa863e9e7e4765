//! FROM-list sources.
//!
//! A [`Container`] is an ordered collection of [`Item`]s. It either wraps a
//! real database table or is the query's constants pseudo-table, which holds
//! the built-in placeholders and any constants the user typed in.

use serde::{Deserialize, Serialize};

use super::ids::{ContainerId, ItemId};
use super::item::Item;

/// Name of the constants pseudo-table.
pub const CONSTANTS_CONTAINER_NAME: &str = "Constants";

/// Built-in constant placeholders, in the order they are created.
pub const BUILTIN_CONSTANTS: [&str; 3] = ["current_time", "current_date", "user"];

/// What a container stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerKind {
    /// A genuine database table, optionally schema-qualified.
    Table {
        #[serde(default)]
        schema: Option<String>,
    },
    /// The constants pseudo-table. Never part of the FROM list.
    Constants,
}

/// One FROM-list source and the items it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub(crate) id: ContainerId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) alias: Option<String>,
    pub(crate) kind: ContainerKind,
    #[serde(default)]
    pub(crate) items: Vec<Item>,
    /// Layout metadata owned by the presentation layer. Stored, never read.
    #[serde(default)]
    pub(crate) position: serde_json::Value,
}

impl Container {
    /// A container wrapping the database table `name`.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            id: ContainerId::new(),
            name: name.into(),
            alias: None,
            kind: ContainerKind::Table { schema: None },
            items: Vec::new(),
            position: serde_json::Value::Null,
        }
    }

    /// A constants pseudo-table populated with the built-in placeholders.
    pub fn constants() -> Self {
        let mut container = Self {
            id: ContainerId::new(),
            name: CONSTANTS_CONTAINER_NAME.to_string(),
            alias: None,
            kind: ContainerKind::Constants,
            items: Vec::new(),
            position: serde_json::Value::Null,
        };
        container.restore_builtins();
        container
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Schema qualifier supplied by the metadata provider.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        if let ContainerKind::Table { schema: s } = &mut self.kind {
            *s = Some(schema.into());
        }
        self
    }

    pub fn with_position(mut self, position: serde_json::Value) -> Self {
        self.position = position;
        self
    }

    /// Builder form of [`Container::push_item`].
    pub fn with_item(mut self, item: Item) -> Self {
        self.push_item(item);
        self
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit alias, if one is set and non-empty.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| !a.is_empty())
    }

    pub fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    pub fn is_constants(&self) -> bool {
        matches!(self.kind, ContainerKind::Constants)
    }

    pub fn schema(&self) -> Option<&str> {
        match &self.kind {
            ContainerKind::Table { schema } => schema.as_deref(),
            ContainerKind::Constants => None,
        }
    }

    /// The name columns are qualified with: the alias if set, else the name.
    pub fn qualifier(&self) -> &str {
        self.alias().unwrap_or(&self.name)
    }

    pub fn position(&self) -> &serde_json::Value {
        &self.position
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// First item matching `predicate`.
    pub fn find_item(&self, predicate: impl Fn(&Item) -> bool) -> Option<&Item> {
        self.items.iter().find(|i| predicate(i))
    }

    /// First item with the given name.
    pub fn item_named(&self, name: &str) -> Option<&Item> {
        self.find_item(|i| i.name == name)
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    /// Attach `item` at the end. The item's parent becomes this container.
    pub fn push_item(&mut self, item: Item) -> ItemId {
        let index = self.items.len();
        self.insert_item(index, item)
    }

    /// Attach `item` at `index` (clamped to the end).
    pub fn insert_item(&mut self, index: usize, mut item: Item) -> ItemId {
        item.parent = Some(self.id);
        let id = item.id;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        id
    }

    /// Detach the item at `index`, clearing its parent.
    pub fn remove_item_at(&mut self, index: usize) -> Option<Item> {
        if index >= self.items.len() {
            return None;
        }
        let mut item = self.items.remove(index);
        item.parent = None;
        Some(item)
    }

    /// Detach the item with the given identity.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        self.index_of(id).and_then(|idx| self.remove_item_at(idx))
    }

    /// Copy of this container and all of its items with fresh identities.
    ///
    /// Field values are preserved; every item is re-parented to the copy.
    pub fn deep_copy(&self) -> Self {
        let mut copy = Self {
            id: ContainerId::new(),
            name: self.name.clone(),
            alias: self.alias.clone(),
            kind: self.kind.clone(),
            items: Vec::with_capacity(self.items.len()),
            position: self.position.clone(),
        };
        for item in &self.items {
            copy.push_item(item.fresh_copy());
        }
        copy
    }

    /// Replace the items with the four built-in placeholders.
    pub(crate) fn restore_builtins(&mut self) {
        self.items.clear();
        for name in BUILTIN_CONSTANTS {
            self.push_item(Item::constant(name));
        }
        self.push_item(Item::count_star());
    }

    /// Re-point every item's parent at this container.
    pub(crate) fn reparent_items(&mut self) {
        let id = self.id;
        for item in &mut self.items {
            item.parent = Some(id);
        }
    }
}
