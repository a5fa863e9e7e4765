//! Change notification for query consumers.
//!
//! Every mutation on a [`Query`](super::Query) is pushed synchronously to the
//! registered listeners, on the caller's thread, before the mutator returns.
//!
//! Delivery order is part of the contract: listeners are invoked in reverse
//! registration order, the most recently registered first. A listener that
//! panics unwinds through the mutator and the remaining listeners for that
//! event are not called.

use std::fmt;

use crate::model::{Comparator, ContainerId, GroupFunction, ItemId, Join, JoinId, QueryId, SortOrder};

/// Old or new value carried by a property change.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(Option<String>),
    Bool(bool),
    Integer(Option<i64>),
    GroupFunction(GroupFunction),
    SortOrder(SortOrder),
    Comparator(Comparator),
}

/// A scalar property of `target` changed from `old` to `new`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange<T> {
    pub target: T,
    pub property: &'static str,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

impl<T> PropertyChange<T> {
    pub fn new(target: T, property: &'static str, old: PropertyValue, new: PropertyValue) -> Self {
        Self {
            target,
            property,
            old,
            new,
        }
    }
}

/// Everything a listener can be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    JoinAdded(JoinId),
    /// Carries the removed join, which is no longer reachable from the query.
    JoinRemoved(Join),
    ItemAdded {
        container: ContainerId,
        item: ItemId,
    },
    ItemRemoved {
        container: ContainerId,
        item: ItemId,
    },
    /// An item moved to `index` in the selection list.
    ItemOrderChanged {
        item: ItemId,
        index: usize,
    },
    ContainerAdded(ContainerId),
    ContainerRemoved(ContainerId),
    ItemPropertyChanged(PropertyChange<ItemId>),
    JoinPropertyChanged(PropertyChange<JoinId>),
    ContainerPropertyChanged(PropertyChange<ContainerId>),
    QueryPropertyChanged(PropertyChange<QueryId>),
    CompoundEditStarted {
        message: String,
    },
    CompoundEditEnded {
        message: String,
    },
    /// A compound edit that changed the model has finished; the model is
    /// consistent and can be executed again.
    CanExecuteQuery,
}

impl QueryEvent {
    /// Short name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            QueryEvent::JoinAdded(_) => "join_added",
            QueryEvent::JoinRemoved(_) => "join_removed",
            QueryEvent::ItemAdded { .. } => "item_added",
            QueryEvent::ItemRemoved { .. } => "item_removed",
            QueryEvent::ItemOrderChanged { .. } => "item_order_changed",
            QueryEvent::ContainerAdded(_) => "container_added",
            QueryEvent::ContainerRemoved(_) => "container_removed",
            QueryEvent::ItemPropertyChanged(_) => "item_property_changed",
            QueryEvent::JoinPropertyChanged(_) => "join_property_changed",
            QueryEvent::ContainerPropertyChanged(_) => "container_property_changed",
            QueryEvent::QueryPropertyChanged(_) => "query_property_changed",
            QueryEvent::CompoundEditStarted { .. } => "compound_edit_started",
            QueryEvent::CompoundEditEnded { .. } => "compound_edit_ended",
            QueryEvent::CanExecuteQuery => "can_execute_query",
        }
    }

    /// Compound edit markers and the executable signal are not model changes.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            QueryEvent::CompoundEditStarted { .. }
                | QueryEvent::CompoundEditEnded { .. }
                | QueryEvent::CanExecuteQuery
        )
    }
}

/// Receives query events.
pub trait QueryListener: Send {
    fn on_event(&self, event: &QueryEvent);
}

impl<F> QueryListener for F
where
    F: Fn(&QueryEvent) + Send,
{
    fn on_event(&self, event: &QueryEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Ordered fan-out of events to listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerHandle, Box<dyn QueryListener>)>,
    next_handle: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl QueryListener + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Remove a listener. Returns false if the handle was not registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener, last registered first.
    pub fn emit(&self, event: &QueryEvent) {
        tracing::trace!(event = event.name(), listeners = self.listeners.len(), "emit");
        for (_, listener) in self.listeners.iter().rev() {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
