//! Join registry: the container-to-joins adjacency map.
//!
//! Every join is indexed under both of its endpoint containers. The registry
//! also keeps the outer-join flags consistent: all joins touching the same
//! container agree on whether that container's side is outer-joined.

use std::collections::HashMap;

use crate::model::{ContainerId, ItemId, Join, JoinId, JoinSide};

use super::error::{QueryError, QueryResult};

/// An outer flag that changed while adding or updating a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterFlagChange {
    pub join: JoinId,
    pub side: JoinSide,
    pub old: bool,
    pub new: bool,
}

/// Undirected join edges indexed by container.
#[derive(Debug, Clone, Default)]
pub struct JoinRegistry {
    joins: HashMap<JoinId, Join>,
    /// Registration order, used for deterministic iteration.
    order: Vec<JoinId>,
    adjacency: HashMap<ContainerId, Vec<JoinId>>,
}

impl JoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: JoinId) -> Option<&Join> {
        self.joins.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: JoinId) -> Option<&mut Join> {
        self.joins.get_mut(&id)
    }

    pub fn contains(&self, id: JoinId) -> bool {
        self.joins.contains_key(&id)
    }

    /// All joins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Join> {
        self.order.iter().filter_map(|id| self.joins.get(id))
    }

    /// Join ids registered under `container`, in registration order.
    pub fn join_ids_for(&self, container: ContainerId) -> &[JoinId] {
        self.adjacency
            .get(&container)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Joins registered under `container`, in registration order.
    pub fn joins_for(&self, container: ContainerId) -> impl Iterator<Item = &Join> {
        self.join_ids_for(container)
            .iter()
            .filter_map(|id| self.joins.get(id))
    }

    /// Joins connecting `a` and `b` in either direction.
    pub fn joins_between(&self, a: ContainerId, b: ContainerId) -> impl Iterator<Item = &Join> {
        self.joins_for(a).filter(move |j| j.connects(a, b))
    }

    pub fn are_joined(&self, a: ContainerId, b: ContainerId) -> bool {
        self.joins_between(a, b).next().is_some()
    }

    /// Joins with an endpoint on `item`.
    pub fn joins_for_item(&self, item: ItemId) -> Vec<JoinId> {
        self.iter()
            .filter(|j| j.references_item(item))
            .map(|j| j.id)
            .collect()
    }

    /// Register `join` under both endpoint containers.
    ///
    /// When a container already has joins, the new join's flag for that
    /// container's side is forced to match the container's first registered
    /// join. Returns the flags that were forced to a different value.
    pub fn add(&mut self, mut join: Join) -> QueryResult<(JoinId, Vec<OuterFlagChange>)> {
        if self.joins.contains_key(&join.id) {
            return Err(QueryError::topology(format!(
                "join {} is already registered",
                join.id
            )));
        }
        if join.left.container == join.right.container {
            return Err(QueryError::topology(format!(
                "join {} connects container {} to itself",
                join.id, join.left.container
            )));
        }

        // Resolve both forced flags before touching anything.
        let mut forced = Vec::with_capacity(2);
        for side in [JoinSide::Left, JoinSide::Right] {
            let container = join.end(side).container;
            if let Some(existing) = self.joins_for(container).next() {
                let existing_side = existing.side_of(container).ok_or_else(|| {
                    QueryError::topology(format!(
                        "join {} is registered under container {} but touches neither side of it",
                        existing.id, container
                    ))
                })?;
                forced.push((side, existing.end(existing_side).outer));
            }
        }

        let join_id = join.id;
        let mut changes = Vec::new();
        for (side, outer) in forced {
            let end = join.end_mut(side);
            if end.outer != outer {
                changes.push(OuterFlagChange {
                    join: join_id,
                    side,
                    old: end.outer,
                    new: outer,
                });
                end.outer = outer;
            }
        }

        let id = join.id;
        self.adjacency
            .entry(join.left.container)
            .or_default()
            .push(id);
        self.adjacency
            .entry(join.right.container)
            .or_default()
            .push(id);
        self.order.push(id);
        self.joins.insert(id, join);
        Ok((id, changes))
    }

    /// Deregister a join from both adjacency lists.
    pub fn remove(&mut self, id: JoinId) -> Option<Join> {
        let join = self.joins.remove(&id)?;
        self.order.retain(|j| *j != id);
        for container in [join.left.container, join.right.container] {
            if let Some(ids) = self.adjacency.get_mut(&container) {
                ids.retain(|j| *j != id);
                if ids.is_empty() {
                    self.adjacency.remove(&container);
                }
            }
        }
        Some(join)
    }

    /// Deregister every join touching `container`.
    pub fn remove_container(&mut self, container: ContainerId) -> Vec<Join> {
        let ids: Vec<JoinId> = self.join_ids_for(container).to_vec();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Set the outer flag on `side` of `id`, propagating the new value to
    /// every other join touching the same container.
    pub fn set_outer(
        &mut self,
        id: JoinId,
        side: JoinSide,
        outer: bool,
    ) -> QueryResult<Vec<OuterFlagChange>> {
        let container = self
            .joins
            .get(&id)
            .map(|j| j.end(side).container)
            .ok_or(QueryError::UnknownJoin(id))?;

        // Every join touching the container, the edited one included.
        let mut targets = Vec::new();
        for other in self.joins_for(container) {
            let other_side = other.side_of(container).ok_or_else(|| {
                QueryError::topology(format!(
                    "join {} is registered under container {} but touches neither side of it",
                    other.id, container
                ))
            })?;
            targets.push((other.id, other_side));
        }

        let mut changes = Vec::new();
        for (join_id, join_side) in targets {
            if let Some(join) = self.joins.get_mut(&join_id) {
                let end = join.end_mut(join_side);
                if end.outer != outer {
                    changes.push(OuterFlagChange {
                        join: join_id,
                        side: join_side,
                        old: end.outer,
                        new: outer,
                    });
                    end.outer = outer;
                }
            }
        }
        Ok(changes)
    }

    /// Check the registry's structural invariants: every join is listed
    /// exactly once under each endpoint container, and every container's
    /// joins agree on that container's outer flag.
    pub fn is_consistent(&self) -> bool {
        for join in self.joins.values() {
            for container in [join.left.container, join.right.container] {
                let hits = self
                    .join_ids_for(container)
                    .iter()
                    .filter(|id| **id == join.id)
                    .count();
                if hits != 1 {
                    return false;
                }
            }
        }
        for (container, ids) in &self.adjacency {
            let mut flags = ids.iter().filter_map(|id| {
                let join = self.joins.get(id)?;
                join.side_of(*container).map(|side| join.end(side).outer)
            });
            if let Some(first) = flags.next() {
                if flags.any(|f| f != first) {
                    return false;
                }
            }
            if ids.iter().any(|id| {
                self.joins
                    .get(id)
                    .map(|j| !j.touches(*container))
                    .unwrap_or(true)
            }) {
                return false;
            }
        }
        true
    }
}
