//! Join edges between items of two different containers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{ContainerId, ItemId, JoinId};

/// Comparison operator used in a join predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "IN")]
    In,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Gte => ">=",
            Comparator::Lte => "<=",
            Comparator::Ne => "<>",
            Comparator::Between => "BETWEEN",
            Comparator::Like => "LIKE",
            Comparator::Not => "NOT",
            Comparator::In => "IN",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which endpoint of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    pub fn opposite(&self) -> JoinSide {
        match self {
            JoinSide::Left => JoinSide::Right,
            JoinSide::Right => JoinSide::Left,
        }
    }
}

/// One endpoint of a join: an item and the container that owns it.
///
/// `outer` marks the endpoint's container as outer-joined, i.e. all of its
/// rows are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEnd {
    pub container: ContainerId,
    pub item: ItemId,
    #[serde(default)]
    pub outer: bool,
}

impl JoinEnd {
    pub fn new(container: ContainerId, item: ItemId) -> Self {
        Self {
            container,
            item,
            outer: false,
        }
    }

    pub fn outer(mut self) -> Self {
        self.outer = true;
        self
    }
}

/// The kind of SQL join an edge renders as, from the two outer flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinKind {
    pub fn from_flags(left_outer: bool, right_outer: bool) -> Self {
        match (left_outer, right_outer) {
            (true, true) => JoinKind::FullOuter,
            (true, false) => JoinKind::LeftOuter,
            (false, true) => JoinKind::RightOuter,
            (false, false) => JoinKind::Inner,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// An undirected pairing of two items from two distinct containers.
///
/// The left/right distinction only matters for the outer flags and for the
/// direction of the edge in the join graph (left endpoint to right endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub(crate) id: JoinId,
    pub(crate) left: JoinEnd,
    pub(crate) right: JoinEnd,
    #[serde(default)]
    pub(crate) comparator: Comparator,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

impl Join {
    /// An inner equi-join between `left` and `right`.
    pub fn new(left: JoinEnd, right: JoinEnd) -> Self {
        Self {
            id: JoinId::new(),
            left,
            right,
            comparator: Comparator::Eq,
            name: None,
        }
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_left_outer(mut self, outer: bool) -> Self {
        self.left.outer = outer;
        self
    }

    pub fn with_right_outer(mut self, outer: bool) -> Self {
        self.right.outer = outer;
        self
    }

    pub fn id(&self) -> JoinId {
        self.id
    }

    pub fn left(&self) -> &JoinEnd {
        &self.left
    }

    pub fn right(&self) -> &JoinEnd {
        &self.right
    }

    pub fn end(&self, side: JoinSide) -> &JoinEnd {
        match side {
            JoinSide::Left => &self.left,
            JoinSide::Right => &self.right,
        }
    }

    pub(crate) fn end_mut(&mut self, side: JoinSide) -> &mut JoinEnd {
        match side {
            JoinSide::Left => &mut self.left,
            JoinSide::Right => &mut self.right,
        }
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_left_outer(&self) -> bool {
        self.left.outer
    }

    pub fn is_right_outer(&self) -> bool {
        self.right.outer
    }

    pub fn kind(&self) -> JoinKind {
        JoinKind::from_flags(self.left.outer, self.right.outer)
    }

    /// Which side of this join `container` sits on, if any.
    pub fn side_of(&self, container: ContainerId) -> Option<JoinSide> {
        if self.left.container == container {
            Some(JoinSide::Left)
        } else if self.right.container == container {
            Some(JoinSide::Right)
        } else {
            None
        }
    }

    /// Does this join touch `container` on either side?
    pub fn touches(&self, container: ContainerId) -> bool {
        self.side_of(container).is_some()
    }

    /// Does this join connect `a` and `b` (in either direction)?
    pub fn connects(&self, a: ContainerId, b: ContainerId) -> bool {
        (self.left.container == a && self.right.container == b)
            || (self.left.container == b && self.right.container == a)
    }

    /// The container on the other side from `container`.
    pub fn other_container(&self, container: ContainerId) -> Option<ContainerId> {
        self.side_of(container)
            .map(|side| self.end(side.opposite()).container)
    }

    /// Does either endpoint reference `item`?
    pub fn references_item(&self, item: ItemId) -> bool {
        self.left.item == item || self.right.item == item
    }
}
