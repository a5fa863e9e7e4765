//! Error types for query mutations.

use thiserror::Error;

use crate::model::{ContainerId, ItemId, JoinId};

/// Result type for query mutations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Rejections raised at mutation time.
///
/// All of these are programming errors on the caller's side; a rejected
/// mutation leaves the query unchanged. SQL generation itself never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A join does not fit the from-list or the join registry.
    #[error("join topology violation: {0}")]
    TopologyViolation(String),

    /// An argument was absent or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `end_compound_edit` called with no compound edit open.
    #[error("end_compound_edit called without a matching start_compound_edit")]
    UnbalancedCompoundEdit,

    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("unknown container: {0}")]
    UnknownContainer(ContainerId),

    #[error("unknown join: {0}")]
    UnknownJoin(JoinId),

    /// The constants pseudo-table cannot be added, removed or joined.
    #[error("operation not allowed on the constants container")]
    ConstantsContainer,

    #[error("container already in the from-list: {0}")]
    DuplicateContainer(ContainerId),
}

impl QueryError {
    pub fn topology(message: impl Into<String>) -> Self {
        Self::TopologyViolation(message.into())
    }

    /// Is this an error in the join graph's shape (as opposed to a bad handle)?
    pub fn is_topology_violation(&self) -> bool {
        matches!(self, Self::TopologyViolation(_))
    }
}
