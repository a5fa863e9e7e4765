//! SQL generation.
//!
//! - [`generate`] - SELECT statement generation from a query model
//! - [`graph`] - join-graph traversal shared by generation and cross-join detection
//! - [`token`] - token types for SQL output
//! - [`dialect`] - dialect constant resolution

pub mod dialect;
pub mod generate;
pub mod graph;
pub mod token;


pub use dialect::{Dialect, SqlDialect};
pub use generate::{contains_cross_joins, SqlGenerator};
pub use graph::{finish_order, JoinGraph};
pub use token::{Token, TokenStream};
