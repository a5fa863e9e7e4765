//! PostgreSQL dialect.

use super::helpers;
use super::SqlDialect;

const CONSTANTS: [(&str, &str); 3] = [
    ("current_time", "LOCALTIME"),
    ("current_date", "CURRENT_DATE"),
    ("user", "CURRENT_USER"),
];

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        &["postgres"]
    }

    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        helpers::lookup_constant(&CONSTANTS, constant)
    }
}
