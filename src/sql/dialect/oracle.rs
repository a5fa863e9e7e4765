//! Oracle dialect.

use super::helpers;
use super::SqlDialect;

const CONSTANTS: [(&str, &str); 3] = [
    ("current_time", "SYSTIMESTAMP"),
    ("current_date", "SYSDATE"),
    ("user", "USER"),
];

/// Oracle dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        &["oracle"]
    }

    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        helpers::lookup_constant(&CONSTANTS, constant)
    }
}
