//! MySQL dialect.
//!
//! MySQL spells the niladic functions with parentheses.

use super::helpers;
use super::SqlDialect;

const CONSTANTS: [(&str, &str); 3] = [
    ("current_time", "CURTIME()"),
    ("current_date", "CURDATE()"),
    ("user", "CURRENT_USER()"),
];

/// MySQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        &["mysql"]
    }

    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        helpers::lookup_constant(&CONSTANTS, constant)
    }
}
