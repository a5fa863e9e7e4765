//! SQL Server dialect (Microsoft and jTDS drivers).
//!
//! SQL Server has no `CURRENT_TIME`/`CURRENT_DATE` niladic functions; both
//! derive from `GETDATE()`.

use super::helpers;
use super::SqlDialect;

const CONSTANTS: [(&str, &str); 3] = [
    ("current_time", "GETDATE()"),
    ("current_date", "CAST(GETDATE() AS DATE)"),
    ("user", "SUSER_SNAME()"),
];

/// SQL Server dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlServer;

impl SqlDialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        &["sqlserver", "jtds"]
    }

    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        helpers::lookup_constant(&CONSTANTS, constant)
    }
}
