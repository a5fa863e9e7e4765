//! Dialect constant resolution.
//!
//! Real columns render the same way everywhere: the column name wrapped in
//! the connection's identifier quote. Constants are where databases differ.
//! A user picking "current time" expects `GETDATE()` on SQL Server and
//! `LOCALTIME` on PostgreSQL, so each dialect maps the built-in constant
//! placeholders to its own spelling.
//!
//! The dialect is chosen from the data source's driver identifier by a
//! case-insensitive substring match, once per generation call:
//!
//! | Dialect     | Driver contains         |
//! |-------------|-------------------------|
//! | `SqlServer` | `sqlserver`, `jtds`     |
//! | `Postgres`  | `postgres`              |
//! | `MySql`     | `mysql`                 |
//! | `Oracle`    | `oracle`                |
//! | `Generic`   | anything else, or none  |
//!
//! # Usage
//!
//! ```
//! use quarry::model::Item;
//! use quarry::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::from_driver(Some("com.microsoft.sqlserver.jdbc.SQLServerDriver"));
//! assert_eq!(dialect, Dialect::SqlServer);
//! assert_eq!(dialect.resolve_item(&Item::constant("current_time"), ""), "GETDATE()");
//! ```

mod generic;
pub mod helpers;
mod mysql;
mod oracle;
mod postgres;
mod sqlserver;

pub use generic::Generic;
pub use mysql::MySql;
pub use oracle::Oracle;
pub use postgres::Postgres;
pub use sqlserver::SqlServer;

use std::fmt;

use crate::model::{Item, ItemKind};

/// How a database family spells items.
///
/// The default implementations pass constants through unchanged and wrap
/// column names in the quote string.
pub trait SqlDialect: fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Lower-case fragments of the driver identifiers this dialect serves.
    fn driver_markers(&self) -> &'static [&'static str];

    /// Does the driver identifier select this dialect?
    fn matches_driver(&self, driver: &str) -> bool {
        helpers::driver_matches(driver, self.driver_markers())
    }

    /// Dialect spelling of a constant, or `None` to keep the constant text.
    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        let _ = constant;
        None
    }

    /// Wrap an identifier in `quote`. A blank quote leaves it bare.
    fn quote_identifier(&self, ident: &str, quote: &str) -> String {
        helpers::quote_with(ident, quote)
    }

    /// Rendered name of an item, without any table qualifier.
    fn resolve_item(&self, item: &Item, quote: &str) -> String {
        match item.kind() {
            ItemKind::Column => self.quote_identifier(item.name(), quote),
            ItemKind::Constant => self
                .resolve_constant(item.name())
                .map(str::to_string)
                .unwrap_or_else(|| item.name().to_string()),
            ItemKind::CountStar => helpers::COUNT_STAR.to_string(),
        }
    }
}

/// Supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Generic,
    SqlServer,
    Postgres,
    MySql,
    Oracle,
}

impl Dialect {
    /// Dialects tried, in order, when matching a driver identifier.
    pub const MATCHED: [Dialect; 4] = [
        Dialect::SqlServer,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Oracle,
    ];

    /// Pick the dialect for a driver identifier. No identifier, or one no
    /// dialect recognises, selects [`Dialect::Generic`].
    pub fn from_driver(driver: Option<&str>) -> Dialect {
        let Some(driver) = driver else {
            return Dialect::Generic;
        };
        let dialect = Dialect::MATCHED
            .into_iter()
            .find(|d| d.matches_driver(driver))
            .unwrap_or_default();
        tracing::trace!(driver, dialect = dialect.name(), "resolved dialect");
        dialect
    }

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Generic => &Generic,
            Dialect::SqlServer => &SqlServer,
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::Oracle => &Oracle,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        self.dialect().driver_markers()
    }

    fn matches_driver(&self, driver: &str) -> bool {
        self.dialect().matches_driver(driver)
    }

    fn resolve_constant(&self, constant: &str) -> Option<&'static str> {
        self.dialect().resolve_constant(constant)
    }

    fn quote_identifier(&self, ident: &str, quote: &str) -> String {
        self.dialect().quote_identifier(ident, quote)
    }

    fn resolve_item(&self, item: &Item, quote: &str) -> String {
        self.dialect().resolve_item(item, quote)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
