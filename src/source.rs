//! Connection and dialect provider boundary.
//!
//! The engine never manages database connections itself. A [`DataSource`]
//! hands out a driver identifier (used to pick a [`Dialect`](crate::sql::Dialect))
//! and, on demand, a short-lived [`MetadataConnection`] from which exactly one
//! property is read: the identifier quote string.

use std::fmt;

use thiserror::Error;

/// Result type for data source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failure to reach or interrogate a data source.
///
/// These never escape SQL generation; the probe logs them and falls back to
/// unquoted identifiers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("cannot open connection: {0}")]
    Connect(String),

    #[error("cannot read connection metadata: {0}")]
    Metadata(String),

    /// The source has no live database behind it.
    #[error("data source is offline")]
    Offline,
}

/// A live connection, held only long enough to read metadata.
///
/// Dropping the connection closes it.
pub trait MetadataConnection {
    /// The string used to quote identifiers, e.g. `"` or `` ` ``. A blank
    /// string means identifiers are not quoted.
    fn identifier_quote(&mut self) -> SourceResult<String>;
}

/// Supplier of a driver identifier and short-lived connections.
pub trait DataSource: Send + Sync {
    /// Opaque driver identifier, e.g. `org.postgresql.Driver`.
    fn driver(&self) -> Option<&str>;

    fn connect(&self) -> SourceResult<Box<dyn MetadataConnection>>;
}

/// Open a connection, read its identifier quote and close it again.
///
/// Any failure is logged and yields the empty string; generation must not
/// fail because a database is unreachable.
pub fn probe_identifier_quote(source: &dyn DataSource) -> String {
    let probed = source.connect().and_then(|mut conn| conn.identifier_quote());
    match probed {
        Ok(quote) => {
            let quote = quote.trim().to_string();
            tracing::trace!(quote = %quote, "probed identifier quote");
            quote
        }
        Err(err) => {
            tracing::warn!(error = %err, driver = ?source.driver(), "identifier quote probe failed, using unquoted identifiers");
            String::new()
        }
    }
}

/// A data source with a fixed driver identifier and quote string.
///
/// Used by the CLI and in tests, where no live database is involved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSource {
    driver: Option<String>,
    quote: Option<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    /// Quote string reported by every connection. Without one, connecting
    /// fails with [`SourceError::Offline`].
    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = Some(quote.into());
        self
    }
}

struct StaticConnection {
    quote: String,
}

impl MetadataConnection for StaticConnection {
    fn identifier_quote(&mut self) -> SourceResult<String> {
        Ok(self.quote.clone())
    }
}

impl DataSource for StaticSource {
    fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    fn connect(&self) -> SourceResult<Box<dyn MetadataConnection>> {
        match &self.quote {
            Some(quote) => Ok(Box::new(StaticConnection {
                quote: quote.clone(),
            })),
            None => Err(SourceError::Offline),
        }
    }
}

/// Debug summary for a boxed source; only the driver is shown.
pub(crate) struct SourceSummary<'a>(pub(crate) &'a dyn DataSource);

impl fmt::Debug for SourceSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("driver", &self.0.driver())
            .finish()
    }
}
