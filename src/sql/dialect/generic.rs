//! Fallback dialect for unrecognised or absent drivers.

use super::SqlDialect;

/// Passes every constant through as typed.
#[derive(Debug, Clone, Copy)]
pub struct Generic;

impl SqlDialect for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn driver_markers(&self) -> &'static [&'static str] {
        &[]
    }
}
