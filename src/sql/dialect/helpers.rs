//! Shared helper functions for dialect implementations.

/// Rendered text of the synthetic count-star item.
pub const COUNT_STAR: &str = "COUNT(*)";

// =============================================================================
// Driver matching
// =============================================================================

/// Case-insensitive substring match of `driver` against any marker.
pub fn driver_matches(driver: &str, markers: &[&str]) -> bool {
    let driver = driver.to_lowercase();
    markers.iter().any(|m| driver.contains(m))
}

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Wrap `ident` in the quote string reported by the connection, doubling
/// any embedded quote. A blank quote leaves the identifier bare.
pub fn quote_with(ident: &str, quote: &str) -> String {
    if quote.trim().is_empty() {
        return ident.to_string();
    }
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", ident.replace(quote, &doubled))
}

// =============================================================================
// Constant Remapping
// =============================================================================

/// Look a built-in constant up in a dialect's spelling table, ignoring case
/// and surrounding whitespace.
pub fn lookup_constant(table: &[(&str, &'static str)], constant: &str) -> Option<&'static str> {
    let constant = constant.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(constant))
        .map(|(_, spelling)| *spelling)
}
