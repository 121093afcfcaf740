//! Lookup operators accepted in filter triples and their wire suffixes.
//!
//! The table is closed: a symbol that is not listed here is rejected with
//! `ApiError::UnknownOperator`, never ignored.

use crate::error::{ApiError, Result};

/// Every accepted operator symbol paired with the suffix appended to the
/// field name on the wire.
pub const OPERATORS: &[(&str, &str)] = &[
    ("=", "="),
    ("is", "="),
    ("in", "__in"),
    (">", "__gt"),
    (">=", "__gte"),
    ("<", "__lt"),
    ("<=", "__lte"),
    ("isnull", "__isnull"),
    ("range", "__range"),
    ("exact", "__exact"),
    ("iexact", "__iexact"),
    ("contains", "__contains"),
    ("icontains", "__icontains"),
    ("startswith", "__startswith"),
    ("istartswith", "__istartswith"),
    ("endswith", "__endswith"),
    ("iendswith", "__iendswith"),
    ("regex", "__regex"),
    ("iregex", "__iregex"),
    ("year", "__year"),
    ("iso_year", "__iso_year"),
    ("month", "__month"),
    ("day", "__day"),
    ("week", "__week"),
    ("week_day", "__week_day"),
    ("quarter", "__quarter"),
    ("time", "__time"),
    ("hour", "__hour"),
    ("minute", "__minute"),
    ("second", "__second"),
];

/// Wire suffix for `symbol`.
pub fn suffix(symbol: &str) -> Result<&'static str> {
    OPERATORS
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, suffix)| *suffix)
        .ok_or_else(|| ApiError::UnknownOperator(symbol.to_string()))
}

/// Equality operators are expressed as a bare field key when used alone.
pub fn is_equality(symbol: &str) -> bool {
    matches!(symbol, "=" | "is")
}
