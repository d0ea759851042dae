//! Geofence filter expressions.
//!
//! A partition is a child sheet whose filter selects the parent rows that
//! fall inside a stored polygon. The filter always has the canonical form
//!
//! ```text
//! IsInPolygon('<polygon id>',Lat,Long)
//! ```
//!
//! Decoding is case-insensitive; encoding always emits the casing above.

use once_cell::sync::Lazy;
use regex::Regex;

static POLYGON_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)IsInPolygon.'(.+)',Lat,Long").expect("valid polygon filter pattern")
});

/// Extract the polygon id from a filter expression.
///
/// Returns `None` when there is no filter or it is not a polygon membership
/// test. That is not an error: it just means the child is not a partition.
pub fn polygon_id_from_filter(filter: Option<&str>) -> Option<String> {
    let captures = POLYGON_FILTER.captures(filter?)?;
    captures.get(1).map(|m| m.as_str().to_string())
}

/// Build the filter expression that selects rows inside `polygon_id`.
///
/// The id is inserted verbatim, so it must not contain a single quote.
pub fn filter_for_polygon(polygon_id: &str) -> String {
    format!("IsInPolygon('{}',Lat,Long)", polygon_id)
}
