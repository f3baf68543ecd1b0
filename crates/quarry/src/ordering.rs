//! Natural ordering of JSON values and sort keys.
//!
//! Provides [`Dir`] for sort direction and [`SortKey`] for field-based
//! ordering, parsed from the `$sort` directive's `"field"` / `"-field"` form.

use std::cmp::Ordering;

use serde_json::Value;

use crate::value::lookup;

/// Marker requesting descending order when it prefixes a sort field.
pub const DESC_MARKER: char = '-';

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }
}

/// A single ordering key: a dotted field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// The field path to sort by.
    pub path: String,
    /// The sort direction.
    pub dir: Dir,
}

impl SortKey {
    /// Creates a new ascending key for the given path.
    pub fn asc(path: impl Into<String>) -> Self {
        SortKey {
            path: path.into(),
            dir: Dir::Asc,
        }
    }

    /// Creates a new descending key for the given path.
    pub fn desc(path: impl Into<String>) -> Self {
        SortKey {
            path: path.into(),
            dir: Dir::Desc,
        }
    }

    /// Parses `"field"` (ascending) or `"-field"` (descending).
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix(DESC_MARKER) {
            Some(path) => SortKey::desc(path),
            None => SortKey::asc(spec),
        }
    }

    /// Compares two entities on this key.
    ///
    /// Missing and null values sort last in either direction. Returns `None`
    /// if the values cannot be compared (type mismatch or NaN).
    pub fn compare(&self, a: &Value, b: &Value) -> Option<Ordering> {
        let a = lookup(a, &self.path).filter(|v| !v.is_null());
        let b = lookup(b, &self.path).filter(|v| !v.is_null());
        match (a, b) {
            (Some(a), Some(b)) => Some(self.dir.apply(compare_values(a, b)?)),
            _ => compare_fields(a, b),
        }
    }
}

/// Compares two JSON values of the same kind.
///
/// Numbers compare numerically, strings lexicographically and booleans with
/// `false < true`. Returns `None` for mismatched kinds, NaN, arrays and
/// objects.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            },
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Compares two looked-up field values for sorting.
///
/// Missing and null values sort last; otherwise defers to [`compare_values`].
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Some(Ordering::Equal),
        (None, Some(_)) => Some(Ordering::Greater),
        (Some(_), None) => Some(Ordering::Less),
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

/// Compares two entities using a list of sort keys.
///
/// Uses the first key as the primary sort key, the second to break ties, etc.
/// If all keys compare equal, returns `Equal`.
pub fn compare_by_keys(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        if let Some(ordering) = key.compare(a, b) {
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        // If comparison failed (type mismatch/NaN), treat as equal and continue
    }
    Ordering::Equal
}
