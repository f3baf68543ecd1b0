//! Constraint values and entity field access.
//!
//! Entities are plain [`serde_json::Value`] documents. The [`Operand`] enum is
//! the owned constraint side of a condition: a JSON literal, a compiled
//! pattern, or a matcher function.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::Result;

/// Callable constraint, invoked with the entity's property value.
///
/// The argument is `None` when the property path is missing.
pub type Matcher = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// Owned constraint value stored in a condition.
///
/// # Example
///
/// ```
/// use quarry::Operand;
/// use serde_json::json;
///
/// let literal: Operand = 42.into();
/// assert_eq!(literal.as_literal(), Some(&json!(42)));
///
/// let adult = Operand::func(|v| v.and_then(|v| v.as_u64()).is_some_and(|age| age >= 18));
/// assert!(adult.is_func());
/// ```
#[derive(Clone)]
pub enum Operand {
    /// A JSON literal, compared by strict equality or natural ordering.
    Literal(Value),
    /// A pattern tested against the stringified property value.
    Pattern(Regex),
    /// A matcher function whose result is used verbatim.
    Func(Matcher),
}

impl Operand {
    /// Wraps a closure as a matcher operand.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Operand::Func(Arc::new(f))
    }

    /// Compiles a pattern operand.
    ///
    /// Returns an error if the pattern is invalid.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Operand::Pattern(Regex::new(pattern)?))
    }

    /// Returns the literal value, if this is a literal.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Operand::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` if this is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }

    /// Returns `true` if this is a pattern.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Operand::Pattern(_))
    }

    /// Returns `true` if this is a matcher function.
    pub fn is_func(&self) -> bool {
        matches!(self, Operand::Func(_))
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Operand::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Operand::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Literals compare by JSON value, patterns by source text and functions by
/// identity.
impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operand::Literal(a), Operand::Literal(b)) => a == b,
            (Operand::Pattern(a), Operand::Pattern(b)) => a.as_str() == b.as_str(),
            (Operand::Func(a), Operand::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

impl From<Regex> for Operand {
    fn from(r: Regex) -> Self {
        Operand::Pattern(r)
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Literal(Value::from(s))
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Literal(Value::from(s))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Literal(Value::from(b))
    }
}

macro_rules! literal_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand {
                fn from(n: $t) -> Self {
                    Operand::Literal(Value::from(n))
                }
            }
        )*
    };
}

literal_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::Literal(Value::Array(items.into_iter().map(Into::into).collect()))
    }
}

/// Looks up a dotted path on an entity.
///
/// Object segments are field names, array segments are indices. Returns
/// `None` as soon as a segment is missing.
///
/// ```
/// use quarry::lookup;
/// use serde_json::json;
///
/// let entity = json!({"user": {"tags": ["a", "b"]}});
/// assert_eq!(lookup(&entity, "user.tags.1"), Some(&json!("b")));
/// assert_eq!(lookup(&entity, "user.age"), None);
/// ```
pub fn lookup<'a>(entity: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = entity;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Reads a JSON number as a non-negative count.
///
/// Accepts unsigned integers and finite, non-negative floats with no
/// fractional part, so `1.0` reads as `1`.
pub fn as_count(value: &Value) -> Option<usize> {
    let n = match value.as_u64() {
        Some(n) => n,
        None => {
            let f = value.as_f64()?;
            if !f.is_finite() || f < 0.0 || f.fract() != 0.0 {
                return None;
            }
            f as u64
        }
    };
    Some(usize::try_from(n).unwrap_or(usize::MAX))
}

/// Strict equality between two JSON values.
///
/// Numbers compare by numeric value regardless of their integer or float
/// representation; arrays and objects compare structurally.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| strict_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Stringifies a property value the way a dynamic host would before a
/// pattern test: a missing value is `"undefined"`, arrays join their
/// elements with commas and objects collapse to `"[object Object]"`.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 {
                return format!("{f:.0}");
            }
            return f.to_string();
        }
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operand_kind_checks() {
        assert!(Operand::from("test").is_literal());
        assert!(Operand::pattern("^a").unwrap().is_pattern());
        assert!(Operand::func(|_| true).is_func());
        assert!(Operand::pattern("(").is_err());
    }

    #[test]
    fn operand_conversions() {
        assert_eq!(Operand::from(5u8), Operand::Literal(json!(5)));
        assert_eq!(Operand::from(-5i64), Operand::Literal(json!(-5)));
        assert_eq!(Operand::from(2.5f64), Operand::Literal(json!(2.5)));
        assert_eq!(Operand::from(true), Operand::Literal(json!(true)));
        assert_eq!(
            Operand::from(vec!["dev", "js"]),
            Operand::Literal(json!(["dev", "js"]))
        );
        assert_eq!(Operand::from(json!({"a": 1})), Operand::Literal(json!({"a": 1})));
    }

    #[test]
    fn operand_equality() {
        let f = Operand::func(|_| true);
        assert_eq!(f.clone(), f);
        assert_ne!(f, Operand::func(|_| true));
        assert_eq!(Operand::pattern("^a").unwrap(), Operand::pattern("^a").unwrap());
        assert_ne!(Operand::from("^a"), Operand::pattern("^a").unwrap());
    }

    #[test]
    fn operand_debug() {
        assert_eq!(format!("{:?}", Operand::func(|_| false)), "Func(..)");
        assert_eq!(
            format!("{:?}", Operand::pattern("x+").unwrap()),
            "Pattern(\"x+\")"
        );
    }

    #[test]
    fn lookup_paths() {
        let entity = json!({"name": "Alice", "address": {"city": "Paris"}, "tags": ["x", "y"]});
        assert_eq!(lookup(&entity, "name"), Some(&json!("Alice")));
        assert_eq!(lookup(&entity, "address.city"), Some(&json!("Paris")));
        assert_eq!(lookup(&entity, "tags.0"), Some(&json!("x")));
        assert_eq!(lookup(&entity, "tags.9"), None);
        assert_eq!(lookup(&entity, "tags.first"), None);
        assert_eq!(lookup(&entity, "name.length"), None);
        assert_eq!(lookup(&entity, "missing.deeper"), None);
    }

    #[test]
    fn counts_from_integers_and_integral_floats() {
        assert_eq!(as_count(&json!(3)), Some(3));
        assert_eq!(as_count(&json!(3.0)), Some(3));
        assert_eq!(as_count(&json!(0.0)), Some(0));
        assert_eq!(as_count(&json!(3.5)), None);
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_count(&json!(-1.0)), None);
        assert_eq!(as_count(&json!("3")), None);
    }

    #[test]
    fn strict_eq_numbers_and_structures() {
        assert!(strict_eq(&json!(5), &json!(5)));
        assert!(strict_eq(&json!(5), &json!(5.0)));
        assert!(!strict_eq(&json!(5), &json!("5")));
        assert!(strict_eq(&json!([1, {"a": 2}]), &json!([1.0, {"a": 2}])));
        assert!(!strict_eq(&json!([1, 2]), &json!([2, 1])));
        assert!(!strict_eq(&json!(null), &json!(false)));
    }

    #[test]
    fn stringify_like_a_dynamic_host() {
        assert_eq!(stringify(None), "undefined");
        assert_eq!(stringify(Some(&json!(null))), "null");
        assert_eq!(stringify(Some(&json!(true))), "true");
        assert_eq!(stringify(Some(&json!(42))), "42");
        assert_eq!(stringify(Some(&json!(42.0))), "42");
        assert_eq!(stringify(Some(&json!(2.5))), "2.5");
        assert_eq!(stringify(Some(&json!("hi"))), "hi");
        assert_eq!(stringify(Some(&json!(["a", null, 1]))), "a,,1");
        assert_eq!(stringify(Some(&json!({"a": 1}))), "[object Object]");
    }
}
