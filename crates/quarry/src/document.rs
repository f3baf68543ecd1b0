//! Declarative query documents.
//!
//! A [`Document`] maps field names to conditions and directive tags to their
//! payloads, keeping insertion order:
//!
//! ```text
//! {
//!   "name":  "Alice",                                  shorthand equality
//!   "age":   {"$gte": 21},                             operator-tagged condition
//!   "city":  {"$or": [{"$eq": "Paris"}, {"$eq": "Oslo"}]},   grouped conditions
//!   "$sort": "-age"                                    directive
//! }
//! ```

use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::op::{is_tag, Logic, Op};
use crate::value::Operand;

/// A condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Operator tag / constraint pairs, e.g. `{"$gt": 20}`.
    Ops(Vec<(String, Operand)>),
    /// A `$and` / `$or` group of conditions on the same field.
    Group(Logic, Vec<Condition>),
}

impl Condition {
    /// Creates a single-operator condition.
    pub fn op(tag: impl Into<String>, value: impl Into<Operand>) -> Self {
        Condition::Ops(vec![(tag.into(), value.into())])
    }

    /// Creates an `$eq` condition.
    pub fn eq(value: impl Into<Operand>) -> Self {
        Condition::op(Op::Eq.as_tag(), value)
    }

    /// Creates a `$and` group.
    pub fn and(branches: Vec<Condition>) -> Self {
        Condition::Group(Logic::And, branches)
    }

    /// Creates a `$or` group.
    pub fn or(branches: Vec<Condition>) -> Self {
        Condition::Group(Logic::Or, branches)
    }

    /// Reads a JSON value as a condition.
    ///
    /// Returns `Ok(None)` when the value is not an object made only of
    /// `$`-prefixed keys, i.e. when it is a shorthand literal. An empty object
    /// is an (empty) condition.
    pub fn from_json(value: &Value) -> Result<Option<Condition>> {
        let map = match value {
            Value::Object(map) if map.keys().all(|k| is_tag(k)) => map,
            _ => return Ok(None),
        };

        if let Some((tag, logic)) = map
            .keys()
            .find_map(|k| Logic::from_tag(k).map(|logic| (k, logic)))
        {
            if map.len() > 1 {
                return Err(QueryError::InvalidDocument(format!(
                    "'{tag}' cannot be combined with other operators"
                )));
            }
            let branches = match &map[tag] {
                Value::Array(items) => items,
                _ => {
                    return Err(QueryError::InvalidDocument(format!(
                        "'{tag}' expects an array of conditions"
                    )))
                }
            };
            let branches = branches
                .iter()
                .map(|branch| -> Result<Condition> {
                    Ok(Condition::from_json(branch)?
                        .unwrap_or_else(|| Condition::eq(branch.clone())))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(Condition::Group(logic, branches)));
        }

        Ok(Some(Condition::Ops(
            map.iter()
                .map(|(tag, v)| (tag.clone(), Operand::Literal(v.clone())))
                .collect(),
        )))
    }
}

/// The value stored under a document key.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A shorthand value (field) or a directive payload.
    Value(Operand),
    /// An operator-tagged condition.
    Condition(Condition),
}

impl Entry {
    /// Returns the condition, if this entry is one.
    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Entry::Condition(c) => Some(c),
            Entry::Value(_) => None,
        }
    }
}

impl From<Operand> for Entry {
    fn from(v: Operand) -> Self {
        Entry::Value(v)
    }
}

impl From<Condition> for Entry {
    fn from(c: Condition) -> Self {
        Entry::Condition(c)
    }
}

/// An insertion-ordered declarative query.
///
/// # Example
///
/// ```
/// use quarry::{Condition, Document};
/// use serde_json::json;
///
/// let doc = Document::new()
///     .with_value("name", "Alice")
///     .with_condition("age", Condition::op("$gt", 26))
///     .with_value("$sort", "-age");
///
/// let same = Document::from_json(&json!({
///     "name": "Alice",
///     "age": {"$gt": 26},
///     "$sort": "-age",
/// }))
/// .unwrap();
///
/// assert_eq!(doc, same);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Entry)>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Reads a JSON object as a document.
    ///
    /// `$`-prefixed keys keep their value as a directive payload; objects made
    /// only of `$`-prefixed keys become conditions; everything else is a
    /// shorthand equality value.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            QueryError::InvalidDocument("a query document must be a JSON object".to_string())
        })?;

        let mut doc = Document::new();
        for (key, value) in map {
            let entry = if is_tag(key) {
                Entry::Value(Operand::Literal(value.clone()))
            } else {
                match Condition::from_json(value)? {
                    Some(condition) => Entry::Condition(condition),
                    None => Entry::Value(Operand::Literal(value.clone())),
                }
            };
            doc.insert(key.clone(), entry);
        }
        Ok(doc)
    }

    /// Inserts an entry.
    ///
    /// An existing key keeps its position and has its entry replaced; a new
    /// key is appended.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<Entry>) {
        let key = key.into();
        let entry = entry.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((key, entry)),
        }
    }

    /// Inserts a plain value, returning the document for chaining.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.insert(key, Entry::Value(value.into()));
        self
    }

    /// Inserts a condition, returning the document for chaining.
    pub fn with_condition(mut self, key: impl Into<String>, condition: Condition) -> Self {
        self.insert(key, Entry::Condition(condition));
        self
    }

    /// Returns the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Document {
    type Item = (String, Entry);
    type IntoIter = std::vec::IntoIter<(String, Entry)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
