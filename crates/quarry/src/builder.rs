//! Fluent condition builder.
//!
//! The [`Builder`] accumulates per-field conditions and groups them into a
//! declarative [`Document`] on [`Builder::build`].
//!
//! Grouping is a small state machine. The pending condition is one of
//! [`Empty`](Pending::Empty), [`Single`](Pending::Single) or
//! [`OrGroup`](Pending::OrGroup), and the mode is AND or OR:
//!
//! ```text
//! field(f)          pending -> records, mode := AND, active := f
//! cond, AND mode    pending -> records, pending := Single(cond)
//! cond, OR mode     Empty       -> OrGroup[cond]
//!                   Single(c)   -> OrGroup[c, cond]
//!                   OrGroup[bs] -> OrGroup[bs.., cond]
//! build()           pending + records grouped by field:
//!                   one record -> itself, several -> $and[records..]
//! ```

use regex::Regex;
use serde_json::Value;

use crate::document::{Condition, Document, Entry};
use crate::error::Result;
use crate::op::{is_tag, Directive, Logic, Op};
use crate::value::Operand;

/// A condition bound to the field it was declared on.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The field the condition applies to.
    pub field: String,
    /// The condition itself.
    pub condition: Condition,
}

/// The condition currently being assembled.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Pending {
    /// Nothing pending.
    #[default]
    Empty,
    /// One condition, flushed as-is.
    Single(Record),
    /// An OR group under construction.
    OrGroup {
        field: String,
        branches: Vec<Condition>,
    },
}

impl Pending {
    fn to_record(&self) -> Option<Record> {
        match self {
            Pending::Empty => None,
            Pending::Single(record) => Some(record.clone()),
            Pending::OrGroup { field, branches } => Some(Record {
                field: field.clone(),
                condition: Condition::or(branches.clone()),
            }),
        }
    }

    fn into_record(self) -> Option<Record> {
        match self {
            Pending::Empty => None,
            Pending::Single(record) => Some(record),
            Pending::OrGroup { field, branches } => Some(Record {
                field,
                condition: Condition::or(branches),
            }),
        }
    }
}

/// Fluent builder for declarative queries.
///
/// # Example
///
/// ```
/// use quarry::{Builder, Condition, Document};
///
/// let doc = Builder::new()
///     .field("age").gt(20).and().lt(30)
///     .field("name").equals("Alice").or().equals("Bob")
///     .build();
///
/// let expected = Document::new()
///     .with_condition("age", Condition::and(vec![
///         Condition::op("$gt", 20),
///         Condition::op("$lt", 30),
///     ]))
///     .with_condition("name", Condition::or(vec![
///         Condition::eq("Alice"),
///         Condition::eq("Bob"),
///     ]));
///
/// assert_eq!(doc, expected);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    base: Document,
    records: Vec<Record>,
    pending: Pending,
    field: Option<String>,
    mode: Logic,
}

impl Builder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Builder::default()
    }

    /// Creates a builder seeded with a base query.
    pub fn from_document(doc: Document) -> Self {
        Builder::new().set_query(doc)
    }

    // ========================================================================
    // Base query
    // ========================================================================

    /// Merges a declarative query into the base query.
    ///
    /// Directive keys are kept untouched. A pre-built condition replays as
    /// `field(key)` followed by one condition per operator. A shorthand value
    /// is wrapped as an `$eq` condition.
    pub fn set_query(mut self, doc: Document) -> Self {
        for (key, entry) in doc {
            if is_tag(&key) {
                self.base.insert(key, entry);
                continue;
            }
            match entry {
                Entry::Condition(condition) => {
                    self = self.field(key.as_str());
                    match &condition {
                        Condition::Ops(ops) => {
                            for (tag, value) in ops {
                                self = self.add_condition(tag.as_str(), value.clone());
                            }
                        }
                        Condition::Group(..) => self = self.push(condition.clone()),
                    }
                    self.base.insert(key, Entry::Condition(condition));
                }
                Entry::Value(value) => {
                    self.base.insert(key, Entry::Condition(Condition::eq(value)));
                }
            }
        }
        self
    }

    // ========================================================================
    // Field selection and grouping mode
    // ========================================================================

    /// Starts conditions on `field`.
    ///
    /// Flushes the pending condition and resets the grouping mode to AND.
    pub fn field(mut self, field: &str) -> Self {
        self.flush();
        self.mode = Logic::And;
        self.field = Some(field.to_string());
        self
    }

    /// Groups the next condition with the pending one under OR.
    pub fn or(mut self) -> Self {
        self.mode = Logic::Or;
        self
    }

    /// Makes the next condition a sibling of the pending one (AND).
    pub fn and(mut self) -> Self {
        self.mode = Logic::And;
        self
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    /// Adds an equality condition.
    pub fn equals(self, value: impl Into<Operand>) -> Self {
        self.op(Op::Eq, value)
    }

    /// Adds a greater-than condition.
    pub fn gt(self, value: impl Into<Operand>) -> Self {
        self.op(Op::Gt, value)
    }

    /// Adds a greater-than-or-equal condition.
    pub fn gte(self, value: impl Into<Operand>) -> Self {
        self.op(Op::Gte, value)
    }

    /// Adds a less-than condition.
    pub fn lt(self, value: impl Into<Operand>) -> Self {
        self.op(Op::Lt, value)
    }

    /// Adds a less-than-or-equal condition.
    pub fn lte(self, value: impl Into<Operand>) -> Self {
        self.op(Op::Lte, value)
    }

    /// Adds an "in" condition: the value must be one of `values`.
    pub fn is_in(self, values: impl Into<Operand>) -> Self {
        self.op(Op::In, values)
    }

    /// Adds a "not in" condition: the value must be none of `values`.
    pub fn not_in(self, values: impl Into<Operand>) -> Self {
        self.op(Op::Nin, values)
    }

    /// Adds an "all" condition: the array value must contain every one of `values`.
    pub fn all(self, values: impl Into<Operand>) -> Self {
        self.op(Op::All, values)
    }

    /// Adds an equality condition tested as a pattern on the stringified value.
    ///
    /// Returns an error if the pattern is invalid.
    pub fn matches(self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(self.op(Op::Eq, regex))
    }

    /// Adds an equality condition decided by `f`.
    pub fn satisfies<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.op(Op::Eq, Operand::func(f))
    }

    /// Adds a condition for a built-in operator.
    pub fn op(self, op: Op, value: impl Into<Operand>) -> Self {
        self.add_condition(op.as_tag(), value)
    }

    /// Adds a condition for any operator tag, including custom ones.
    pub fn add_condition(self, tag: &str, value: impl Into<Operand>) -> Self {
        self.push(Condition::op(tag, value))
    }

    fn push(mut self, condition: Condition) -> Self {
        let Some(field) = self.field.clone() else {
            tracing::warn!(?condition, "condition added before any field was selected; ignored");
            return self;
        };

        match self.mode {
            Logic::And => {
                self.flush();
                self.pending = Pending::Single(Record { field, condition });
            }
            Logic::Or => {
                self.pending = match std::mem::take(&mut self.pending) {
                    Pending::Empty => Pending::OrGroup {
                        field,
                        branches: vec![condition],
                    },
                    Pending::Single(Record {
                        field,
                        condition: Condition::Group(Logic::Or, mut branches),
                    }) => {
                        branches.push(condition);
                        Pending::OrGroup { field, branches }
                    }
                    Pending::Single(record) => Pending::OrGroup {
                        field: record.field,
                        branches: vec![record.condition, condition],
                    },
                    Pending::OrGroup {
                        field,
                        mut branches,
                    } => {
                        branches.push(condition);
                        Pending::OrGroup { field, branches }
                    }
                };
            }
        }
        self
    }

    fn flush(&mut self) {
        if let Some(record) = std::mem::take(&mut self.pending).into_record() {
            self.records.push(record);
        }
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Sets a directive on the base query.
    pub fn add_transform(mut self, tag: &str, value: impl Into<Operand>) -> Self {
        self.base.insert(tag, Entry::Value(value.into()));
        self
    }

    /// Stops the scan once `n` matches are collected.
    pub fn limit(self, n: usize) -> Self {
        self.add_transform(Directive::Limit.as_tag(), n)
    }

    /// Drops the first `n` results.
    pub fn skip(self, n: usize) -> Self {
        self.add_transform(Directive::Skip.as_tag(), n)
    }

    /// Sorts results by `key`; a leading `-` sorts descending.
    pub fn sort(self, key: &str) -> Self {
        self.add_transform(Directive::Sort.as_tag(), key)
    }

    /// Projects results to the given fields.
    pub fn select<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.add_transform(Directive::Select.as_tag(), fields)
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Builds the declarative query.
    ///
    /// Conditions are grouped by field; a field with several conditions gets
    /// an `$and` group. Built fields overwrite base entries of the same name.
    /// The builder is left untouched and can keep accumulating.
    pub fn build(&self) -> Document {
        let mut grouped: Vec<(String, Vec<Condition>)> = Vec::new();
        let pending = self.pending.to_record();
        for record in self.records.iter().chain(pending.as_ref()) {
            match grouped.iter_mut().find(|(field, _)| *field == record.field) {
                Some((_, conditions)) => conditions.push(record.condition.clone()),
                None => grouped.push((record.field.clone(), vec![record.condition.clone()])),
            }
        }

        let mut doc = self.base.clone();
        for (field, mut conditions) in grouped {
            let condition = if conditions.len() == 1 {
                conditions.remove(0)
            } else {
                Condition::and(conditions)
            };
            doc.insert(field, Entry::Condition(condition));
        }
        doc
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns the base query accumulated by [`set_query`](Self::set_query)
    /// and the transform setters.
    pub fn base(&self) -> &Document {
        &self.base
    }

    /// Returns the flushed condition records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the pending condition state.
    pub fn pending(&self) -> &Pending {
        &self.pending
    }

    /// Returns the active field, if one was selected.
    pub fn active_field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the grouping mode for the next condition.
    pub fn mode(&self) -> Logic {
        self.mode
    }
}
