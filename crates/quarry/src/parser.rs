//! Declarative query parsing.
//!
//! The [`Parser`] normalizes a [`Document`] into a [`ParseConfig`]: an
//! AND-rooted [`Node`] tree, the fields and operators it touches, and the
//! directives found at the top level.

use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::ast::Node;
use crate::document::{Condition, Document, Entry};
use crate::error::{QueryError, Result};
use crate::op::{is_tag, node_name, transform_name, Directive, Op};
use crate::value::{as_count, Operand};

/// One operator occurrence recorded while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorUse {
    /// The operator tag as written, e.g. `$gt`.
    pub op: String,
    /// Its constraint.
    pub value: Operand,
}

/// Directive payloads keyed by transform name, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transforms {
    entries: Vec<(String, Value)>,
}

impl Transforms {
    /// Creates an empty set of transforms.
    pub fn new() -> Self {
        Transforms::default()
    }

    /// Sets a transform payload, keeping the position of an existing name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the payload of a transform.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates transforms in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterates transform names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of transforms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no transforms.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the scan limit.
    ///
    /// A missing, zero or non-count `limit` means no limit.
    pub fn limit(&self) -> Option<usize> {
        self.get(Directive::Limit.as_name())
            .and_then(as_count)
            .filter(|n| *n > 0)
    }
}

/// The result of parsing a declarative query.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseConfig {
    /// AND-rooted predicate tree.
    pub ast: Node,
    /// Fields touched by conditions, first occurrence first.
    pub fields: Vec<String>,
    /// Operators used by conditions, in visit order.
    pub operators: Vec<OperatorUse>,
    /// Top-level directives.
    pub transforms: Transforms,
}

impl ParseConfig {
    /// Returns the scan limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.transforms.limit()
    }
}

/// Parses declarative queries, memoizing the first result.
///
/// Once [`parse`](Parser::parse) has succeeded, every later call returns the
/// same configuration whatever document it is given. Use a fresh parser per
/// query, or [`parse_query`](Parser::parse_query) for a non-caching parse.
///
/// # Example
///
/// ```
/// use quarry::{Document, Node, Parser};
/// use serde_json::json;
///
/// let doc = Document::from_json(&json!({"name": {"$eq": "Alice"}})).unwrap();
/// let parser = Parser::new();
/// let config = parser.parse(&doc).unwrap();
///
/// assert_eq!(config.ast, Node::And(vec![Node::leaf("EQ", "name", "Alice")]));
/// assert_eq!(config.fields, vec!["name".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    parsed: OnceCell<ParseConfig>,
}

impl Parser {
    /// Creates a parser with an empty cache.
    pub fn new() -> Self {
        Parser::default()
    }

    /// Parses `doc`, or returns the configuration cached by an earlier call.
    pub fn parse(&self, doc: &Document) -> Result<&ParseConfig> {
        self.parse_with(doc, |_| {})
    }

    /// Like [`parse`](Self::parse), letting `prepare` adjust the fresh
    /// configuration before it is cached. `prepare` is not called on a cache hit.
    pub fn parse_with<F>(&self, doc: &Document, prepare: F) -> Result<&ParseConfig>
    where
        F: FnOnce(&mut ParseConfig),
    {
        self.parsed.get_or_try_init(|| {
            let mut config = self.parse_query(doc)?;
            prepare(&mut config);
            Ok(config)
        })
    }

    /// Returns the cached configuration, if `parse` has succeeded.
    pub fn parsed(&self) -> Option<&ParseConfig> {
        self.parsed.get()
    }

    /// Parses `doc` without touching the cache.
    pub fn parse_query(&self, doc: &Document) -> Result<ParseConfig> {
        let mut state = ParseState::default();
        let mut children = Vec::new();

        for (key, entry) in doc.iter() {
            if is_tag(key) {
                match entry {
                    Entry::Value(Operand::Literal(value)) => {
                        state.transforms.insert(transform_name(key), value.clone());
                    }
                    _ => {
                        return Err(QueryError::InvalidDirective {
                            name: key.to_string(),
                        })
                    }
                }
                continue;
            }

            let node = match entry {
                Entry::Condition(condition) => state.visit(key, condition)?,
                Entry::Value(value) => state.leaf(key, Op::Eq.as_tag(), value),
            };
            children.push(node);
        }

        let config = ParseConfig {
            ast: Node::And(children),
            fields: state.fields,
            operators: state.operators,
            transforms: state.transforms,
        };
        tracing::debug!(
            fields = ?config.fields,
            operators = config.operators.len(),
            transforms = ?config.transforms.names().collect::<Vec<_>>(),
            "parsed query"
        );
        Ok(config)
    }
}

#[derive(Default)]
struct ParseState {
    fields: Vec<String>,
    operators: Vec<OperatorUse>,
    transforms: Transforms,
}

impl ParseState {
    fn visit(&mut self, key: &str, condition: &Condition) -> Result<Node> {
        match condition {
            Condition::Group(logic, branches) => {
                let children = branches
                    .iter()
                    .map(|branch| self.visit(key, branch))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Node::group(*logic, children))
            }
            Condition::Ops(ops) => match ops.as_slice() {
                [] => Err(QueryError::EmptyCondition {
                    field: key.to_string(),
                }),
                [(tag, value)] => Ok(self.leaf(key, tag, value)),
                _ => Err(QueryError::MultipleOperators {
                    field: key.to_string(),
                    ops: ops.iter().map(|(tag, _)| tag.clone()).collect(),
                }),
            },
        }
    }

    fn leaf(&mut self, key: &str, tag: &str, value: &Operand) -> Node {
        if !self.fields.iter().any(|f| f == key) {
            self.fields.push(key.to_string());
        }
        self.operators.push(OperatorUse {
            op: tag.to_string(),
            value: value.clone(),
        });
        Node::leaf(node_name(tag), key, value.clone())
    }
}
