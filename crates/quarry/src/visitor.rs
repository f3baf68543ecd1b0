//! Predicate evaluation over the query tree.
//!
//! [`Visitor`] is the evaluation seam. [`QueryVisitor`] implements it with an
//! explicit registry from leaf operator names (`EQ`, `GTE`, ...) to predicate
//! functions, pre-loaded with the built-in operators.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::Node;
use crate::error::{QueryError, Result};
use crate::op::{node_name, Op};
use crate::ordering::compare_values;
use crate::parser::ParseConfig;
use crate::value::{lookup, strict_eq, stringify, Operand};

/// A leaf predicate: receives the entity's property (`None` when missing) and
/// the leaf constraint.
pub type OperatorFn = Arc<dyn Fn(Option<&Value>, &Operand) -> Result<bool> + Send + Sync>;

/// Evaluates a query tree against one entity.
pub trait Visitor {
    /// Returns whether `entity` satisfies `node`.
    fn visit(&self, node: &Node, entity: &Value, config: &ParseConfig) -> Result<bool>;
}

/// Registry-backed [`Visitor`].
///
/// # Example
///
/// ```
/// use quarry::{Node, QueryVisitor};
/// use serde_json::json;
///
/// let visitor = QueryVisitor::new().with_operator("$startsWith", |prop, constraint| {
///     let prefix = constraint.as_literal().and_then(|v| v.as_str()).unwrap_or_default();
///     Ok(prop.and_then(|p| p.as_str()).is_some_and(|s| s.starts_with(prefix)))
/// });
///
/// assert!(visitor.supports("STARTSWITH"));
/// assert!(visitor.eval(&Node::leaf("STARTSWITH", "name", "Al"), &json!({"name": "Alice"})).unwrap());
/// ```
#[derive(Clone)]
pub struct QueryVisitor {
    operators: HashMap<String, OperatorFn>,
}

impl QueryVisitor {
    /// Creates a visitor with the built-in operators registered.
    pub fn new() -> Self {
        let mut visitor = QueryVisitor::empty();
        for op in Op::ALL {
            visitor.operators.insert(op.as_node_name().to_string(), builtin(op));
        }
        visitor
    }

    /// Creates a visitor with no operators.
    pub fn empty() -> Self {
        QueryVisitor {
            operators: HashMap::new(),
        }
    }

    /// Registers or overrides an operator.
    ///
    /// `name` may be given as a tag (`$startsWith`) or a leaf name
    /// (`STARTSWITH`); it is stored as the leaf name.
    pub fn register<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Option<&Value>, &Operand) -> Result<bool> + Send + Sync + 'static,
    {
        self.operators.insert(node_name(name), Arc::new(f));
        self
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with_operator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Operand) -> Result<bool> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    /// Returns `true` if an operator is registered under `name`.
    pub fn supports(&self, name: &str) -> bool {
        self.operators.contains_key(&node_name(name))
    }

    /// Returns the registered operator names, sorted.
    pub fn operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Evaluates `node` against `entity`.
    pub fn eval(&self, node: &Node, entity: &Value) -> Result<bool> {
        match node {
            Node::And(children) => {
                for child in children {
                    if !self.eval(child, entity)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Or(children) => {
                for child in children {
                    if self.eval(child, entity)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Leaf(leaf) => {
                let predicate = self
                    .operators
                    .get(&leaf.op)
                    .ok_or_else(|| QueryError::UnsupportedNode(leaf.op.clone()))?;
                predicate(lookup(entity, &leaf.key), &leaf.value)
            }
        }
    }
}

impl Default for QueryVisitor {
    fn default() -> Self {
        QueryVisitor::new()
    }
}

impl fmt::Debug for QueryVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryVisitor")
            .field("operators", &self.operator_names())
            .finish()
    }
}

impl Visitor for QueryVisitor {
    fn visit(&self, node: &Node, entity: &Value, _config: &ParseConfig) -> Result<bool> {
        self.eval(node, entity)
    }
}

fn builtin(op: Op) -> OperatorFn {
    match op {
        Op::Eq => Arc::new(eq),
        Op::Gt => ordered(op, Ordering::is_gt),
        Op::Gte => ordered(op, Ordering::is_ge),
        Op::Lt => ordered(op, Ordering::is_lt),
        Op::Lte => ordered(op, Ordering::is_le),
        Op::In => Arc::new(|prop: Option<&Value>, constraint: &Operand| is_in(Op::In, prop, constraint)),
        Op::Nin => Arc::new(|prop: Option<&Value>, constraint: &Operand| {
            is_in(Op::Nin, prop, constraint).map(|found| !found)
        }),
        Op::All => Arc::new(all),
    }
}

/// Equality: a matcher is called with the property, a pattern is tested
/// against the stringified property, a literal must be strictly equal.
fn eq(prop: Option<&Value>, constraint: &Operand) -> Result<bool> {
    Ok(match constraint {
        Operand::Func(f) => f(prop),
        Operand::Pattern(re) => re.is_match(&stringify(prop)),
        Operand::Literal(v) => prop.is_some_and(|p| strict_eq(p, v)),
    })
}

/// Comparison decided by `test` on the ordering of property and constraint.
fn ordered(op: Op, test: fn(Ordering) -> bool) -> OperatorFn {
    Arc::new(move |prop: Option<&Value>, constraint: &Operand| {
        let constraint = literal(op, constraint, "a literal")?;
        Ok(prop.and_then(|p| compare_values(p, constraint)).is_some_and(test))
    })
}

// An array property matches when any of its elements is in the set.
fn is_in(op: Op, prop: Option<&Value>, constraint: &Operand) -> Result<bool> {
    let set = array(op, constraint)?;
    let member = |v: &Value| set.iter().any(|s| strict_eq(v, s));
    Ok(match prop {
        None => false,
        Some(Value::Array(items)) => items.iter().any(member),
        Some(v) => member(v),
    })
}

fn all(prop: Option<&Value>, constraint: &Operand) -> Result<bool> {
    let set = array(Op::All, constraint)?;
    Ok(match prop {
        Some(Value::Array(items)) => set.iter().all(|s| items.iter().any(|v| strict_eq(v, s))),
        _ => false,
    })
}

fn literal<'a>(op: Op, constraint: &'a Operand, expected: &'static str) -> Result<&'a Value> {
    constraint.as_literal().ok_or_else(|| QueryError::InvalidOperand {
        op: op.as_tag().to_string(),
        expected,
    })
}

fn array(op: Op, constraint: &Operand) -> Result<&[Value]> {
    literal(op, constraint, "an array")?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| QueryError::InvalidOperand {
            op: op.as_tag().to_string(),
            expected: "an array",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(node: Node, entity: Value) -> bool {
        QueryVisitor::new().eval(&node, &entity).unwrap()
    }

    #[test]
    fn empty_groups() {
        assert!(check(Node::And(vec![]), json!({})));
        assert!(!check(Node::Or(vec![]), json!({})));
    }

    #[test]
    fn eq_literal() {
        assert!(check(Node::leaf("EQ", "n", 5), json!({"n": 5})));
        assert!(check(Node::leaf("EQ", "n", 5), json!({"n": 5.0})));
        assert!(!check(Node::leaf("EQ", "n", 5), json!({"n": "5"})));
        assert!(!check(Node::leaf("EQ", "n", json!(null)), json!({})));
        assert!(check(Node::leaf("EQ", "n", json!(null)), json!({"n": null})));
    }

    #[test]
    fn eq_pattern_uses_stringified_property() {
        let re = Operand::pattern("^Al").unwrap();
        assert!(check(Node::leaf("EQ", "name", re.clone()), json!({"name": "Alice"})));
        assert!(!check(Node::leaf("EQ", "name", re), json!({"name": "Bob"})));

        let digits = Operand::pattern("^4\\d$").unwrap();
        assert!(check(Node::leaf("EQ", "n", digits), json!({"n": 42})));

        let undefined = Operand::pattern("undefined").unwrap();
        assert!(check(Node::leaf("EQ", "missing", undefined), json!({})));
    }

    #[test]
    fn eq_func_result_is_verbatim() {
        let yes = Operand::func(|_| true);
        let no = Operand::func(|_| false);
        assert!(check(Node::leaf("EQ", "anything", yes), json!({})));
        assert!(!check(Node::leaf("EQ", "n", no), json!({"n": 1})));

        let seen_missing = Operand::func(|v| v.is_none());
        assert!(check(Node::leaf("EQ", "absent", seen_missing), json!({"n": 1})));
    }

    #[test]
    fn ordering_operators() {
        let e = json!({"age": 30, "name": "m"});
        assert!(check(Node::leaf("GT", "age", 26), e.clone()));
        assert!(!check(Node::leaf("GT", "age", 30), e.clone()));
        assert!(check(Node::leaf("GTE", "age", 30), e.clone()));
        assert!(check(Node::leaf("LT", "age", 30.5), e.clone()));
        assert!(check(Node::leaf("LTE", "age", 30), e.clone()));
        assert!(check(Node::leaf("GT", "name", "a"), e.clone()));
        // Missing or incomparable is never ordered
        assert!(!check(Node::leaf("GT", "missing", 0), e.clone()));
        assert!(!check(Node::leaf("LT", "name", 5), e));
    }

    #[test]
    fn ordering_rejects_non_literal() {
        let err = QueryVisitor::new()
            .eval(&Node::leaf("GT", "a", Operand::func(|_| true)), &json!({"a": 1}))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperand { ref op, .. } if op == "$gt"));
    }

    #[test]
    fn set_membership() {
        let e = json!({"role": "dev", "tags": ["rust", "js"]});
        assert!(check(Node::leaf("IN", "role", vec!["dev", "ops"]), e.clone()));
        assert!(!check(Node::leaf("IN", "role", vec!["ops"]), e.clone()));
        assert!(check(Node::leaf("IN", "tags", vec!["js"]), e.clone()));
        assert!(!check(Node::leaf("IN", "missing", vec!["x"]), e.clone()));

        assert!(check(Node::leaf("NIN", "role", vec!["ops"]), e.clone()));
        assert!(!check(Node::leaf("NIN", "tags", vec!["rust"]), e.clone()));
        assert!(check(Node::leaf("NIN", "missing", vec!["x"]), e.clone()));

        assert!(check(Node::leaf("ALL", "tags", vec!["js", "rust"]), e.clone()));
        assert!(!check(Node::leaf("ALL", "tags", vec!["js", "go"]), e.clone()));
        assert!(!check(Node::leaf("ALL", "role", vec!["dev"]), e));
    }

    #[test]
    fn set_membership_requires_array() {
        let err = QueryVisitor::new()
            .eval(&Node::leaf("IN", "a", 1), &json!({"a": 1}))
            .unwrap_err();
        assert_eq!(err.to_string(), "operator '$in' expects an array constraint");
    }

    #[test]
    fn unknown_leaf() {
        let err = QueryVisitor::new()
            .eval(&Node::leaf("INVALID", "a", 1), &json!({"a": 1}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported query node type: INVALID");
    }

    #[test]
    fn and_short_circuits_before_unknown_leaf() {
        let node = Node::And(vec![Node::leaf("EQ", "a", 2), Node::leaf("INVALID", "a", 1)]);
        assert!(!check(node, json!({"a": 1})));
    }

    #[test]
    fn register_overrides_builtin() {
        let mut visitor = QueryVisitor::new();
        visitor.register("$eq", |_, _| Ok(true));
        assert!(visitor
            .eval(&Node::leaf("EQ", "a", 1), &json!({"a": 2}))
            .unwrap());
    }

    #[test]
    fn registry_introspection() {
        let visitor = QueryVisitor::new();
        assert_eq!(
            visitor.operator_names(),
            vec!["ALL", "EQ", "GT", "GTE", "IN", "LT", "LTE", "NIN"]
        );
        assert!(visitor.supports("$gte"));
        assert!(!QueryVisitor::empty().supports("EQ"));
        assert!(format!("{visitor:?}").contains("GTE"));
    }

    #[test]
    fn nested_paths() {
        let e = json!({"address": {"city": "Paris"}});
        assert!(check(Node::leaf("EQ", "address.city", "Paris"), e));
    }
}
