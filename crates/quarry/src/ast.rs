//! Normalized query tree.

use crate::op::Logic;
use crate::value::Operand;

/// Name of an AND node.
pub const AND: &str = "AND";
/// Name of an OR node.
pub const OR: &str = "OR";

/// A node of the normalized query tree.
///
/// The parser always produces an [`Node::And`] root.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Every child must hold. Vacuously true when empty.
    And(Vec<Node>),
    /// At least one child must hold. False when empty.
    Or(Vec<Node>),
    /// A single predicate on one field.
    Leaf(Leaf),
}

/// A predicate: operator name, field path and constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Upper-cased operator name, e.g. `GTE`.
    pub op: String,
    /// Dotted field path.
    pub key: String,
    /// The constraint.
    pub value: Operand,
}

impl Node {
    /// Creates a leaf node.
    pub fn leaf(op: impl Into<String>, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        Node::Leaf(Leaf {
            op: op.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    /// Creates a group node for the given logic.
    pub fn group(logic: Logic, children: Vec<Node>) -> Self {
        match logic {
            Logic::And => Node::And(children),
            Logic::Or => Node::Or(children),
        }
    }

    /// Returns the node type name: `AND`, `OR` or the leaf operator.
    pub fn type_name(&self) -> &str {
        match self {
            Node::And(_) => AND,
            Node::Or(_) => OR,
            Node::Leaf(leaf) => &leaf.op,
        }
    }

    /// Returns the children of a group node, or an empty slice for a leaf.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::And(children) | Node::Or(children) => children,
            Node::Leaf(_) => &[],
        }
    }
}
