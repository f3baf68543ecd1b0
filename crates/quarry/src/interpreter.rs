//! Evaluation entry point.

use serde_json::Value;

use crate::ast::Node;
use crate::error::Result;
use crate::parser::ParseConfig;
use crate::visitor::{QueryVisitor, Visitor};

/// Runs a query tree against entities through a [`Visitor`].
#[derive(Debug, Clone, Default)]
pub struct Interpreter<V: Visitor = QueryVisitor> {
    visitor: V,
}

impl<V: Visitor> Interpreter<V> {
    /// Creates an interpreter around `visitor`.
    pub fn new(visitor: V) -> Self {
        Interpreter { visitor }
    }

    /// Returns whether `entity` satisfies `ast`.
    pub fn interpret(&self, ast: &Node, entity: &Value, config: &ParseConfig) -> Result<bool> {
        self.visitor.visit(ast, entity, config)
    }

    /// Returns the visitor.
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    /// Returns the visitor mutably, e.g. to register operators.
    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }
}
