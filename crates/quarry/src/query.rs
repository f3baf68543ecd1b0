//! Per-query facade.
//!
//! A [`Query`] owns one [`Builder`], one [`Parser`] and one [`Interpreter`].
//! Because the parser memoizes its first result, a query is single-use: once
//! parsed, later builder changes are not seen by [`Query::parse`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::builder::Builder;
use crate::document::Document;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser::{ParseConfig, Parser};
use crate::visitor::{QueryVisitor, Visitor};

/// Callback that may adjust a freshly parsed configuration before it is cached.
pub type PrepareFn = Arc<dyn Fn(&mut ParseConfig) + Send + Sync>;

/// Builder, parser and interpreter wired together for one query.
///
/// # Example
///
/// ```
/// use quarry::Query;
/// use serde_json::json;
///
/// let query = Query::new().edit(|b| b.field("age").gt(26));
/// let matches = query.evaluator().unwrap();
///
/// assert!(matches(&json!({"name": "Alice", "age": 30})).unwrap());
/// assert!(!matches(&json!({"name": "Bob", "age": 25})).unwrap());
/// ```
pub struct Query<V: Visitor = QueryVisitor> {
    builder: Builder,
    parser: Parser,
    interpreter: Interpreter<V>,
    prepare: Option<PrepareFn>,
}

impl Query<QueryVisitor> {
    /// Creates a query evaluated by the default [`QueryVisitor`].
    pub fn new() -> Self {
        Query::with_visitor(QueryVisitor::new())
    }
}

impl Default for Query<QueryVisitor> {
    fn default() -> Self {
        Query::new()
    }
}

impl<V: Visitor> Query<V> {
    /// Creates a query evaluated by `visitor`.
    pub fn with_visitor(visitor: V) -> Self {
        Query {
            builder: Builder::new(),
            parser: Parser::new(),
            interpreter: Interpreter::new(visitor),
            prepare: None,
        }
    }

    /// Sets a callback run once on the parsed configuration, before it is
    /// cached. Changes it makes are seen by every later evaluation.
    pub fn with_prepare<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ParseConfig) + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(f));
        self
    }

    /// Applies `f` to the builder.
    pub fn edit<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.builder = f(std::mem::take(&mut self.builder));
        self
    }

    /// Merges a declarative query into the builder.
    pub fn set_query(self, doc: Document) -> Self {
        self.edit(|b| b.set_query(doc))
    }

    /// Returns the builder.
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Returns the interpreter.
    pub fn interpreter(&self) -> &Interpreter<V> {
        &self.interpreter
    }

    /// Builds the declarative query.
    pub fn build(&self) -> Document {
        self.builder.build()
    }

    /// Parses the built query; memoized after the first success.
    ///
    /// The builder is only consulted on a cache miss.
    pub fn parse(&self) -> Result<&ParseConfig> {
        if let Some(config) = self.parser.parsed() {
            return Ok(config);
        }
        let doc = self.builder.build();
        self.parser.parse_with(&doc, |config| {
            if let Some(prepare) = &self.prepare {
                prepare(config);
            }
        })
    }

    /// Returns a predicate testing one entity against the parsed query.
    pub fn evaluator(&self) -> Result<impl Fn(&Value) -> Result<bool> + '_> {
        let config = self.parse()?;
        Ok(move |entity: &Value| self.interpreter.interpret(&config.ast, entity, config))
    }

    /// Tests one entity against the parsed query.
    pub fn matches(&self, entity: &Value) -> Result<bool> {
        let config = self.parse()?;
        self.interpreter.interpret(&config.ast, entity, config)
    }
}

impl<V: Visitor + fmt::Debug> fmt::Debug for Query<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("builder", &self.builder)
            .field("parser", &self.parser)
            .field("interpreter", &self.interpreter)
            .field("prepare", &self.prepare.is_some())
            .finish()
    }
}
