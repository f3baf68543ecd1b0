//! Quarry - embeddable filter-query DSL over JSON entities.
//!
//! Quarry turns conditions into a predicate tree and runs it over a stream of
//! entities:
//!
//! - A fluent [`Builder`] groups per-field conditions with AND / OR
//! - A [`Parser`] normalizes a declarative [`Document`] into an AST
//! - A [`QueryVisitor`] evaluates the AST through a registry of operators
//! - An [`Engine`] scans an async stream, honouring `$limit`, then refines
//!   the matches with `$sort`, `$skip` and `$select`
//!
//! # Quick Start
//!
//! ```rust
//! use futures::stream;
//! use quarry::Engine;
//! use serde_json::json;
//!
//! let people = vec![
//!     (1, json!({"name": "Alice", "age": 30})),
//!     (2, json!({"name": "Bob", "age": 25})),
//!     (3, json!({"name": "Carol", "age": 35})),
//! ];
//!
//! let engine = Engine::new();
//! let query = engine.query().edit(|b| {
//!     b.field("age").gte(26)
//!         .sort("-age")
//!         .select(["name"])
//! });
//!
//! let found = futures::executor::block_on(engine.execute(&query, stream::iter(people))).unwrap();
//! assert_eq!(found, vec![json!({"name": "Carol"}), json!({"name": "Alice"})]);
//! ```
//!
//! # Declarative Queries
//!
//! ```text
//! {
//!   "name":    "Alice",                           shorthand for {"$eq": "Alice"}
//!   "age":     {"$gte": 21},                      one operator per condition object
//!   "tags":    {"$in": ["rust", "go"]},
//!   "city":    {"$or": [{"$eq": "Oslo"}, {"$eq": "Paris"}]},
//!   "$sort":   "-age",                            directives
//!   "$limit":  10
//! }
//! ```
//!
//! Top-level fields are ANDed. Operators:
//!
//! | Tag | Leaf | Meaning |
//! |-----|------|---------|
//! | `$eq` | `EQ` | strict equality, pattern test, or matcher function |
//! | `$gt` `$gte` `$lt` `$lte` | `GT` `GTE` `LT` `LTE` | natural ordering |
//! | `$in` `$nin` | `IN` `NIN` | set membership |
//! | `$all` | `ALL` | array contains every element |
//!
//! Custom operators are registered on the [`QueryVisitor`] (or through
//! [`Engine::register_operator`]) and custom directives on the [`Refiner`].

mod ast;
mod builder;
mod document;
mod engine;
mod error;
mod interpreter;
mod op;
mod ordering;
mod parser;
mod query;
mod refine;
mod value;
mod visitor;

// Re-export public API
pub use ast::{Leaf, Node};
pub use builder::{Builder, Pending, Record};
pub use document::{Condition, Document, Entry};
pub use engine::{Engine, FilterHook};
pub use error::{QueryError, Result};
pub use interpreter::Interpreter;
pub use op::{is_tag, node_name, transform_name, Directive, Logic, Op};
pub use ordering::{compare_by_keys, compare_fields, compare_values, Dir, SortKey};
pub use parser::{OperatorUse, ParseConfig, Parser, Transforms};
pub use query::{PrepareFn, Query};
pub use refine::{Refine, Refiner, TransformFn};
pub use value::{lookup, strict_eq, stringify, Matcher, Operand};
pub use visitor::{OperatorFn, QueryVisitor, Visitor};
