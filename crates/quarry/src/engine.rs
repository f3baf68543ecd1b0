//! Query execution over an asynchronous entity stream.
//!
//! The [`Engine`] scans `(key, entity)` pairs in stream order:
//!
//! ```text
//! loop:
//!     limit set and matches >= limit  -> stop, the stream is not polled again
//!     next entity (or stop at end)
//!     filter hook (optional, errors abort)
//!     evaluate, collect on true
//! refine(matches)
//! ```
//!
//! The limit bounds which entities are tested, so `limit` with `sort` sorts
//! the first N matches in stream order, not a global top N.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{pin_mut, Stream, StreamExt};
use serde_json::Value;

use crate::document::Document;
use crate::error::Result;
use crate::parser::ParseConfig;
use crate::query::Query;
use crate::refine::{Refine, Refiner};
use crate::value::Operand;
use crate::visitor::{QueryVisitor, Visitor};

/// Hook awaited for every scanned entity before it is evaluated.
///
/// The hook cannot change the verdict; returning an error aborts the scan.
#[async_trait]
pub trait FilterHook: Send + Sync {
    /// Inspects one entity.
    async fn filter(&self, entity: &Value, config: &ParseConfig) -> Result<()>;
}

/// Runs queries against entity streams.
///
/// # Example
///
/// ```
/// use futures::stream;
/// use quarry::{Document, Engine};
/// use serde_json::json;
///
/// let people = vec![
///     ("1", json!({"name": "Alice", "age": 30})),
///     ("2", json!({"name": "Bob", "age": 25})),
/// ];
///
/// let engine = Engine::new();
/// let doc = Document::from_json(&json!({"age": {"$gt": 26}})).unwrap();
/// let found = futures::executor::block_on(engine.find(doc, stream::iter(people))).unwrap();
///
/// assert_eq!(found, vec![json!({"name": "Alice", "age": 30})]);
/// ```
#[derive(Clone)]
pub struct Engine {
    visitor: QueryVisitor,
    refiner: Arc<dyn Refine + Send + Sync>,
    filter: Option<Arc<dyn FilterHook>>,
}

impl Engine {
    /// Creates an engine with the built-in operators and transforms.
    pub fn new() -> Self {
        Engine {
            visitor: QueryVisitor::new(),
            refiner: Arc::new(Refiner::new()),
            filter: None,
        }
    }

    /// Sets the per-entity filter hook.
    pub fn with_filter(mut self, hook: impl FilterHook + 'static) -> Self {
        self.filter = Some(Arc::new(hook));
        self
    }

    /// Replaces the result refiner.
    pub fn with_refiner(mut self, refiner: impl Refine + Send + Sync + 'static) -> Self {
        self.refiner = Arc::new(refiner);
        self
    }

    /// Replaces the operator registry handed to new queries.
    pub fn with_visitor(mut self, visitor: QueryVisitor) -> Self {
        self.visitor = visitor;
        self
    }

    /// Registers or overrides an operator for every query this engine creates.
    pub fn register_operator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Option<&Value>, &Operand) -> Result<bool> + Send + Sync + 'static,
    {
        self.visitor.register(name, f);
        self
    }

    /// Returns a fresh query wired with this engine's operators.
    pub fn query(&self) -> Query {
        Query::with_visitor(self.visitor.clone())
    }

    /// Runs a declarative query against `entities`.
    pub async fn find<K, S>(&self, doc: Document, entities: S) -> Result<Vec<Value>>
    where
        S: Stream<Item = (K, Value)>,
    {
        let query = self.query().set_query(doc);
        self.execute(&query, entities).await
    }

    /// Runs `query` against `entities` and refines the matches.
    ///
    /// Any error aborts the scan and no partial results are returned.
    pub async fn execute<V, K, S>(&self, query: &Query<V>, entities: S) -> Result<Vec<Value>>
    where
        V: Visitor,
        S: Stream<Item = (K, Value)>,
    {
        let evaluate = query.evaluator()?;
        let config = query.parse()?;
        let limit = config.limit();

        pin_mut!(entities);
        let mut matches = Vec::new();
        let mut scanned = 0usize;
        loop {
            if let Some(limit) = limit {
                if matches.len() >= limit {
                    tracing::debug!(limit, scanned, "limit reached, scan stopped");
                    break;
                }
            }
            let Some((_, entity)) = entities.next().await else {
                break;
            };
            scanned += 1;

            if let Some(hook) = &self.filter {
                hook.filter(&entity, config).await?;
            }
            let matched = evaluate(&entity)?;
            tracing::trace!(scanned, matched, "evaluated entity");
            if matched {
                matches.push(entity);
            }
        }

        tracing::debug!(scanned, matched = matches.len(), "scan complete");
        self.refiner.refine(matches, config)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("visitor", &self.visitor)
            .field("filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use futures::stream;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn people() -> Vec<(usize, Value)> {
        vec![
            json!({"name": "Alice", "age": 30}),
            json!({"name": "Bob", "age": 25}),
            json!({"name": "Carol", "age": 35}),
        ]
        .into_iter()
        .enumerate()
        .collect()
    }

    fn doc(value: Value) -> Document {
        Document::from_json(&value).unwrap()
    }

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl FilterHook for Counter {
        async fn filter(&self, _: &Value, _: &ParseConfig) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Reject(&'static str);

    #[async_trait]
    impl FilterHook for Reject {
        async fn filter(&self, entity: &Value, _: &ParseConfig) -> Result<()> {
            if entity["name"] == self.0 {
                return Err(QueryError::Hook(format!("rejected {}", self.0)));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn find_by_shorthand() {
        let found = Engine::new()
            .find(doc(json!({"name": "Alice"})), stream::iter(people()))
            .await
            .unwrap();
        assert_eq!(found, vec![json!({"name": "Alice", "age": 30})]);
    }

    #[tokio::test]
    async fn hook_sees_every_scanned_entity() {
        let count = Arc::new(AtomicUsize::new(0));
        let engine = Engine::new().with_filter(Counter(count.clone()));
        let found = engine
            .find(doc(json!({"age": {"$gte": 30}})), stream::iter(people()))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn limit_stops_before_reading_more() {
        let count = Arc::new(AtomicUsize::new(0));
        let engine = Engine::new().with_filter(Counter(count.clone()));
        let found = engine
            .find(doc(json!({"$limit": 1, "age": {"$gt": 0}})), stream::iter(people()))
            .await
            .unwrap();
        assert_eq!(found, vec![json!({"name": "Alice", "age": 30})]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hook_error_aborts_scan() {
        let engine = Engine::new().with_filter(Reject("Bob"));
        let err = engine
            .find(doc(json!({"age": {"$gt": 0}})), stream::iter(people()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "filter hook failed: rejected Bob");
    }

    #[tokio::test]
    async fn registered_operator_reaches_queries() {
        let engine = Engine::new().register_operator("$odd", |prop, _| {
            Ok(prop.and_then(Value::as_u64).is_some_and(|n| n % 2 == 1))
        });
        let query = engine.query().edit(|b| b.field("age").add_condition("$odd", true));
        let found = engine.execute(&query, stream::iter(people())).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn custom_refiner() {
        let engine = Engine::new().with_refiner(Refiner::empty().with_transform("count", |rows, _| {
            Ok(vec![json!(rows.len())])
        }));
        let found = engine
            .find(doc(json!({"$count": true})), stream::iter(people()))
            .await
            .unwrap();
        assert_eq!(found, vec![json!(3)]);
    }

    #[test]
    fn debug_lists_operators() {
        let rendered = format!("{:?}", Engine::new());
        assert!(rendered.contains("EQ"));
        assert!(rendered.contains("filter: false"));
    }
}
