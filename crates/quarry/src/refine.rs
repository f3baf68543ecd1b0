//! Result shaping after a scan.
//!
//! [`Refine`] is the shaping seam. [`Refiner`] implements it with a registry
//! of named transforms, applied in a fixed order:
//!
//! ```text
//! matches -> sort -> skip -> select -> custom transforms (registration order)
//! ```
//!
//! `limit` bounds the scan itself and is never a shaping transform.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{QueryError, Result};
use crate::op::Directive;
use crate::ordering::{compare_by_keys, SortKey};
use crate::parser::ParseConfig;
use crate::value::{as_count, lookup};

/// A shaping transform: receives the current results and the directive
/// payload, returns the reshaped results.
pub type TransformFn = Arc<dyn Fn(Vec<Value>, &Value) -> Result<Vec<Value>> + Send + Sync>;

/// Shapes the matches of a scan.
pub trait Refine {
    /// Applies the shaping directives of `config` to `results`.
    fn refine(&self, results: Vec<Value>, config: &ParseConfig) -> Result<Vec<Value>>;
}

/// Registry-backed [`Refine`] with `sort`, `skip` and `select` built in.
#[derive(Clone)]
pub struct Refiner {
    transforms: HashMap<String, TransformFn>,
    order: Vec<String>,
}

impl Refiner {
    /// Creates a refiner with the built-in transforms.
    pub fn new() -> Self {
        Refiner::empty()
            .with_transform(Directive::Sort.as_name(), sort)
            .with_transform(Directive::Skip.as_name(), skip)
            .with_transform(Directive::Select.as_name(), select)
    }

    /// Creates a refiner with no transforms.
    pub fn empty() -> Self {
        Refiner {
            transforms: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers or overrides a transform.
    ///
    /// A new name runs after every transform registered before it; an
    /// override keeps the position of the transform it replaces.
    pub fn register<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>, &Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        if !self.order.contains(&name) {
            self.order.push(name.clone());
        }
        self.transforms.insert(name, Arc::new(f));
        self
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with_transform<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Vec<Value>, &Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    /// Returns `true` if a transform is registered under `name`.
    pub fn supports(&self, name: &str) -> bool {
        self.transforms.contains_key(&name.to_lowercase())
    }

    /// Returns transform names in application order.
    pub fn names(&self) -> &[String] {
        &self.order
    }
}

impl Default for Refiner {
    fn default() -> Self {
        Refiner::new()
    }
}

impl fmt::Debug for Refiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refiner").field("order", &self.order).finish()
    }
}

impl Refine for Refiner {
    fn refine(&self, mut results: Vec<Value>, config: &ParseConfig) -> Result<Vec<Value>> {
        let limit = Directive::Limit.as_name();
        if let Some(name) = config
            .transforms
            .names()
            .find(|name| *name != limit && !self.transforms.contains_key(*name))
        {
            return Err(QueryError::UnsupportedDirective(name.to_string()));
        }

        for name in &self.order {
            let (Some(value), Some(transform)) =
                (config.transforms.get(name), self.transforms.get(name))
            else {
                continue;
            };
            results = transform(results, value)?;
            tracing::debug!(directive = %name, results = results.len(), "applied transform");
        }
        Ok(results)
    }
}

fn invalid(directive: Directive, reason: &str) -> QueryError {
    QueryError::InvalidTransform {
        name: directive.as_name().to_string(),
        reason: reason.to_string(),
    }
}

/// Reads a string or an array of strings.
fn names(directive: Directive, value: &Value) -> Result<Vec<&str>> {
    match value {
        Value::String(s) => Ok(vec![s.as_str()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| invalid(directive, "expected field names"))
            })
            .collect(),
        _ => Err(invalid(directive, "expected a field name or a list of field names")),
    }
}

/// Stable sort on one or more `"field"` / `"-field"` keys.
fn sort(mut results: Vec<Value>, value: &Value) -> Result<Vec<Value>> {
    let keys: Vec<SortKey> = names(Directive::Sort, value)?
        .into_iter()
        .map(SortKey::parse)
        .collect();
    results.sort_by(|a, b| compare_by_keys(a, b, &keys));
    Ok(results)
}

fn skip(results: Vec<Value>, value: &Value) -> Result<Vec<Value>> {
    let n = as_count(value)
        .ok_or_else(|| invalid(Directive::Skip, "expected a non-negative integer"))?;
    Ok(results.into_iter().skip(n).collect())
}

/// Projects each result to the named (dotted) paths; missing paths are left out.
fn select(results: Vec<Value>, value: &Value) -> Result<Vec<Value>> {
    let paths = names(Directive::Select, value)?;
    Ok(results
        .iter()
        .map(|entity| {
            let mut picked = Map::new();
            for path in &paths {
                if let Some(v) = lookup(entity, path) {
                    assign(&mut picked, path, v.clone());
                }
            }
            Value::Object(picked)
        })
        .collect())
}

fn assign(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                assign(inner, rest, value);
            }
        }
    }
}
