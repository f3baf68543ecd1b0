//! Error types for the quarry crate.

use thiserror::Error;

/// Errors that can occur when building, parsing, evaluating or refining queries.
///
/// Every variant is fatal: nothing is retried and a scan that fails part-way
/// returns no partial results.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A field condition object carried no operator at all.
    #[error("empty condition object for field '{field}'")]
    EmptyCondition { field: String },

    /// A field condition object carried more than one operator tag.
    #[error("condition for field '{field}' has multiple operators: {}", ops.join(", "))]
    MultipleOperators { field: String, ops: Vec<String> },

    /// A directive key carried something other than a literal value.
    #[error("directive '{name}' must carry a literal value")]
    InvalidDirective { name: String },

    /// An AST node named an operator that no predicate is registered for.
    #[error("Unsupported query node type: {0}")]
    UnsupportedNode(String),

    /// An operator received a constraint of the wrong shape.
    #[error("operator '{op}' expects {expected} constraint")]
    InvalidOperand { op: String, expected: &'static str },

    /// A shaping directive with no registered transform.
    #[error("Unsupported query engine directive: {0}")]
    UnsupportedDirective(String),

    /// A shaping directive whose value the transform cannot use.
    #[error("invalid value for directive '{name}': {reason}")]
    InvalidTransform { name: String, reason: String },

    /// A JSON value could not be read as a declarative query document.
    #[error("invalid query document: {0}")]
    InvalidDocument(String),

    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Raised by a filter hook to abort the scan.
    #[error("filter hook failed: {0}")]
    Hook(String),
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_node_message() {
        let err = QueryError::UnsupportedNode("INVALID".to_string());
        assert_eq!(err.to_string(), "Unsupported query node type: INVALID");
    }

    #[test]
    fn multiple_operators_lists_tags() {
        let err = QueryError::MultipleOperators {
            field: "age".to_string(),
            ops: vec!["$gte".to_string(), "$lte".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "condition for field 'age' has multiple operators: $gte, $lte"
        );
    }
}
