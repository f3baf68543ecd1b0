//! Reserved tags: comparison operators, grouping tags and directives.
//!
//! Tags are `$`-prefixed identifiers recognised case-sensitively. Operator
//! tags name a leaf predicate (`$gte`), grouping tags combine conditions
//! (`$and`, `$or`) and directive tags shape the result set (`$sort`).

/// Prefix shared by every reserved tag.
pub const TAG_PREFIX: char = '$';

/// Returns `true` if `key` is spelled as a reserved tag.
pub fn is_tag(key: &str) -> bool {
    key.starts_with(TAG_PREFIX)
}

/// Strips the tag prefix, leaving untagged names unchanged.
pub fn unprefixed(tag: &str) -> &str {
    tag.strip_prefix(TAG_PREFIX).unwrap_or(tag)
}

/// AST leaf name for an operator tag: `$gte` becomes `GTE`.
pub fn node_name(tag: &str) -> String {
    unprefixed(tag).to_uppercase()
}

/// Transform name for a directive tag: `$Sort` becomes `sort`.
pub fn transform_name(tag: &str) -> String {
    unprefixed(tag).to_lowercase()
}

/// Built-in comparison operator.
///
/// Custom operators are plain tags registered on a
/// [`QueryVisitor`](crate::QueryVisitor); this enum only covers the
/// operators the builder has named methods for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Equal. Accepts literals, patterns and matcher functions.
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value (or any element of an array value) is in the given set.
    In,
    /// Negation of `In`.
    Nin,
    /// Array value contains every element of the given set.
    All,
}

impl Op {
    /// Every built-in operator, in registration order.
    pub const ALL: [Op; 8] = [
        Op::Eq,
        Op::Gt,
        Op::Gte,
        Op::Lt,
        Op::Lte,
        Op::In,
        Op::Nin,
        Op::All,
    ];

    /// Returns the `$`-prefixed tag for this operator.
    pub fn as_tag(self) -> &'static str {
        match self {
            Op::Eq => "$eq",
            Op::Gt => "$gt",
            Op::Gte => "$gte",
            Op::Lt => "$lt",
            Op::Lte => "$lte",
            Op::In => "$in",
            Op::Nin => "$nin",
            Op::All => "$all",
        }
    }

    /// Returns the AST leaf name for this operator.
    pub fn as_node_name(self) -> &'static str {
        match self {
            Op::Eq => "EQ",
            Op::Gt => "GT",
            Op::Gte => "GTE",
            Op::Lt => "LT",
            Op::Lte => "LTE",
            Op::In => "IN",
            Op::Nin => "NIN",
            Op::All => "ALL",
        }
    }
}

/// Logical grouping of conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Logic {
    /// All branches must hold.
    #[default]
    And,
    /// At least one branch must hold.
    Or,
}

impl Logic {
    /// Returns the `$`-prefixed grouping tag.
    pub fn as_tag(self) -> &'static str {
        match self {
            Logic::And => "$and",
            Logic::Or => "$or",
        }
    }

    /// Looks up a grouping tag.
    pub fn from_tag(tag: &str) -> Option<Logic> {
        match tag {
            "$and" => Some(Logic::And),
            "$or" => Some(Logic::Or),
            _ => None,
        }
    }
}

/// Built-in top-level directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Order results by one or more fields.
    Sort,
    /// Stop the scan once this many matches are collected.
    Limit,
    /// Drop this many results from the front.
    Skip,
    /// Project results to the named fields.
    Select,
}

impl Directive {
    /// Returns the `$`-prefixed tag.
    pub fn as_tag(self) -> &'static str {
        match self {
            Directive::Sort => "$sort",
            Directive::Limit => "$limit",
            Directive::Skip => "$skip",
            Directive::Select => "$select",
        }
    }

    /// Returns the transform name the parser records this directive under.
    pub fn as_name(self) -> &'static str {
        match self {
            Directive::Sort => "sort",
            Directive::Limit => "limit",
            Directive::Skip => "skip",
            Directive::Select => "select",
        }
    }
}
