//! Backend-neutral query plan.
//!
//! The translator produces a [`QueryPlan`]; each backend renders it into its
//! own request structure. Renderers make no decisions of their own beyond
//! spelling.

use serde_json::Value;

use crate::types::{RangeBounds, SortOrder};

/// How a clause participates in the top-level boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// Must match; contributes to scoring.
    Must,
    /// Optional; boosts matching documents.
    Should,
    /// Must not match.
    MustNot,
}

/// A leaf query.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Full-text match on one field. Every analyzed term must match, so a
    /// hyphenated value does not match on one of its parts alone.
    Match {
        /// Analyzed field.
        field: String,
        /// Text to match.
        value: Value,
    },
    /// Simple query string over weighted fields.
    SimpleQueryString {
        /// User query text.
        query: String,
        /// Fields searched, with their weights.
        fields: Vec<(String, f32)>,
    },
    /// Exact term.
    Term {
        /// Keyword field.
        field: String,
        /// Exact value.
        value: Value,
    },
    /// Any of several exact terms.
    Terms {
        /// Keyword field, or the bare field for non-string values.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Range over a field.
    Range {
        /// Keyword field.
        field: String,
        /// Bounds; unset sides are open.
        bounds: RangeBounds,
    },
    /// Prefix match.
    Prefix {
        /// Keyword field.
        field: String,
        /// Required prefix, lowercased.
        value: String,
    },
    /// Regular expression match.
    Regexp {
        /// Keyword field.
        field: String,
        /// Pattern in the engine's regexp syntax.
        pattern: String,
    },
    /// Field presence.
    Exists {
        /// Field that must be present.
        field: String,
    },
    /// A query scoped to a nested object path. Scores are averaged.
    Nested {
        /// Nested object path.
        path: String,
        /// Query run against each nested object.
        query: Box<Leaf>,
    },
    /// At least one of the inner queries must match.
    AnyOf(Vec<Leaf>),
}

/// One clause of the top-level boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Occurrence.
    pub occur: Occur,
    /// The query.
    pub leaf: Leaf,
    /// Relevance boost, if any.
    pub boost: Option<f32>,
}

impl Clause {
    /// A required clause.
    pub fn must(leaf: Leaf) -> Self {
        Self {
            occur: Occur::Must,
            leaf,
            boost: None,
        }
    }

    /// An excluding clause.
    pub fn must_not(leaf: Leaf) -> Self {
        Self {
            occur: Occur::MustNot,
            leaf,
            boost: None,
        }
    }

    /// Sets the boost.
    pub fn with_boost(mut self, boost: Option<f32>) -> Self {
        self.boost = boost;
        self
    }
}

/// Sort clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SortClause {
    /// Sort on a single field.
    Field {
        /// Sort field.
        field: String,
        /// Direction.
        order: SortOrder,
    },
    /// Sort on a field inside nested objects, taking the minimum value among
    /// the nested objects that match the filter term.
    Nested {
        /// Sort field inside the nested objects.
        field: String,
        /// Direction.
        order: SortOrder,
        /// Nested object path.
        path: String,
        /// Field of the filter term.
        filter_field: String,
        /// Value of the filter term.
        filter_value: Value,
    },
}

/// Aggregation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    /// Bucket by distinct value.
    Terms,
    /// Bucket by calendar day.
    DateHistogram,
}

/// One aggregation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// Aggregation (and facet) name.
    pub name: String,
    /// Field the buckets are computed on.
    pub field: String,
    /// Aggregation kind.
    pub kind: AggregationKind,
}

/// Source projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Fields to include. `None` returns everything.
    pub includes: Option<Vec<String>>,
    /// Fields to exclude. `None` excludes nothing.
    pub excludes: Option<Vec<String>>,
}

impl Projection {
    /// Returns true if neither list is set.
    pub fn is_unrestricted(&self) -> bool {
        self.includes.is_none() && self.excludes.is_none()
    }
}

/// Backend-neutral translation of a search descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Boolean query clauses, in rule order.
    pub clauses: Vec<Clause>,
    /// Sort clauses, in caller order.
    pub sort: Vec<SortClause>,
    /// Source projection.
    pub projection: Projection,
    /// Hits to skip.
    pub from: Option<u32>,
    /// Hits to return.
    pub size: Option<u32>,
    /// Aggregations, in facet order.
    pub aggregations: Vec<Aggregation>,
}

impl QueryPlan {
    /// Returns clauses with the given occurrence, in order.
    pub fn clauses_with(&self, occur: Occur) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |c| c.occur == occur)
    }

    /// Returns true if the query has no clauses (match all).
    pub fn matches_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the facet names requested by this plan.
    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.aggregations.iter().map(|a| a.name.as_str())
    }
}
