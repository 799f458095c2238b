//! Typed requests for the transport protocol.
//!
//! These mirror the engine's native builder API: queries, sorts and
//! aggregations are values that a [`TransportClient`](super::TransportClient)
//! encodes onto the wire. [`SearchSource::to_json`] gives the canonical JSON
//! encoding of a search.

use serde_json::{Map, Value, json};

use crate::types::{Document, SortOrder};

/// Scoring mode for nested queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Average of matching nested documents.
    Avg,
}

impl ScoreMode {
    fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Avg => "avg",
        }
    }
}

/// Value selection for multi-valued sort fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Lowest value wins.
    Min,
}

impl SortMode {
    fn as_str(&self) -> &'static str {
        match self {
            SortMode::Min => "min",
        }
    }
}

/// How the analyzed terms of a match query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Any term may match.
    Or,
    /// Every term must match.
    And,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::Or => "or",
            Operator::And => "and",
        }
    }
}

/// Compound boolean query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    /// Clauses that must match and score.
    pub must: Vec<QueryBuilder>,
    /// Optional clauses that add to the score.
    pub should: Vec<QueryBuilder>,
    /// Clauses that exclude a document.
    pub must_not: Vec<QueryBuilder>,
    /// How many `should` clauses must match.
    pub minimum_should_match: Option<u32>,
    /// Score multiplier.
    pub boost: Option<f32>,
}

impl BoolQuery {
    /// Creates an empty boolean query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required clause.
    pub fn must(mut self, query: QueryBuilder) -> Self {
        self.must.push(query);
        self
    }

    /// Adds an optional clause.
    pub fn should(mut self, query: QueryBuilder) -> Self {
        self.should.push(query);
        self
    }

    /// Adds an excluding clause.
    pub fn must_not(mut self, query: QueryBuilder) -> Self {
        self.must_not.push(query);
        self
    }

    /// Sets how many optional clauses must match.
    pub fn minimum_should_match(mut self, n: u32) -> Self {
        self.minimum_should_match = Some(n);
        self
    }

    /// Sets the boost.
    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Returns true if there are no clauses.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut inner = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                inner.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(QueryBuilder::to_json).collect()),
                );
            }
        }
        if let Some(n) = self.minimum_should_match {
            inner.insert("minimum_should_match".to_string(), json!(n));
        }
        if let Some(boost) = self.boost {
            inner.insert("boost".to_string(), json!(boost));
        }
        json!({ "bool": inner })
    }
}

/// Range query bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQuery {
    /// Field the bounds apply to.
    pub field: String,
    /// Exclusive lower bound.
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    pub gte: Option<Value>,
    /// Exclusive upper bound.
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    pub lte: Option<Value>,
}

impl RangeQuery {
    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        for (key, bound) in [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ] {
            if let Some(value) = bound {
                bounds.insert(key.to_string(), value.clone());
            }
        }
        json!({ "range": { &self.field: bounds } })
    }
}

/// A query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBuilder {
    /// Matches every document.
    MatchAll,
    /// Boolean combination.
    Bool(BoolQuery),
    /// Full-text match on one field.
    Match {
        /// Analyzed field.
        field: String,
        /// Text to analyze and match.
        query: Value,
        /// How the analyzed terms combine.
        operator: Operator,
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
        /// Keyword field.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Range over a field.
    Range(RangeQuery),
    /// Prefix match.
    Prefix {
        /// Keyword field.
        field: String,
        /// Required prefix.
        value: String,
    },
    /// Regular expression match.
    Regexp {
        /// Keyword field.
        field: String,
        /// Pattern in the engine's regexp syntax.
        value: String,
    },
    /// Field presence.
    Exists {
        /// Field that must be present.
        field: String,
    },
    /// Query over nested objects.
    Nested {
        /// Nested object path.
        path: String,
        /// Query run against each nested object.
        query: Box<QueryBuilder>,
        /// How nested scores combine.
        score_mode: ScoreMode,
    },
}

impl QueryBuilder {
    /// Encodes the query as JSON.
    pub fn to_json(&self) -> Value {
        match self {
            QueryBuilder::MatchAll => json!({ "match_all": {} }),
            QueryBuilder::Bool(query) => query.to_json(),
            QueryBuilder::Match {
                field,
                query,
                operator,
            } => json!({
                "match": { field: { "query": query, "operator": operator.as_str() } }
            }),
            QueryBuilder::SimpleQueryString { query, fields } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(name, weight)| {
                        if *weight == 1.0 {
                            name.clone()
                        } else {
                            format!("{}^{}", name, weight)
                        }
                    })
                    .collect();
                json!({ "simple_query_string": { "query": query, "fields": fields } })
            }
            QueryBuilder::Term { field, value } => json!({ "term": { field: value } }),
            QueryBuilder::Terms { field, values } => json!({ "terms": { field: values } }),
            QueryBuilder::Range(range) => range.to_json(),
            QueryBuilder::Prefix { field, value } => json!({ "prefix": { field: value } }),
            QueryBuilder::Regexp { field, value } => json!({ "regexp": { field: value } }),
            QueryBuilder::Exists { field } => json!({ "exists": { "field": field } }),
            QueryBuilder::Nested {
                path,
                query,
                score_mode,
            } => json!({
                "nested": {
                    "path": path,
                    "query": query.to_json(),
                    "score_mode": score_mode.as_str(),
                }
            }),
        }
    }
}

/// Nested sort scope.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedSortBuilder {
    /// Nested object path.
    pub path: String,
    /// Selects the nested objects that take part.
    pub filter: QueryBuilder,
}

/// Sort on a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSort {
    /// Sort field.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
    /// Value picked from multi-valued fields.
    pub sort_mode: Option<SortMode>,
    /// Nested scope, for fields inside nested objects.
    pub nested: Option<NestedSortBuilder>,
}

impl FieldSort {
    /// Sorts on `field` in ascending order.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
            sort_mode: None,
            nested: None,
        }
    }

    /// Sets the order.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Sets the multi-value mode.
    pub fn sort_mode(mut self, mode: SortMode) -> Self {
        self.sort_mode = Some(mode);
        self
    }

    /// Scopes the sort to nested objects matching `filter`.
    pub fn nested(mut self, path: impl Into<String>, filter: QueryBuilder) -> Self {
        self.nested = Some(NestedSortBuilder {
            path: path.into(),
            filter,
        });
        self
    }

    /// Encodes the sort as JSON.
    pub fn to_json(&self) -> Value {
        let mut spec = Map::new();
        spec.insert("order".to_string(), json!(self.order.as_str()));
        if let Some(mode) = self.sort_mode {
            spec.insert("mode".to_string(), json!(mode.as_str()));
        }
        if let Some(ref nested) = self.nested {
            spec.insert(
                "nested".to_string(),
                json!({ "path": nested.path, "filter": nested.filter.to_json() }),
            );
        }
        json!({ &self.field: spec })
    }
}

/// Date histogram bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateHistogramInterval {
    /// One calendar day.
    Day,
}

impl DateHistogramInterval {
    fn as_str(&self) -> &'static str {
        match self {
            DateHistogramInterval::Day => "1d",
        }
    }
}

/// An aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationBuilder {
    /// Buckets by distinct value.
    Terms {
        /// Aggregation name.
        name: String,
        /// Bucketed field.
        field: String,
    },
    /// Buckets by date interval.
    DateHistogram {
        /// Aggregation name.
        name: String,
        /// Date field.
        field: String,
        /// Bucket width.
        interval: DateHistogramInterval,
    },
}

impl AggregationBuilder {
    /// Returns the aggregation name.
    pub fn name(&self) -> &str {
        match self {
            AggregationBuilder::Terms { name, .. } => name,
            AggregationBuilder::DateHistogram { name, .. } => name,
        }
    }

    /// Encodes the aggregation body (without its name) as JSON.
    pub fn to_json(&self) -> Value {
        match self {
            AggregationBuilder::Terms { field, .. } => json!({ "terms": { "field": field } }),
            AggregationBuilder::DateHistogram {
                field, interval, ..
            } => json!({
                "date_histogram": { "field": field, "calendar_interval": interval.as_str() }
            }),
        }
    }
}

/// Source filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSource {
    /// Fields to return.
    pub includes: Option<Vec<String>>,
    /// Fields to leave out.
    pub excludes: Option<Vec<String>>,
}

/// The body of a search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSource {
    /// The query.
    pub query: QueryBuilder,
    /// Sorts, in priority order.
    pub sorts: Vec<FieldSort>,
    /// Source filtering.
    pub fetch_source: Option<FetchSource>,
    /// Offset of the first hit.
    pub from: Option<u32>,
    /// Page size.
    pub size: Option<u32>,
    /// Aggregations to compute.
    pub aggregations: Vec<AggregationBuilder>,
    /// Count every match rather than stopping at the default cap.
    pub track_total_hits: bool,
}

impl Default for SearchSource {
    fn default() -> Self {
        Self {
            query: QueryBuilder::MatchAll,
            sorts: Vec::new(),
            fetch_source: None,
            from: None,
            size: None,
            aggregations: Vec::new(),
            track_total_hits: true,
        }
    }
}

impl SearchSource {
    /// Creates a match-all search source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query.
    pub fn query(mut self, query: QueryBuilder) -> Self {
        self.query = query;
        self
    }

    /// Appends a sort.
    pub fn sort(mut self, sort: FieldSort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Sets source filtering.
    pub fn fetch_source(
        mut self,
        includes: Option<Vec<String>>,
        excludes: Option<Vec<String>>,
    ) -> Self {
        self.fetch_source = Some(FetchSource { includes, excludes });
        self
    }

    /// Sets the offset.
    pub fn from(mut self, from: u32) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the page size.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Appends an aggregation.
    pub fn aggregation(mut self, aggregation: AggregationBuilder) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    /// Encodes the search body as JSON.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_json());
        if self.track_total_hits {
            body.insert("track_total_hits".to_string(), json!(true));
        }
        if !self.sorts.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sorts.iter().map(FieldSort::to_json).collect()),
            );
        }
        if let Some(ref source) = self.fetch_source {
            let mut filter = Map::new();
            if let Some(ref includes) = source.includes {
                filter.insert("includes".to_string(), json!(includes));
            }
            if let Some(ref excludes) = source.excludes {
                filter.insert("excludes".to_string(), json!(excludes));
            }
            if !filter.is_empty() {
                body.insert("_source".to_string(), Value::Object(filter));
            }
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.aggregations.is_empty() {
            let aggs: Map<String, Value> = self
                .aggregations
                .iter()
                .map(|agg| (agg.name().to_string(), agg.to_json()))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(body)
    }
}

/// Index a document.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// Target index.
    pub index: String,
    /// Document id. `None` lets the engine assign one.
    pub id: Option<String>,
    /// Document body.
    pub source: Document,
}

/// Partial update, optionally creating the document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Target index.
    pub index: String,
    /// Document id.
    pub id: String,
    /// Fields merged into the stored document.
    pub doc: Document,
    /// Create the document from `doc` when it does not exist.
    pub doc_as_upsert: bool,
}

/// Delete a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Target index.
    pub index: String,
    /// Document id.
    pub id: String,
}

/// Fetch a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    /// Target index.
    pub index: String,
    /// Document id.
    pub id: String,
}

/// Run a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index.
    pub index: String,
    /// Search body.
    pub source: SearchSource,
}

/// Index many documents in one round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest {
    /// Target index.
    pub index: String,
    /// Documents to index.
    pub items: Vec<IndexRequest>,
}
