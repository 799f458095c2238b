//! The protocol-agnostic search request descriptor.
//!
//! A [`SearchDescriptor`] is plain data. It says what to search for without
//! saying how any backend should express it; the translator turns it into a
//! query plan.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort order for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Parses a caller-supplied order string.
    ///
    /// Only `asc` (any case) is ascending; every other value sorts descending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    /// Returns the wire name of the order.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SortOrder::parse(s))
    }
}

/// Sort specification for nested (dotted-path) fields.
///
/// `term` selects which nested objects take part in the sort. It is optional
/// here so that loosely typed input can be carried through; translation
/// rejects a nested sort without one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NestedSort {
    /// Subfield/value pairs the nested objects must match.
    #[serde(default)]
    pub term: Option<BTreeMap<String, Value>>,
    /// Sort order.
    #[serde(default)]
    pub order: SortOrder,
}

/// How a single sort field is ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// A plain order, for top-level fields.
    Order(SortOrder),
    /// A nested sort with a term filter, for dotted paths.
    Nested(NestedSort),
}

impl SortSpec {
    /// Converts a loosely typed sort value.
    ///
    /// Strings become plain orders. Objects become nested sorts reading the
    /// `term` and `order` keys.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let term = map.get("term").and_then(Value::as_object).map(|t| {
                    t.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<BTreeMap<_, _>>()
                });
                let order = map
                    .get("order")
                    .and_then(Value::as_str)
                    .map(SortOrder::parse)
                    .unwrap_or_default();
                SortSpec::Nested(NestedSort { term, order })
            }
            Value::String(s) => SortSpec::Order(SortOrder::parse(s)),
            _ => SortSpec::Order(SortOrder::Desc),
        }
    }
}

/// One entry of the ordered sort list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Field name, possibly a dotted nested path.
    pub field: String,
    /// How the field is ordered.
    pub spec: SortSpec,
}

/// Bounds for a range constraint. Any combination may be set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl RangeBounds {
    /// Returns true if no bound is set.
    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }
}

/// A constraint on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// The field equals a value.
    Equals(Value),
    /// The field equals one of the values.
    AnyOf(Vec<Value>),
    /// The field falls inside a range.
    Range(RangeBounds),
    /// The field starts with a prefix.
    StartsWith(String),
    /// The field ends with a suffix.
    EndsWith(String),
    /// At least one of several field/value pairs matches.
    AnyMatch(BTreeMap<String, Value>),
}

impl Constraint {
    /// Converts a loosely typed filter value.
    ///
    /// - arrays become [`Constraint::AnyOf`]
    /// - objects with `<`, `<=`, `>`, `>=` keys become [`Constraint::Range`]
    /// - objects with `startsWith` or `endsWith` become prefix/suffix matches
    /// - any other object becomes [`Constraint::AnyMatch`]
    /// - scalars become [`Constraint::Equals`]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(values) => Constraint::AnyOf(values),
            Value::Object(map) => {
                if let Some(prefix) = map.get("startsWith").and_then(Value::as_str) {
                    return Constraint::StartsWith(prefix.to_string());
                }
                if let Some(suffix) = map.get("endsWith").and_then(Value::as_str) {
                    return Constraint::EndsWith(suffix.to_string());
                }

                let bounds = RangeBounds {
                    gt: map.get(">").cloned(),
                    gte: map.get(">=").cloned(),
                    lt: map.get("<").cloned(),
                    lte: map.get("<=").cloned(),
                };
                if !bounds.is_empty() {
                    return Constraint::Range(bounds);
                }

                Constraint::AnyMatch(map.into_iter().collect())
            }
            other => Constraint::Equals(other),
        }
    }
}

/// A field inside a nested object path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedField {
    /// Path of the nested object.
    pub path: String,
    /// Field (relative or absolute) inside the nested object.
    pub field: String,
}

/// How constraints affect matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Every constraint must match.
    #[default]
    Exact,
    /// Fields listed in the soft constraints only boost relevance.
    Soft,
}

/// A single facet request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRequest {
    /// Field to bucket on.
    pub field: String,
    /// Aggregation kind; `None` means terms.
    #[serde(default)]
    pub kind: Option<String>,
}

/// An ordered group of facet requests.
pub type FacetGroup = Vec<FacetRequest>;

/// A protocol-agnostic search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDescriptor {
    /// Free-text query. Empty means match all.
    pub query: Option<String>,

    /// Fields the free-text query is weighted against. Empty means all fields.
    pub query_fields: BTreeSet<String>,

    /// Field constraints.
    pub filters: BTreeMap<String, Constraint>,

    /// Fields that must be present.
    pub exists: Vec<String>,

    /// Fields that must be absent.
    pub not_exists: Vec<String>,

    /// Nested fields that must be present.
    pub nested_exists: Vec<NestedField>,

    /// Nested fields that must be absent.
    pub nested_not_exists: Vec<NestedField>,

    /// Constraint mode flag.
    pub mode: SearchMode,

    /// Field weights used when `mode` is [`SearchMode::Soft`].
    pub soft_constraints: BTreeMap<String, u32>,

    /// Ordered sort fields.
    pub sort_by: Vec<SortField>,

    /// Facet groups. Only the first group is aggregated.
    pub facets: Vec<FacetGroup>,

    /// Fields to include in returned documents.
    pub fields: Option<Vec<String>>,

    /// Fields to exclude from returned documents.
    pub excluded_fields: Option<Vec<String>>,

    /// Number of hits to skip.
    pub offset: Option<u32>,

    /// Maximum number of hits to return.
    pub limit: Option<u32>,
}

impl SearchDescriptor {
    /// Creates an empty descriptor that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the free-text query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds a field to weight the free-text query against.
    pub fn with_query_field(mut self, field: impl Into<String>) -> Self {
        self.query_fields.insert(field.into());
        self
    }

    /// Adds a typed constraint.
    pub fn with_filter(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.filters.insert(field.into(), constraint);
        self
    }

    /// Adds a loosely typed constraint. See [`Constraint::from_value`].
    pub fn with_filter_value(self, field: impl Into<String>, value: Value) -> Self {
        self.with_filter(field, Constraint::from_value(value))
    }

    /// Requires a field to be present.
    pub fn with_exists(mut self, field: impl Into<String>) -> Self {
        self.exists.push(field.into());
        self
    }

    /// Requires a field to be absent.
    pub fn with_not_exists(mut self, field: impl Into<String>) -> Self {
        self.not_exists.push(field.into());
        self
    }

    /// Requires a nested field to be present.
    pub fn with_nested_exists(mut self, path: impl Into<String>, field: impl Into<String>) -> Self {
        self.nested_exists.push(NestedField {
            path: path.into(),
            field: field.into(),
        });
        self
    }

    /// Requires a nested field to be absent.
    pub fn with_nested_not_exists(
        mut self,
        path: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.nested_not_exists.push(NestedField {
            path: path.into(),
            field: field.into(),
        });
        self
    }

    /// Switches to soft matching with the given field weights.
    pub fn with_soft_constraints(
        mut self,
        weights: impl IntoIterator<Item = (String, u32)>,
    ) -> Self {
        self.mode = SearchMode::Soft;
        self.soft_constraints.extend(weights);
        self
    }

    /// Appends a plain sort field.
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by.push(SortField {
            field: field.into(),
            spec: SortSpec::Order(order),
        });
        self
    }

    /// Appends a nested sort field.
    pub fn with_nested_sort(
        mut self,
        field: impl Into<String>,
        term: impl IntoIterator<Item = (String, Value)>,
        order: SortOrder,
    ) -> Self {
        self.sort_by.push(SortField {
            field: field.into(),
            spec: SortSpec::Nested(NestedSort {
                term: Some(term.into_iter().collect()),
                order,
            }),
        });
        self
    }

    /// Appends a sort field from a loosely typed value. See [`SortSpec::from_value`].
    pub fn with_sort_value(mut self, field: impl Into<String>, value: &Value) -> Self {
        self.sort_by.push(SortField {
            field: field.into(),
            spec: SortSpec::from_value(value),
        });
        self
    }

    /// Appends a facet group.
    pub fn with_facet_group(
        mut self,
        group: impl IntoIterator<Item = (String, Option<String>)>,
    ) -> Self {
        self.facets.push(
            group
                .into_iter()
                .map(|(field, kind)| FacetRequest { field, kind })
                .collect(),
        );
        self
    }

    /// Adds a facet to the first group, creating it if needed.
    pub fn with_facet(mut self, field: impl Into<String>, kind: Option<&str>) -> Self {
        let request = FacetRequest {
            field: field.into(),
            kind: kind.map(str::to_string),
        };
        match self.facets.first_mut() {
            Some(group) => group.push(request),
            None => self.facets.push(vec![request]),
        }
        self
    }

    /// Sets the inclusion projection.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the exclusion projection.
    pub fn with_excluded_fields(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.excluded_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the pagination offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the pagination limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
