//! Translation rules from [`SearchDescriptor`] to [`QueryPlan`].
//!
//! Rules run in a fixed order because clause order affects scoring:
//!
//! 1. tenant channel (mandatory match)
//! 2. free-text simple query string
//! 3. sort
//! 4. source projection
//! 5. pagination
//! 6. field constraints
//! 7. facets (first group only)

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::UNSET_CHANNEL;
use crate::error::{QueryError, SearchResult};
use crate::types::{
    Constraint, NestedField, SearchDescriptor, SearchMode, SortField, SortSpec,
};

use super::plan::{
    Aggregation, AggregationKind, Clause, Leaf, Occur, Projection, QueryPlan, SortClause,
};

/// Suffix of the unanalyzed variant of a field.
pub const RAW_SUFFIX: &str = ".raw";

/// Pseudo-field that aggregates every searchable field.
pub const ALL_FIELDS: &str = "all_fields";

/// Field holding a document's tenant channel.
pub const TENANT_FIELD: &str = "channel";

/// Facet kind selecting a daily date histogram.
pub const DATE_HISTOGRAM: &str = "date_histogram";

/// Returns the raw (unanalyzed) variant of a field name.
pub fn raw_field(field: &str) -> String {
    format!("{}{}", field, RAW_SUFFIX)
}

/// The tenant channel injected into every search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantFilter(Option<String>);

impl TenantFilter {
    /// No tenant filtering.
    pub fn none() -> Self {
        Self(None)
    }

    /// Builds the filter from a configured value.
    ///
    /// Blank values and the unset placeholder disable filtering.
    pub fn from_config(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() && v != UNSET_CHANNEL => Self(Some(v.to_string())),
            _ => Self(None),
        }
    }

    /// Returns the channel, if filtering is active.
    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Per-field constraint occurrence derived from the search mode.
#[derive(Debug, Default)]
struct ConstraintModes {
    boosts: BTreeMap<String, f32>,
}

impl ConstraintModes {
    fn from_descriptor(descriptor: &SearchDescriptor) -> Self {
        let boosts = match descriptor.mode {
            SearchMode::Exact => BTreeMap::new(),
            SearchMode::Soft => descriptor
                .soft_constraints
                .iter()
                .map(|(field, weight)| (field.clone(), *weight as f32 + 1.0))
                .collect(),
        };
        Self { boosts }
    }

    fn boost(&self, field: &str) -> Option<f32> {
        self.boosts.get(field).copied()
    }

    fn occur(&self, field: &str) -> Occur {
        if self.boosts.contains_key(field) {
            Occur::Should
        } else {
            Occur::Must
        }
    }
}

/// Shared rule engine turning descriptors into query plans.
#[derive(Debug, Clone, Default)]
pub struct QueryTranslator {
    tenant: TenantFilter,
}

impl QueryTranslator {
    /// Creates a translator that injects the given tenant filter.
    pub fn new(tenant: TenantFilter) -> Self {
        Self { tenant }
    }

    /// Returns the tenant filter.
    pub fn tenant_filter(&self) -> &TenantFilter {
        &self.tenant
    }

    /// Translates a descriptor into a query plan.
    pub fn translate(&self, descriptor: &SearchDescriptor) -> SearchResult<QueryPlan> {
        let modes = ConstraintModes::from_descriptor(descriptor);
        let mut plan = QueryPlan::default();

        // 1. tenant
        if let Some(channel) = self.tenant.value() {
            plan.clauses.push(
                Clause::must(Leaf::Match {
                    field: TENANT_FIELD.to_string(),
                    value: Value::String(channel.to_string()),
                })
                .with_boost(modes.boost(TENANT_FIELD)),
            );
        }

        // 2. free text
        if let Some(query) = descriptor.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let fields = if descriptor.query_fields.is_empty() {
                vec![(ALL_FIELDS.to_string(), 1.0)]
            } else {
                descriptor
                    .query_fields
                    .iter()
                    .map(|f| (f.clone(), 1.0))
                    .collect()
            };
            plan.clauses.push(Clause::must(Leaf::SimpleQueryString {
                query: query.to_string(),
                fields,
            }));
        }

        // 3. sort
        for sort_field in &descriptor.sort_by {
            plan.sort.extend(translate_sort(sort_field)?);
        }

        // 4. projection
        plan.projection = Projection {
            includes: descriptor.fields.clone(),
            excludes: descriptor.excluded_fields.clone(),
        };

        // 5. pagination
        plan.from = descriptor.offset;
        plan.size = descriptor.limit;

        // 6. constraints
        for (field, constraint) in &descriptor.filters {
            if field == TENANT_FIELD && self.tenant.value().is_some() {
                tracing::debug!(field = %field, "Ignoring caller tenant constraint");
                continue;
            }
            if let Some(leaf) = constraint_leaf(field, constraint) {
                plan.clauses.push(Clause {
                    occur: modes.occur(field),
                    leaf,
                    boost: modes.boost(field),
                });
            }
        }
        for field in &descriptor.exists {
            plan.clauses.push(Clause::must(Leaf::Exists {
                field: field.clone(),
            }));
        }
        for field in &descriptor.not_exists {
            plan.clauses.push(Clause::must_not(Leaf::Exists {
                field: field.clone(),
            }));
        }
        for nested in &descriptor.nested_exists {
            plan.clauses.push(Clause::must(nested_exists_leaf(nested)));
        }
        for nested in &descriptor.nested_not_exists {
            plan.clauses.push(Clause::must_not(nested_exists_leaf(nested)));
        }

        // 7. facets
        if let Some(group) = descriptor.facets.first() {
            plan.aggregations = group
                .iter()
                .map(|request| Aggregation {
                    name: request.field.clone(),
                    field: raw_field(&request.field),
                    kind: match request.kind.as_deref() {
                        Some(kind) if kind.eq_ignore_ascii_case(DATE_HISTOGRAM) => {
                            AggregationKind::DateHistogram
                        }
                        _ => AggregationKind::Terms,
                    },
                })
                .collect();
        }
        if descriptor.facets.len() > 1 {
            tracing::debug!(
                ignored_groups = descriptor.facets.len() - 1,
                "Only the first facet group is aggregated"
            );
        }

        Ok(plan)
    }
}

fn translate_sort(sort_field: &SortField) -> SearchResult<Vec<SortClause>> {
    let field = &sort_field.field;
    let malformed = |message: &str| QueryError::MalformedSort {
        field: field.clone(),
        message: message.to_string(),
    };

    let Some((path, _)) = field.rsplit_once('.') else {
        return match &sort_field.spec {
            SortSpec::Order(order) => Ok(vec![SortClause::Field {
                field: raw_field(field),
                order: *order,
            }]),
            SortSpec::Nested(_) => {
                Err(malformed("top-level fields take a plain sort order").into())
            }
        };
    };

    let nested = match &sort_field.spec {
        SortSpec::Nested(nested) => nested,
        SortSpec::Order(_) => {
            return Err(malformed("nested fields need a term filter and an order").into());
        }
    };
    let term = nested
        .term
        .as_ref()
        .ok_or_else(|| malformed("nested sort is missing its term filter"))?;

    Ok(term
        .iter()
        .map(|(filter_field, filter_value)| SortClause::Nested {
            field: raw_field(field),
            order: nested.order,
            path: path.to_string(),
            filter_field: filter_field.clone(),
            filter_value: filter_value.clone(),
        })
        .collect())
}

fn lowercase(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn equals_leaf(field: &str, value: &Value) -> Leaf {
    Leaf::Term {
        field: raw_field(field),
        value: lowercase(value),
    }
}

fn any_of_leaf(field: &str, values: &[Value]) -> Option<Leaf> {
    if values.is_empty() {
        return None;
    }
    if values.iter().all(Value::is_string) {
        Some(Leaf::Terms {
            field: raw_field(field),
            values: values.iter().map(lowercase).collect(),
        })
    } else {
        Some(Leaf::Terms {
            field: field.to_string(),
            values: values.to_vec(),
        })
    }
}

fn constraint_leaf(field: &str, constraint: &Constraint) -> Option<Leaf> {
    match constraint {
        Constraint::Equals(value) => Some(equals_leaf(field, value)),
        Constraint::AnyOf(values) => any_of_leaf(field, values),
        Constraint::Range(bounds) => {
            if bounds.is_empty() {
                None
            } else {
                Some(Leaf::Range {
                    field: raw_field(field),
                    bounds: bounds.clone(),
                })
            }
        }
        Constraint::StartsWith(prefix) => Some(Leaf::Prefix {
            field: raw_field(field),
            value: prefix.to_lowercase(),
        }),
        Constraint::EndsWith(suffix) => Some(Leaf::Regexp {
            field: raw_field(field),
            pattern: format!(".*{}", suffix.to_lowercase()),
        }),
        Constraint::AnyMatch(alternatives) => {
            let leaves: Vec<Leaf> = alternatives
                .iter()
                .filter_map(|(alt_field, value)| match value {
                    Value::Array(values) => any_of_leaf(alt_field, values),
                    other => Some(equals_leaf(alt_field, other)),
                })
                .collect();
            if leaves.is_empty() {
                None
            } else {
                Some(Leaf::AnyOf(leaves))
            }
        }
    }
}

fn nested_exists_leaf(nested: &NestedField) -> Leaf {
    Leaf::Nested {
        path: nested.path.clone(),
        query: Box::new(Leaf::Exists {
            field: nested.field.clone(),
        }),
    }
}
