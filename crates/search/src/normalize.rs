//! Response normalization.
//!
//! Backends first lift their native responses into [`NativeResponse`]; the
//! shared [`normalize`] step then builds the uniform [`SearchResponse`]. Both
//! transports therefore agree on identifier annotation, empty results and
//! facet selection.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::translate::QueryPlan;
use crate::types::{Document, FacetBucket, IDENTIFIER_FIELD, SearchResponse};

/// A single hit as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeHit {
    /// Backend document id.
    pub id: Option<String>,
    /// Stored source, possibly projected.
    pub source: Option<Document>,
}

/// A backend response lifted into a common shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeResponse {
    /// Total hits reported by the backend.
    pub total: Option<u64>,
    /// The hit set. `None` when the backend returned no hit section.
    pub hits: Option<Vec<NativeHit>>,
    /// Buckets per aggregation name, in backend order.
    pub aggregations: BTreeMap<String, Vec<FacetBucket>>,
}

/// Builds the uniform result for a plan.
///
/// An absent hit set or a zero total yields the empty result without looking
/// at anything else.
pub fn normalize(native: NativeResponse, plan: &QueryPlan) -> SearchResponse {
    let Some(hits) = native.hits else {
        return SearchResponse::empty();
    };
    if native.total == Some(0) {
        return SearchResponse::empty();
    }

    let count = native.total.unwrap_or(hits.len() as u64);

    let content = hits
        .into_iter()
        .map(|hit| {
            let mut doc = hit.source.unwrap_or_default();
            if let Some(id) = hit.id {
                doc.entry(IDENTIFIER_FIELD.to_string())
                    .or_insert(Value::String(id));
            }
            doc
        })
        .collect();

    let mut aggregations = native.aggregations;
    let facets = plan
        .facet_names()
        .filter_map(|name| {
            aggregations
                .remove(name)
                .map(|buckets| (name.to_string(), buckets))
        })
        .collect();

    SearchResponse {
        content,
        facets,
        count,
    }
}

/// Formats a bucket key value as a string.
pub(crate) fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{Aggregation, AggregationKind};
    use serde_json::json;

    fn plan_with_facet(name: &str) -> QueryPlan {
        QueryPlan {
            aggregations: vec![Aggregation {
                name: name.to_string(),
                field: format!("{}.raw", name),
                kind: AggregationKind::Terms,
            }],
            ..Default::default()
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_absent_hits_is_empty() {
        let native = NativeResponse {
            total: Some(5),
            hits: None,
            aggregations: BTreeMap::from([(
                "subject".to_string(),
                vec![FacetBucket::new("math", 5)],
            )]),
        };
        assert_eq!(normalize(native, &plan_with_facet("subject")), SearchResponse::empty());
    }

    #[test]
    fn test_zero_total_is_empty() {
        let native = NativeResponse {
            total: Some(0),
            hits: Some(vec![]),
            ..Default::default()
        };
        assert!(normalize(native, &QueryPlan::default()).is_empty());
    }

    #[test]
    fn test_identifier_annotation() {
        let native = NativeResponse {
            total: Some(2),
            hits: Some(vec![
                NativeHit {
                    id: Some("do_1".to_string()),
                    source: Some(doc(json!({"name": "first"}))),
                },
                NativeHit {
                    id: Some("es-id".to_string()),
                    source: Some(doc(json!({"identifier": "do_2"}))),
                },
            ]),
            ..Default::default()
        };
        let response = normalize(native, &QueryPlan::default());
        assert_eq!(response.count, 2);
        assert_eq!(response.identifiers(), vec!["do_1", "do_2"]);
    }

    #[test]
    fn test_facets_follow_plan() {
        let native = NativeResponse {
            total: Some(3),
            hits: Some(vec![NativeHit::default()]),
            aggregations: BTreeMap::from([
                (
                    "subject".to_string(),
                    vec![FacetBucket::new("math", 2), FacetBucket::new("science", 1)],
                ),
                ("stray".to_string(), vec![FacetBucket::new("x", 1)]),
            ]),
        };
        let response = normalize(native, &plan_with_facet("subject"));
        assert_eq!(response.count, 3);
        assert_eq!(response.facets.len(), 1);
        assert_eq!(response.facets["subject"][0], FacetBucket::new("math", 2));
    }

    #[test]
    fn test_bucket_key() {
        assert_eq!(bucket_key(&json!("math")), "math");
        assert_eq!(bucket_key(&json!(1577836800000u64)), "1577836800000");
        assert_eq!(bucket_key(&json!(true)), "true");
    }
}
