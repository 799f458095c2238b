//! Lifts `_search` response JSON into the shared normalizer input.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::normalize::{NativeHit, NativeResponse, bucket_key, normalize};
use crate::translate::QueryPlan;
use crate::types::{FacetBucket, SearchResponse};

/// Builds the uniform result from a raw `_search` response body.
pub fn parse_search_response(body: &Value, plan: &QueryPlan) -> SearchResponse {
    normalize(lift(body), plan)
}

fn lift(body: &Value) -> NativeResponse {
    let hit_section = body.get("hits");

    // `hits.total` is an object in 7.x+ and a bare number in older clusters.
    let total = hit_section
        .and_then(|h| h.get("total"))
        .and_then(|t| t.get("value").and_then(Value::as_u64).or_else(|| t.as_u64()));

    let hits = hit_section
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .map(|hit| NativeHit {
                    id: hit.get("_id").and_then(Value::as_str).map(str::to_string),
                    source: hit.get("_source").and_then(Value::as_object).cloned(),
                })
                .collect()
        });

    let aggregations = body
        .get("aggregations")
        .and_then(Value::as_object)
        .map(|aggs| {
            aggs.iter()
                .map(|(name, agg)| (name.clone(), buckets(agg)))
                .collect()
        })
        .unwrap_or_else(BTreeMap::new);

    NativeResponse {
        total,
        hits,
        aggregations,
    }
}

fn buckets(agg: &Value) -> Vec<FacetBucket> {
    agg.get("buckets")
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .map(|bucket| {
                    let key = bucket
                        .get("key_as_string")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| bucket.get("key").map(bucket_key))
                        .unwrap_or_default();
                    let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
                    FacetBucket { key, count }
                })
                .collect()
        })
        .unwrap_or_default()
}
