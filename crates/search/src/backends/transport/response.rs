//! Typed responses for the transport protocol.

use serde_json::Value;

use crate::backend::WriteResult;
use crate::normalize::{NativeHit, NativeResponse, bucket_key};
use crate::types::{Document, FacetBucket};

/// Outcome of an index, update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResponse {
    /// Id of the written document.
    pub id: String,
    /// What the write did.
    pub result: WriteResult,
}

/// Outcome of a get.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResponse {
    /// Requested id.
    pub id: String,
    /// Whether the document exists.
    pub found: bool,
    /// Stored body, when found.
    pub source: Option<Document>,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Returned source, subject to source filtering.
    pub source: Option<Document>,
}

/// The hit section of a search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Total matches, independent of paging.
    pub total: u64,
    /// Hits on this page.
    pub hits: Vec<SearchHit>,
}

/// One aggregation bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Raw bucket key.
    pub key: Value,
    /// Formatted key, set for date buckets.
    pub key_as_string: Option<String>,
    /// Documents in the bucket.
    pub doc_count: u64,
}

/// A named aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    /// Aggregation name.
    pub name: String,
    /// Buckets in engine order.
    pub buckets: Vec<Bucket>,
}

/// A search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportSearchResponse {
    /// `None` when the engine returned no hit section.
    pub hits: Option<SearchHits>,
    /// Aggregation results.
    pub aggregations: Vec<AggregationResult>,
}

impl TransportSearchResponse {
    /// Lifts the response into the shared normalizer input.
    pub fn into_native(self) -> NativeResponse {
        let (total, hits) = match self.hits {
            Some(section) => (
                Some(section.total),
                Some(
                    section
                        .hits
                        .into_iter()
                        .map(|hit| NativeHit {
                            id: Some(hit.id),
                            source: hit.source,
                        })
                        .collect(),
                ),
            ),
            None => (None, None),
        };

        let aggregations = self
            .aggregations
            .into_iter()
            .map(|agg| {
                let buckets = agg
                    .buckets
                    .into_iter()
                    .map(|b| FacetBucket {
                        key: b.key_as_string.unwrap_or_else(|| bucket_key(&b.key)),
                        count: b.doc_count,
                    })
                    .collect();
                (agg.name, buckets)
            })
            .collect();

        NativeResponse {
            total,
            hits,
            aggregations,
        }
    }
}

/// Per-item result of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResponse {
    /// Id of the item, if the engine reported one.
    pub id: Option<String>,
    /// Failure message, if the item was rejected.
    pub failure: Option<String>,
}

/// A bulk response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Per-item results, in request order.
    pub items: Vec<BulkItemResponse>,
}

impl BulkResponse {
    /// Returns true if any item was rejected.
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|item| item.failure.is_some())
    }

    /// Returns the rejected items.
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemResponse> {
        self.items.iter().filter(|item| item.failure.is_some())
    }
}
