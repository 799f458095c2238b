//! Uniform result types shared by both backends.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document body: field name to value.
pub type Document = serde_json::Map<String, Value>;

/// Field stamped onto every written document and every returned hit.
pub const IDENTIFIER_FIELD: &str = "identifier";

/// One facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    /// Bucket key (term value, or formatted date for histograms).
    pub key: String,
    /// Number of matching documents in the bucket.
    pub count: u64,
}

impl FacetBucket {
    /// Creates a bucket.
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Uniform search result.
///
/// The empty result (`Default`) has an empty content list, an empty facet map
/// and a zero count; neither collection is ever absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching documents in backend order, each carrying its identifier.
    pub content: Vec<Document>,
    /// Buckets per facet field, in backend order.
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
    /// Total matching documents, independent of pagination.
    pub count: u64,
}

impl SearchResponse {
    /// Returns the empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.content.is_empty()
    }

    /// Returns the identifiers of the returned documents, in order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|doc| doc.get(IDENTIFIER_FIELD).and_then(Value::as_str))
            .collect()
    }
}

/// Outcome of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// The document was written under this identifier.
    Saved(String),
    /// The input was rejected before reaching the backend.
    Rejected,
}

impl SaveOutcome {
    /// Sentinel returned for rejected saves.
    pub const SENTINEL: &'static str = "ERROR";

    /// Returns the saved identifier, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            SaveOutcome::Saved(id) => Some(id),
            SaveOutcome::Rejected => None,
        }
    }

    /// Returns true if the document was written.
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved(id) => f.write_str(id),
            SaveOutcome::Rejected => f.write_str(Self::SENTINEL),
        }
    }
}
