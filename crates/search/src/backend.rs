//! Backend abstraction.
//!
//! A backend is split along the same lines as the operations it serves:
//! [`DocumentStore`] covers single-document writes, reads and bulk indexing,
//! and [`QueryExecutor`] runs translated query plans. [`SearchBackend`] ties
//! the two together and names the transport.
//!
//! Backends report raw outcomes ([`WriteResult`], `Option<Document>`); the
//! service layer decides what those mean for callers.

use std::fmt::{self, Debug};

use async_trait::async_trait;

use crate::error::SearchResult;
use crate::translate::QueryPlan;
use crate::types::{Document, SearchResponse};

/// Identifies the transport a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// HTTP Query DSL.
    Rest,
    /// Persistent binary transport.
    Transport,
}

impl BackendKind {
    /// Returns the name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Rest => "rest",
            BackendKind::Transport => "transport",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of a single-document write as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteResult {
    /// A new document was stored.
    Created,
    /// An existing document changed.
    Updated,
    /// The document was removed.
    Deleted,
    /// No document with that identifier exists.
    NotFound,
    /// The write left the document unchanged.
    Noop,
}

impl WriteResult {
    /// Parses the engine's lowercase result name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Some(WriteResult::Created),
            "updated" => Some(WriteResult::Updated),
            "deleted" => Some(WriteResult::Deleted),
            "not_found" => Some(WriteResult::NotFound),
            "noop" => Some(WriteResult::Noop),
            _ => None,
        }
    }
}

/// One document in a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    /// Document id; `None` lets the engine assign one.
    pub id: Option<String>,
    /// Document body.
    pub document: Document,
}

/// Result of one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Items sent.
    pub submitted: usize,
    /// Items the engine rejected.
    pub failed: usize,
}

impl BulkSummary {
    /// Returns true if every item was accepted.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Single-document storage and bulk indexing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Indexes a document under `id`, replacing any existing one.
    async fn index(&self, index: &str, id: &str, document: Document) -> SearchResult<WriteResult>;

    /// Merges `document` into an existing document.
    ///
    /// Reports [`WriteResult::NotFound`] if the document does not exist.
    async fn update(&self, index: &str, id: &str, document: Document)
    -> SearchResult<WriteResult>;

    /// Merges `document` into the stored document, creating it if absent.
    async fn upsert(&self, index: &str, id: &str, document: Document)
    -> SearchResult<WriteResult>;

    /// Deletes a document.
    async fn delete(&self, index: &str, id: &str) -> SearchResult<WriteResult>;

    /// Fetches a document's source, or `None` if absent.
    async fn get(&self, index: &str, id: &str) -> SearchResult<Option<Document>>;

    /// Sends one bulk index request.
    async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> SearchResult<BulkSummary>;

    /// Returns true if the index exists.
    async fn index_exists(&self, index: &str) -> SearchResult<bool>;

    /// Makes recent writes visible to search.
    async fn refresh(&self, index: &str) -> SearchResult<()>;
}

/// Query plan execution.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Renders and runs a plan against `index`, returning the uniform result.
    async fn search(&self, index: &str, plan: &QueryPlan) -> SearchResult<SearchResponse>;
}

/// A complete search backend.
pub trait SearchBackend: DocumentStore + QueryExecutor + Debug {
    /// Returns the transport this backend speaks.
    fn kind(&self) -> BackendKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Rest.to_string(), "rest");
        assert_eq!(BackendKind::Transport.to_string(), "transport");
    }

    #[test]
    fn test_write_result_parse() {
        assert_eq!(WriteResult::parse("created"), Some(WriteResult::Created));
        assert_eq!(WriteResult::parse("NOOP"), Some(WriteResult::Noop));
        assert_eq!(WriteResult::parse("not_found"), Some(WriteResult::NotFound));
        assert_eq!(WriteResult::parse("exploded"), None);
    }

    #[test]
    fn test_bulk_summary() {
        let summary = BulkSummary {
            submitted: 3,
            failed: 1,
        };
        assert!(!summary.all_succeeded());
        assert!(BulkSummary::default().all_succeeded());
    }
}
