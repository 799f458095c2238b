//! Quarry Search
//!
//! A search and document layer over Elasticsearch with two interchangeable
//! transports: the REST API and a persistent binary transport. Callers build a
//! [`SearchDescriptor`], hand it to a [`SearchService`], and get back a uniform
//! [`SearchResponse`] regardless of which transport ran the query.
//!
//! # Architecture
//!
//! - [`types`] - descriptors, documents and the uniform result
//! - [`translate`] - the rule engine turning descriptors into a [`QueryPlan`]
//! - [`normalize`] - folds native replies into a [`SearchResponse`]
//! - [`backend`] - the storage and query traits each transport implements
//! - [`backends`] - the REST and transport implementations
//! - [`connection`] - where backends get their clients from
//! - [`service`] - validation, identifier stamping and orchestration
//! - [`metrics`] - raw metrics queries over plain HTTP
//! - [`config`] - configuration from the command line and environment
//! - [`error`] - error types
//!
//! # Tenancy
//!
//! When `QUARRY_ES_CHANNEL` is set, every search is scoped to documents whose
//! `channel` field matches it. The filter is added by the translator, so no
//! caller can leave it out.
//!
//! # Logging
//!
//! Embedding binaries install the subscriber once, at the configured level:
//!
//! ```no_run
//! let config = quarry_search::SearchConfig::from_env();
//! quarry_search::init_logging(&config.log_level);
//! ```
//!
//! # Quick Start
//!
//! ```
//! use quarry_search::{QueryTranslator, SearchDescriptor, SortOrder, TenantFilter};
//! use serde_json::json;
//!
//! let descriptor = SearchDescriptor::new()
//!     .with_query("fractions")
//!     .with_filter_value("status", json!("Live"))
//!     .with_sort("name", SortOrder::Asc)
//!     .with_limit(20);
//!
//! let plan = QueryTranslator::new(TenantFilter::from_config(Some("sunrise")))
//!     .translate(&descriptor)
//!     .unwrap();
//! assert_eq!(plan.size, Some(20));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod backends;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod service;
pub mod translate;
pub mod types;

pub use backend::{
    BackendKind, BulkItem, BulkSummary, DocumentStore, QueryExecutor, SearchBackend, WriteResult,
};
pub use config::{BackendMode, SearchConfig};
pub use error::{ErrorKind, SearchError, SearchResult};
pub use metrics::{MetricsGateway, ResponseEnvelope};
pub use service::SearchService;
pub use translate::{QueryPlan, QueryTranslator, TenantFilter};
pub use types::{
    Constraint, Document, FacetBucket, SaveOutcome, SearchDescriptor, SearchMode, SearchResponse,
    SortOrder,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise this crate logs at `level`. Calling it
/// twice is harmless.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quarry_search={}", level)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging(&SearchConfig::for_testing().log_level);
        init_logging(&SearchConfig::default().log_level);
        tracing::debug!(version = VERSION, "logging initialized");
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
