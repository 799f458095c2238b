//! The public search service.
//!
//! [`SearchService`] is the single entry point for callers. It validates input
//! before any network call, stamps identifiers onto written documents, injects
//! the tenant filter through its translator, and maps backend outcomes to the
//! values callers see. Every operation is an `async fn` whose future resolves
//! exactly once.
//!
//! # Example
//!
//! ```no_run
//! use quarry_search::{SearchConfig, SearchDescriptor, SearchService};
//!
//! # async fn example() -> quarry_search::SearchResult<()> {
//! let config = SearchConfig::from_env();
//! let service = SearchService::connect(&config, None)?;
//!
//! let response = service
//!     .search(&SearchDescriptor::new().with_query("fractions").with_limit(10), "content")
//!     .await?;
//! println!("{} matches", response.count);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::backend::{BackendKind, BulkItem, SearchBackend, WriteResult};
use crate::backends::transport::{SharedTransport, TransportBackend};
use crate::config::{BackendMode, SearchConfig};
use crate::error::{BackendError, SearchError, SearchResult, ValidationError};
use crate::translate::QueryTranslator;
use crate::types::{
    Constraint, Document, IDENTIFIER_FIELD, SaveOutcome, SearchDescriptor, SearchResponse,
};

/// Field holding the caller's own id on bulk and by-id lookups.
const ID_FIELD: &str = "id";

/// Ids per lookup search; the engine's default `max_result_window`.
pub const MAX_IDS_PER_LOOKUP: usize = 10_000;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn log_failure(operation: &str, index: &str, identifier: &str, error: &SearchError) {
    tracing::error!(
        operation,
        index = %index,
        identifier = %identifier,
        kind = %error.kind(),
        error = %error,
        "Search operation failed"
    );
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_blank(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Search and document operations over a configured backend.
#[derive(Debug, Clone)]
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    translator: QueryTranslator,
    bulk_batch_size: usize,
    health_index: String,
}

impl SearchService {
    /// Creates a service over a backend.
    pub fn new(backend: impl SearchBackend + 'static, config: &SearchConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    /// Creates a service over a shared backend.
    pub fn with_backend(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        Self {
            backend,
            translator: QueryTranslator::new(config.tenant_filter()),
            bulk_batch_size: config.bulk_batch_size.max(1),
            health_index: config.health_index.clone(),
        }
    }

    /// Creates the backend selected by `config.backend`.
    ///
    /// The configuration is validated first. The transport backend needs a
    /// client; the REST backend builds its own from the configuration.
    pub fn connect(
        config: &SearchConfig,
        transport: Option<SharedTransport>,
    ) -> SearchResult<Self> {
        config.validate().map_err(|errors| {
            tracing::error!(errors = ?errors, "Configuration rejected");
            ValidationError::InvalidConfig { errors }
        })?;

        let backend: Arc<dyn SearchBackend> = match config.backend {
            BackendMode::Transport => {
                let client = transport.ok_or_else(|| BackendError::Unavailable {
                    backend_name: BackendKind::Transport.name().to_string(),
                    message: "no transport client supplied".to_string(),
                })?;
                Arc::new(TransportBackend::with_client(client))
            }
            #[cfg(feature = "rest")]
            BackendMode::Rest => Arc::new(crate::backends::rest::RestBackend::from_config(config)?),
            #[cfg(not(feature = "rest"))]
            BackendMode::Rest => {
                return Err(BackendError::Unavailable {
                    backend_name: BackendKind::Rest.name().to_string(),
                    message: "built without the `rest` feature".to_string(),
                }
                .into());
            }
        };

        tracing::info!(
            backend = %config.backend,
            tenant = config.tenant_filter().value().unwrap_or("<none>"),
            "Search service configured"
        );
        Ok(Self::with_backend(backend, config))
    }

    /// Returns the backend transport.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Returns the translator (and thus the tenant filter) in use.
    pub fn translator(&self) -> &QueryTranslator {
        &self.translator
    }

    /// Stores a document under `identifier`.
    ///
    /// Blank index or identifier yields [`SaveOutcome::Rejected`] without
    /// contacting the backend.
    pub async fn save(
        &self,
        index: &str,
        identifier: &str,
        mut document: Document,
    ) -> SearchResult<SaveOutcome> {
        if is_blank(index) || is_blank(identifier) {
            tracing::warn!(
                index = %index,
                identifier = %identifier,
                "Save rejected: blank index or identifier",
            );
            return Ok(SaveOutcome::Rejected);
        }

        let start = Instant::now();
        tracing::debug!(index = %index, identifier = %identifier, "save started");

        document.insert(
            IDENTIFIER_FIELD.to_string(),
            Value::String(identifier.to_string()),
        );
        self.backend
            .index(index, identifier, document)
            .await
            .inspect_err(|e| log_failure("save", index, identifier, e))?;

        tracing::debug!(
            index = %index,
            identifier = %identifier,
            elapsed_ms = elapsed_ms(start),
            "save finished",
        );
        Ok(SaveOutcome::Saved(identifier.to_string()))
    }

    /// Merges `document` into an existing document.
    ///
    /// Returns false if the document does not exist.
    pub async fn update(
        &self,
        index: &str,
        identifier: &str,
        mut document: Document,
    ) -> SearchResult<bool> {
        validate_target(index, identifier)
            .inspect_err(|e| log_failure("update", index, identifier, e))?;

        let start = Instant::now();
        tracing::debug!(index = %index, identifier = %identifier, "update started");

        document.insert(
            IDENTIFIER_FIELD.to_string(),
            Value::String(identifier.to_string()),
        );
        let result = self
            .backend
            .update(index, identifier, document)
            .await
            .inspect_err(|e| log_failure("update", index, identifier, e))?;

        tracing::debug!(
            index = %index,
            identifier = %identifier,
            result = ?result,
            elapsed_ms = elapsed_ms(start),
            "update finished",
        );
        Ok(matches!(result, WriteResult::Updated | WriteResult::Noop))
    }

    /// Merges `document` into the stored document, creating it if absent.
    pub async fn upsert(
        &self,
        index: &str,
        identifier: &str,
        mut document: Document,
    ) -> SearchResult<bool> {
        validate_target(index, identifier)
            .and_then(|_| {
                if document.is_empty() {
                    Err(ValidationError::InvalidData {
                        operation: "upsert".to_string(),
                        message: "document must not be empty".to_string(),
                    }
                    .into())
                } else {
                    Ok(())
                }
            })
            .inspect_err(|e| log_failure("upsert", index, identifier, e))?;

        let start = Instant::now();
        tracing::debug!(index = %index, identifier = %identifier, "upsert started");

        document.insert(
            IDENTIFIER_FIELD.to_string(),
            Value::String(identifier.to_string()),
        );
        let result = self
            .backend
            .upsert(index, identifier, document)
            .await
            .inspect_err(|e| log_failure("upsert", index, identifier, e))?;

        tracing::debug!(
            index = %index,
            identifier = %identifier,
            result = ?result,
            elapsed_ms = elapsed_ms(start),
            "upsert finished",
        );
        Ok(matches!(
            result,
            WriteResult::Created | WriteResult::Updated | WriteResult::Noop
        ))
    }

    /// Deletes a document. Returns false if it did not exist.
    pub async fn delete(&self, index: &str, identifier: &str) -> SearchResult<bool> {
        if is_blank(index) || is_blank(identifier) {
            tracing::warn!(
                index = %index,
                identifier = %identifier,
                "Delete skipped: blank index or identifier",
            );
            return Ok(false);
        }

        let start = Instant::now();
        tracing::debug!(index = %index, identifier = %identifier, "delete started");

        let result = self
            .backend
            .delete(index, identifier)
            .await
            .inspect_err(|e| log_failure("delete", index, identifier, e))?;

        tracing::debug!(
            index = %index,
            identifier = %identifier,
            result = ?result,
            elapsed_ms = elapsed_ms(start),
            "delete finished",
        );
        Ok(result == WriteResult::Deleted)
    }

    /// Fetches a document, or an empty mapping if it does not exist.
    pub async fn get_data_by_identifier(
        &self,
        index: &str,
        identifier: &str,
    ) -> SearchResult<Document> {
        if is_blank(index) || is_blank(identifier) {
            tracing::warn!(
                index = %index,
                identifier = %identifier,
                "Lookup skipped: blank index or identifier",
            );
            return Ok(Document::new());
        }

        let start = Instant::now();
        let document = self
            .backend
            .get(index, identifier)
            .await
            .inspect_err(|e| log_failure("get", index, identifier, e))?;

        tracing::debug!(
            index = %index,
            identifier = %identifier,
            found = document.is_some(),
            elapsed_ms = elapsed_ms(start),
            "get finished"
        );
        Ok(document.unwrap_or_default())
    }

    /// Runs a search, scoped to the configured tenant.
    pub async fn search(
        &self,
        descriptor: &SearchDescriptor,
        index: &str,
    ) -> SearchResult<SearchResponse> {
        if is_blank(index) {
            let err = SearchError::from(ValidationError::BlankIndex);
            log_failure("search", index, "", &err);
            return Err(err);
        }

        let start = Instant::now();
        let plan = self
            .translator
            .translate(descriptor)
            .inspect_err(|e| log_failure("search", index, "", e))?;

        let response = self
            .backend
            .search(index, &plan)
            .await
            .inspect_err(|e| log_failure("search", index, "", e))?;

        tracing::debug!(
            index = %index,
            count = response.count,
            returned = response.content.len(),
            elapsed_ms = elapsed_ms(start),
            "search finished"
        );
        Ok(response)
    }

    /// Runs a search on its own task and returns its handle.
    pub fn spawn_search(
        &self,
        descriptor: SearchDescriptor,
        index: impl Into<String>,
    ) -> JoinHandle<SearchResult<SearchResponse>> {
        let service = self.clone();
        let index = index.into();
        tokio::spawn(async move { service.search(&descriptor, &index).await })
    }

    /// Indexes many documents in batches.
    ///
    /// Each document gets an `identifier`, copied from `id` when absent.
    /// Rejected items are logged, not reported; the result is false only when
    /// a batch could not be submitted.
    pub async fn bulk_insert(&self, index: &str, documents: Vec<Document>) -> SearchResult<bool> {
        if is_blank(index) {
            let err = SearchError::from(ValidationError::BlankIndex);
            log_failure("bulk_insert", index, "", &err);
            return Err(err);
        }
        if documents.is_empty() {
            return Ok(true);
        }

        let start = Instant::now();
        let total = documents.len();
        tracing::debug!(index = %index, documents = total, "bulk insert started");

        let items: Vec<BulkItem> = documents
            .into_iter()
            .map(|mut document| {
                if !document.contains_key(IDENTIFIER_FIELD) {
                    if let Some(id) = document.get(ID_FIELD).cloned() {
                        document.insert(IDENTIFIER_FIELD.to_string(), id);
                    }
                }
                let id = document.get(IDENTIFIER_FIELD).and_then(value_as_id);
                BulkItem { id, document }
            })
            .collect();

        let mut rejected = 0;
        let mut remaining = items.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<BulkItem> = remaining.by_ref().take(self.bulk_batch_size).collect();
            match self.backend.bulk_index(index, batch).await {
                Ok(summary) => rejected += summary.failed,
                Err(e) => {
                    log_failure("bulk_insert", index, "", &e);
                    return Ok(false);
                }
            }
        }

        if let Err(e) = self.backend.refresh(index).await {
            tracing::warn!(index = %index, error = %e, "Refresh after bulk insert failed");
        }

        tracing::debug!(
            index = %index,
            documents = total,
            rejected,
            elapsed_ms = elapsed_ms(start),
            "bulk insert finished"
        );
        Ok(true)
    }

    /// Fetches documents by their `id` field, keyed by that id.
    ///
    /// `fields` restricts the returned fields; empty means all. Long id lists
    /// are looked up [`MAX_IDS_PER_LOOKUP`] at a time.
    pub async fn get_results_by_ids(
        &self,
        ids: &[String],
        fields: &[String],
        index: &str,
    ) -> SearchResult<BTreeMap<String, Document>> {
        let projection = (!fields.is_empty()).then(|| {
            let mut projection = fields.to_vec();
            if !projection.iter().any(|f| f == ID_FIELD) {
                projection.push(ID_FIELD.to_string());
            }
            projection
        });

        let mut results = BTreeMap::new();
        for chunk in ids.chunks(MAX_IDS_PER_LOOKUP) {
            let mut descriptor = SearchDescriptor::new()
                .with_filter(
                    ID_FIELD,
                    Constraint::AnyOf(chunk.iter().cloned().map(Value::String).collect()),
                )
                .with_limit(chunk.len() as u32);
            if let Some(ref projection) = projection {
                descriptor = descriptor.with_fields(projection.clone());
            }

            let response = self.search(&descriptor, index).await?;
            results.extend(response.content.into_iter().filter_map(|doc| {
                let key = doc
                    .get(ID_FIELD)
                    .and_then(value_as_id)
                    .or_else(|| doc.get(IDENTIFIER_FIELD).and_then(value_as_id))?;
                Some((key, doc))
            }));
        }
        Ok(results)
    }

    /// Returns true if the backend is reachable and the health index exists.
    pub async fn health_check(&self) -> SearchResult<bool> {
        match self.backend.index_exists(&self.health_index).await {
            Ok(exists) => {
                if !exists {
                    tracing::warn!(index = %self.health_index, "Health index missing");
                }
                Ok(exists)
            }
            Err(e) => {
                tracing::warn!(index = %self.health_index, error = %e, "Health check failed");
                Ok(false)
            }
        }
    }
}

fn validate_target(index: &str, identifier: &str) -> SearchResult<()> {
    if is_blank(index) {
        return Err(ValidationError::BlankIndex.into());
    }
    if is_blank(identifier) {
        return Err(ValidationError::BlankIdentifier.into());
    }
    Ok(())
}
