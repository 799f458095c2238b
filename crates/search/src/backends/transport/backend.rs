//! Transport backend.

use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    BackendKind, BulkItem, BulkSummary, DocumentStore, QueryExecutor, SearchBackend, WriteResult,
};
use crate::connection::{ConnectionProvider, SharedConnection};
use crate::error::{BackendError, SearchError, SearchResult};
use crate::normalize::normalize;
use crate::translate::QueryPlan;
use crate::types::{Document, SearchResponse};

use super::client::{SharedTransport, TransportClient, TransportError};
use super::render::render_search_source;
use super::request::{
    BulkRequest, DeleteRequest, GetRequest, IndexRequest, SearchRequest, UpdateRequest,
};

/// Wait ceiling for update, upsert, delete and get.
pub const WAIT_TIME: Duration = Duration::from_secs(30);

const BACKEND_NAME: &str = "transport";

/// Search backend speaking the persistent transport protocol.
pub struct TransportBackend {
    provider: Arc<dyn ConnectionProvider<Client = SharedTransport>>,
    wait_ceiling: Duration,
}

impl Debug for TransportBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBackend")
            .field("provider", &self.provider)
            .field("wait_ceiling", &self.wait_ceiling)
            .finish()
    }
}

impl TransportBackend {
    /// Creates a backend over a connection provider.
    pub fn new(provider: impl ConnectionProvider<Client = SharedTransport> + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            wait_ceiling: WAIT_TIME,
        }
    }

    /// Creates a backend sharing a single client.
    pub fn with_client(client: impl TransportClient + 'static) -> Self {
        let client: SharedTransport = Arc::new(client);
        Self::new(SharedConnection::new(client))
    }

    /// Overrides the wait ceiling.
    pub fn with_wait_ceiling(mut self, wait_ceiling: Duration) -> Self {
        self.wait_ceiling = wait_ceiling;
        self
    }

    /// Returns the wait ceiling.
    pub fn wait_ceiling(&self) -> Duration {
        self.wait_ceiling
    }

    fn client(&self) -> SearchResult<SharedTransport> {
        self.provider.client()
    }

    /// Waits for a transport call, failing once the ceiling expires.
    async fn within<T, F>(&self, operation: &str, call: F) -> SearchResult<T>
    where
        F: Future<Output = Result<T, TransportError>> + Send,
    {
        match tokio::time::timeout(self.wait_ceiling, call).await {
            Ok(result) => result.map_err(SearchError::from),
            Err(_) => Err(SearchError::Backend(BackendError::Timeout {
                backend_name: BACKEND_NAME.to_string(),
                operation: operation.to_string(),
                timeout_ms: self.wait_ceiling.as_millis() as u64,
            })),
        }
    }

    async fn update_request(
        &self,
        operation: &str,
        request: UpdateRequest,
    ) -> SearchResult<WriteResult> {
        let client = self.client()?;
        match self.within(operation, client.update(request)).await {
            Ok(response) => Ok(response.result),
            Err(SearchError::Backend(BackendError::Request { status: 404, .. })) => {
                Ok(WriteResult::NotFound)
            }
            Err(e) => Err(e),
        }
    }
}

impl SearchBackend for TransportBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Transport
    }
}

#[async_trait]
impl DocumentStore for TransportBackend {
    async fn index(&self, index: &str, id: &str, document: Document) -> SearchResult<WriteResult> {
        let response = self
            .client()?
            .index(IndexRequest {
                index: index.to_string(),
                id: Some(id.to_string()),
                source: document,
            })
            .await?;
        Ok(response.result)
    }

    async fn update(
        &self,
        index: &str,
        id: &str,
        document: Document,
    ) -> SearchResult<WriteResult> {
        self.update_request(
            "update",
            UpdateRequest {
                index: index.to_string(),
                id: id.to_string(),
                doc: document,
                doc_as_upsert: false,
            },
        )
        .await
    }

    async fn upsert(
        &self,
        index: &str,
        id: &str,
        document: Document,
    ) -> SearchResult<WriteResult> {
        self.update_request(
            "upsert",
            UpdateRequest {
                index: index.to_string(),
                id: id.to_string(),
                doc: document,
                doc_as_upsert: true,
            },
        )
        .await
    }

    async fn delete(&self, index: &str, id: &str) -> SearchResult<WriteResult> {
        let client = self.client()?;
        let request = DeleteRequest {
            index: index.to_string(),
            id: id.to_string(),
        };
        match self.within("delete", client.delete(request)).await {
            Ok(response) => Ok(response.result),
            Err(SearchError::Backend(BackendError::Request { status: 404, .. })) => {
                Ok(WriteResult::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, index: &str, id: &str) -> SearchResult<Option<Document>> {
        let client = self.client()?;
        let request = GetRequest {
            index: index.to_string(),
            id: id.to_string(),
        };
        match self.within("get", client.get(request)).await {
            Ok(response) if response.found => Ok(response.source),
            Ok(_) => Ok(None),
            Err(SearchError::Backend(BackendError::Request { status: 404, .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> SearchResult<BulkSummary> {
        let submitted = items.len();
        let request = BulkRequest {
            index: index.to_string(),
            items: items
                .into_iter()
                .map(|item| IndexRequest {
                    index: index.to_string(),
                    id: item.id,
                    source: item.document,
                })
                .collect(),
        };

        let response = self.client()?.bulk(request).await?;
        for failure in response.failures() {
            tracing::warn!(
                index = %index,
                identifier = failure.id.as_deref().unwrap_or(""),
                error = failure.failure.as_deref().unwrap_or(""),
                "Bulk item rejected"
            );
        }

        Ok(BulkSummary {
            submitted,
            failed: response.failures().count(),
        })
    }

    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        Ok(self.client()?.index_exists(index).await?)
    }

    async fn refresh(&self, index: &str) -> SearchResult<()> {
        Ok(self.client()?.refresh(index).await?)
    }
}

#[async_trait]
impl QueryExecutor for TransportBackend {
    async fn search(&self, index: &str, plan: &QueryPlan) -> SearchResult<SearchResponse> {
        let source = render_search_source(plan);
        tracing::debug!(index = %index, query = %source.to_json(), "Executing transport search");

        let response = self
            .client()?
            .search(SearchRequest {
                index: index.to_string(),
                source,
            })
            .await?;

        Ok(normalize(response.into_native(), plan))
    }
}
