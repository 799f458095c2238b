//! The transport client seam.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{BackendError, SearchError};

use super::request::{
    BulkRequest, DeleteRequest, GetRequest, IndexRequest, SearchRequest, UpdateRequest,
};
use super::response::{BulkResponse, GetResponse, TransportSearchResponse, WriteResponse};

/// Failures reported by a transport client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No cluster node could be reached.
    #[error("no node available: {0}")]
    NoNodeAvailable(String),

    /// The engine rejected the request.
    #[error("remote failure (status {status}): {message}")]
    Remote {
        /// HTTP-equivalent status code.
        status: u16,
        /// Reason reported by the engine.
        message: String,
    },

    /// The engine's reply could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Returns true for a missing-document or missing-index rejection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Remote { status: 404, .. })
    }
}

impl From<TransportError> for SearchError {
    fn from(err: TransportError) -> Self {
        let backend_name = "transport".to_string();
        SearchError::Backend(match err {
            TransportError::NoNodeAvailable(message) => BackendError::Unavailable {
                backend_name,
                message,
            },
            TransportError::Remote { status, message } => BackendError::Request {
                backend_name,
                status,
                message,
            },
            TransportError::Malformed(message) => BackendError::UnparsableResponse {
                backend_name,
                message,
            },
        })
    }
}

/// A client for the engine's persistent transport protocol.
///
/// Each call resolves exactly once. Implementations own connection handling
/// and any retry policy.
#[async_trait]
pub trait TransportClient: Send + Sync + Debug {
    /// Indexes one document, replacing any stored version.
    async fn index(&self, request: IndexRequest) -> Result<WriteResponse, TransportError>;

    /// Merges fields into a stored document. A missing document is a
    /// `Remote` 404 unless the request asks for an upsert.
    async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError>;

    /// Deletes one document.
    async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError>;

    /// Fetches one document.
    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError>;

    /// Runs a search.
    async fn search(
        &self,
        request: SearchRequest,
    ) -> Result<TransportSearchResponse, TransportError>;

    /// Indexes many documents in one round trip.
    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, TransportError>;

    /// Returns true if the index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, TransportError>;

    /// Makes recent writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), TransportError>;
}

/// Shared handle to a transport client.
pub type SharedTransport = Arc<dyn TransportClient>;

#[async_trait]
impl<T: TransportClient + ?Sized> TransportClient for Arc<T> {
    async fn index(&self, request: IndexRequest) -> Result<WriteResponse, TransportError> {
        (**self).index(request).await
    }

    async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError> {
        (**self).update(request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
        (**self).delete(request).await
    }

    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
        (**self).get(request).await
    }

    async fn search(
        &self,
        request: SearchRequest,
    ) -> Result<TransportSearchResponse, TransportError> {
        (**self).search(request).await
    }

    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, TransportError> {
        (**self).bulk(request).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        (**self).index_exists(index).await
    }

    async fn refresh(&self, index: &str) -> Result<(), TransportError> {
        (**self).refresh(index).await
    }
}
