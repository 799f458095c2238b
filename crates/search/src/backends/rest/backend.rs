//! REST backend handle.

use std::fmt::{self, Debug};
use std::sync::Arc;

use elasticsearch::Elasticsearch;
use elasticsearch::http::response::Response;

use crate::backend::{BackendKind, SearchBackend};
use crate::config::SearchConfig;
use crate::connection::{ConnectionProvider, RestConnection};
use crate::error::{BackendError, SearchError, SearchResult};

pub(crate) const BACKEND_NAME: &str = "rest";

/// Search backend speaking the Elasticsearch REST API.
#[derive(Clone)]
pub struct RestBackend {
    provider: Arc<dyn ConnectionProvider<Client = Elasticsearch>>,
}

impl Debug for RestBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestBackend")
            .field("provider", &self.provider)
            .finish()
    }
}

impl RestBackend {
    /// Creates a backend over a connection provider.
    pub fn new(provider: impl ConnectionProvider<Client = Elasticsearch> + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Builds the REST client from configuration.
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let connection = RestConnection::new(config.rest_connection_config())?;
        Ok(Self::new(connection))
    }

    /// Returns a client handle from the provider.
    pub(crate) fn client(&self) -> SearchResult<Elasticsearch> {
        self.provider.client()
    }
}

impl SearchBackend for RestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest
    }
}

pub(crate) fn internal_error(message: String) -> SearchError {
    SearchError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}

pub(crate) fn unparsable(message: String) -> SearchError {
    SearchError::Backend(BackendError::UnparsableResponse {
        backend_name: BACKEND_NAME.to_string(),
        message,
    })
}

/// Turns a non-success response into a request error carrying its body.
pub(crate) async fn request_failed(action: &str, response: Response) -> SearchError {
    let status = response.status_code().as_u16();
    let body = response.text().await.unwrap_or_default();
    SearchError::Backend(BackendError::Request {
        backend_name: BACKEND_NAME.to_string(),
        status,
        message: format!("{} failed: {}", action, body),
    })
}

/// Reads a response body as JSON.
pub(crate) async fn json_body(action: &str, response: Response) -> SearchResult<serde_json::Value> {
    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| unparsable(format!("Failed to parse {} response: {}", action, e)))
}
