//! Raw metrics queries.
//!
//! [`MetricsGateway`] posts a caller-supplied query body straight to the
//! engine's search endpoint and wraps the reply in a [`ResponseEnvelope`].
//! It bypasses the query translator and the tenant filter, and it blocks the
//! calling thread. Async callers should run it under
//! `tokio::task::spawn_blocking`.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::{BackendError, SearchResult};

const BACKEND_NAME: &str = "metrics";

/// Standard response envelope for raw metrics results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Unique id of this response.
    pub id: String,
    /// Envelope version.
    pub ver: String,
    /// Creation time, RFC 3339.
    pub ts: String,
    /// Always `OK` for a parsed reply.
    pub response_code: String,
    /// The parsed engine reply under the key `response`.
    pub result: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Wraps a parsed engine reply.
    pub fn ok(response: Map<String, Value>) -> Self {
        let mut result = Map::new();
        result.insert("response".to_string(), Value::Object(response));
        Self {
            id: Uuid::new_v4().to_string(),
            ver: "v1".to_string(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            response_code: "OK".to_string(),
            result,
        }
    }

    /// Returns the wrapped engine reply.
    pub fn response(&self) -> Option<&Map<String, Value>> {
        self.result.get("response").and_then(Value::as_object)
    }
}

/// Synchronous gateway for literal metrics queries.
#[derive(Debug, Clone)]
pub struct MetricsGateway {
    client: Client,
    base_url: String,
}

impl MetricsGateway {
    /// Creates a gateway using the configured metrics base URL.
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.metrics_base_url(),
        })
    }

    /// Returns the base URL queries are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `raw_query` to the search endpoint of `index`.
    ///
    /// The body is parsed whatever the HTTP status, since the engine reports
    /// its own failures as JSON.
    pub fn search_metrics_data(
        &self,
        index: &str,
        raw_query: &str,
    ) -> SearchResult<ResponseEnvelope> {
        let url = format!("{}/{}/_doc/_search", self.base_url, index);
        tracing::debug!(url = %url, "Posting metrics query");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(raw_query.to_string())
            .send()
            .map_err(|e| BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| BackendError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message: e.to_string(),
        })?;

        let parsed: Map<String, Value> =
            serde_json::from_str(&body).map_err(|e| BackendError::UnparsableResponse {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::warn!(
                index = %index,
                status = status.as_u16(),
                "Metrics query returned an error status"
            );
        }
        Ok(ResponseEnvelope::ok(parsed))
    }
}
