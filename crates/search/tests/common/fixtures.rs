//! Test fixtures.

use std::sync::Arc;

use serde_json::{Value, json};

use quarry_search::backends::transport::TransportBackend;
use quarry_search::{Document, SearchConfig, SearchService};

use super::transport::InMemoryTransport;

/// Converts a JSON object literal into a document.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not an object: {}", other),
    }
}

/// A content document as the catalogue stores it.
pub fn content(id: &str, name: &str, status: &str) -> Document {
    doc(json!({
        "id": id,
        "name": name,
        "status": status,
        "channel": "test-channel",
        "contentType": "Resource",
        "createdOn": "2024-03-01T10:00:00.000Z"
    }))
}

/// Configuration for tests that go through the transport backend.
pub fn transport_config() -> SearchConfig {
    SearchConfig {
        backend: quarry_search::BackendMode::Transport,
        ..SearchConfig::for_testing()
    }
}

/// A service over a shared in-memory transport.
pub fn transport_service(transport: &Arc<InMemoryTransport>) -> SearchService {
    SearchService::new(
        TransportBackend::with_client(Arc::clone(transport)),
        &transport_config(),
    )
}

/// A unique index name per test.
pub fn unique_index(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
