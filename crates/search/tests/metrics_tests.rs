//! Raw metrics gateway tests against a local stub server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::json;

use quarry_search::{ErrorKind, MetricsGateway, ResponseEnvelope, SearchConfig, SearchResult};

// ============================================================================
// Stub server
// ============================================================================

/// What the stub saw: index, content type and body of each request.
type Seen = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

#[derive(Clone)]
struct Stub {
    seen: Seen,
    status: StatusCode,
    reply: &'static str,
}

async fn handle(
    State(stub): State<Stub>,
    Path(index): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    stub.seen.lock().push((
        index,
        content_type,
        String::from_utf8_lossy(&body).into_owned(),
    ));
    (stub.status, stub.reply)
}

/// Starts a stub answering `/{index}/_doc/_search` with `status` and `reply`.
async fn start_stub(status: StatusCode, reply: &'static str) -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/{index}/_doc/_search", post(handle))
        .with_state(Stub {
            seen: Arc::clone(&seen),
            status,
            reply,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn config_for(addr: SocketAddr) -> SearchConfig {
    SearchConfig {
        es_url: format!("http://{}", addr),
        ..SearchConfig::for_testing()
    }
}

/// The blocking client must be built, used and dropped off the async runtime.
async fn query(config: SearchConfig, index: &str, raw: &str) -> SearchResult<ResponseEnvelope> {
    let index = index.to_string();
    let raw = raw.to_string();
    tokio::task::spawn_blocking(move || {
        MetricsGateway::from_config(&config)?.search_metrics_data(&index, &raw)
    })
    .await
    .unwrap()
}

// ============================================================================
// Gateway
// ============================================================================

#[tokio::test]
async fn test_posts_literal_query_and_wraps_reply() {
    let (addr, seen) = start_stub(
        StatusCode::OK,
        r#"{"took":2,"hits":{"total":{"value":7},"hits":[]},"aggregations":{"by_day":{"buckets":[]}}}"#,
    )
    .await;
    let raw = r#"{"size":0,"aggs":{"by_day":{"date_histogram":{"field":"createdOn","calendar_interval":"1d"}}}}"#;

    let envelope = query(config_for(addr), "content", raw).await.unwrap();

    assert_eq!(envelope.ver, "v1");
    assert_eq!(envelope.response_code, "OK");
    let response = envelope.response().unwrap();
    assert_eq!(response["took"], 2);
    assert_eq!(response["hits"]["total"]["value"], 7);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "content");
    assert_eq!(seen[0].1.as_deref(), Some("application/json"));
    assert_eq!(seen[0].2, raw);
}

#[tokio::test]
async fn test_error_status_with_json_body_is_wrapped() {
    let (addr, _) = start_stub(
        StatusCode::NOT_FOUND,
        r#"{"error":{"type":"index_not_found_exception"},"status":404}"#,
    )
    .await;

    let envelope = query(config_for(addr), "missing", "{}").await.unwrap();
    let response = envelope.response().unwrap();
    assert_eq!(response["status"], 404);
    assert_eq!(response["error"], json!({"type": "index_not_found_exception"}));
}

#[tokio::test]
async fn test_unparsable_reply() {
    let (addr, _) = start_stub(StatusCode::OK, "<html>bad gateway</html>").await;

    let err = query(config_for(addr), "content", "{}").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnparsableResponse);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = query(config_for(addr), "content", "{}").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
}

#[test]
fn test_first_host_wins_over_url() {
    let config = SearchConfig {
        es_url: "http://ignored:9200/".to_string(),
        es_hosts: Some(" ,metrics-a,metrics-b".to_string()),
        es_metrics_port: 9300,
        ..SearchConfig::for_testing()
    };
    let gateway = MetricsGateway::from_config(&config).unwrap();
    assert_eq!(gateway.base_url(), "http://metrics-a:9300");

    let config = SearchConfig {
        es_url: "http://localhost:9200/".to_string(),
        ..SearchConfig::for_testing()
    };
    let gateway = MetricsGateway::from_config(&config).unwrap();
    assert_eq!(gateway.base_url(), "http://localhost:9200");
}
