//! Quarry Telemetry
//!
//! Formats audit, search, log and error events as JSON strings ready to hand
//! to an event sink. Inputs are loose JSON maps, the way callers collect them
//! over a request's lifetime; the output follows the v3 event schema.
//!
//! An empty or missing context or params map yields an empty string rather
//! than an error, so callers can fire and forget.
//!
//! ```
//! use quarry_telemetry::{EventKind, format};
//! use serde_json::{Map, Value, json};
//!
//! let context: Map<String, Value> = json!({
//!     "actorId": "user-1",
//!     "actorType": "User",
//!     "channel": "sunrise",
//!     "env": "search",
//!     "requestId": "req-42"
//! })
//! .as_object()
//! .cloned()
//! .unwrap();
//! let params: Map<String, Value> = json!({"type": "content", "query": "fractions", "size": 3})
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//! let event = format(EventKind::Search, &context, &params);
//! assert!(event.contains("\"eid\":\"SEARCH\""));
//! ```

#![warn(missing_docs)]

mod event;

pub use event::{
    Actor, Correlation, EVENT_VERSION, EventContext, EventKind, Producer, Target, TelemetryEvent,
};

use serde_json::{Map, Value};

/// Keys read from the context and params maps.
pub mod keys {
    #![allow(missing_docs)]

    pub const ACTOR_ID: &str = "actorId";
    pub const ACTOR_TYPE: &str = "actorType";
    pub const REQUEST_ID: &str = "requestId";
    pub const CHANNEL: &str = "channel";
    pub const ENV: &str = "env";
    pub const PDATA_ID: &str = "pdataId";
    pub const PDATA_PID: &str = "pdataPid";
    pub const PDATA_VERSION: &str = "pdataVersion";
    pub const ROLLUP: &str = "rollup";

    pub const TARGET_OBJECT: &str = "targetObject";
    pub const CORRELATED_OBJECTS: &str = "correlatedObjects";
    pub const PROPS: &str = "props";
    pub const CURRENT_STATE: &str = "currentState";
    pub const STATE: &str = "state";

    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const REQUEST: &str = "Request";

    pub const QUERY: &str = "query";
    pub const FILTERS: &str = "filters";
    pub const SORT: &str = "sort";
    pub const SIZE: &str = "size";
    pub const TOPN: &str = "topn";

    pub const LOG_TYPE: &str = "logType";
    pub const LOG_LEVEL: &str = "logLevel";
    pub const MESSAGE: &str = "message";
    pub const LEVEL: &str = "level";
    pub const PARAMS: &str = "params";

    pub const ERROR: &str = "err";
    pub const ERR_TYPE: &str = "errtype";
    pub const STACKTRACE: &str = "stacktrace";
}

type Fields = Map<String, Value>;

/// Formats an event of `kind`, or returns `""` if the input is unusable.
pub fn format(kind: EventKind, context: &Fields, params: &Fields) -> String {
    if context.is_empty() || params.is_empty() {
        return String::new();
    }

    let Some(event) = build_event(kind, context, params) else {
        tracing::warn!(eid = kind.eid(), "Telemetry event dropped: missing target object");
        return String::new();
    };

    match serde_json::to_string(&event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(eid = kind.eid(), error = %e, "Failed to serialize telemetry event");
            String::new()
        }
    }
}

/// Formats an audit event.
pub fn audit(context: &Fields, params: &Fields) -> String {
    format(EventKind::Audit, context, params)
}

/// Formats a search event.
pub fn search(context: &Fields, params: &Fields) -> String {
    format(EventKind::Search, context, params)
}

/// Formats a log event.
pub fn log(context: &Fields, params: &Fields) -> String {
    format(EventKind::Log, context, params)
}

/// Formats an error event.
pub fn error(context: &Fields, params: &Fields) -> String {
    format(EventKind::Error, context, params)
}

/// Builds the event for `kind`. Audit events without a target object yield
/// `None`.
pub fn build_event(kind: EventKind, context: &Fields, params: &Fields) -> Option<TelemetryEvent> {
    let actor = Actor {
        id: string_field(context, keys::ACTOR_ID),
        kind: string_field(context, keys::ACTOR_TYPE),
    };
    let mut event_context = event_context(context);

    let (edata, object) = match kind {
        EventKind::Audit => {
            let target = params.get(keys::TARGET_OBJECT)?.as_object()?;
            if let Some(correlated) = params.get(keys::CORRELATED_OBJECTS) {
                event_context.cdata = correlations(correlated);
            }
            (audit_edata(params, target), Some(target_object(target)))
        }
        EventKind::Search => (search_edata(params), None),
        EventKind::Log => (log_edata(params), None),
        EventKind::Error => (error_edata(params), None),
    };

    if let Some(request_id) =
        string_field(context, keys::REQUEST_ID).filter(|id| !id.trim().is_empty())
    {
        event_context.cdata.push(Correlation {
            id: Value::String(request_id),
            kind: Value::String(keys::REQUEST.to_string()),
        });
    }

    let event = TelemetryEvent::new(kind, actor, event_context, edata);
    Some(match object {
        Some(object) => event.with_object(object),
        None => event,
    })
}

fn string_field(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn non_empty_object(fields: &Fields, key: &str) -> Option<Map<String, Value>> {
    fields
        .get(key)
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .cloned()
}

fn event_context(context: &Fields) -> EventContext {
    EventContext {
        channel: string_field(context, keys::CHANNEL),
        env: string_field(context, keys::ENV),
        pdata: Producer {
            id: string_field(context, keys::PDATA_ID),
            pid: string_field(context, keys::PDATA_PID),
            ver: string_field(context, keys::PDATA_VERSION),
        },
        cdata: Vec::new(),
        rollup: non_empty_object(context, keys::ROLLUP),
    }
}

fn correlations(value: &Value) -> Vec<Correlation> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| Correlation {
                    id: item.get(keys::ID).cloned().unwrap_or(Value::Null),
                    kind: item.get(keys::TYPE).cloned().unwrap_or(Value::Null),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn target_object(target: &Fields) -> Target {
    Target {
        id: string_field(target, keys::ID),
        kind: string_field(target, keys::TYPE),
        rollup: non_empty_object(target, keys::ROLLUP),
    }
}

fn audit_edata(params: &Fields, target: &Fields) -> Fields {
    let props: Vec<Value> = params
        .get(keys::PROPS)
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();

    let mut edata = Map::new();
    edata.insert(keys::PROPS.to_string(), Value::Array(props));
    if let Some(state) = target.get(keys::CURRENT_STATE).filter(|v| !v.is_null()) {
        edata.insert(keys::STATE.to_string(), state.clone());
    }
    edata
}

fn search_edata(params: &Fields) -> Fields {
    let mut edata = Map::new();
    let copy = |edata: &mut Fields, key: &str| {
        edata.insert(
            key.to_string(),
            params.get(key).cloned().unwrap_or(Value::Null),
        );
    };

    copy(&mut edata, keys::TYPE);
    edata.insert(
        keys::QUERY.to_string(),
        params
            .get(keys::QUERY)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    copy(&mut edata, keys::FILTERS);
    copy(&mut edata, keys::SORT);
    copy(&mut edata, keys::SIZE);
    copy(&mut edata, keys::TOPN);
    edata
}

fn log_edata(params: &Fields) -> Fields {
    const CONSUMED: [&str; 3] = [keys::LOG_TYPE, keys::LOG_LEVEL, keys::MESSAGE];

    let rest: Vec<Value> = params
        .iter()
        .filter(|(key, _)| !CONSUMED.contains(&key.as_str()))
        .map(|(key, value)| {
            let mut param = Map::new();
            param.insert(key.clone(), value.clone());
            Value::Object(param)
        })
        .collect();

    let mut edata = Map::new();
    let get = |key: &str| params.get(key).cloned().unwrap_or(Value::Null);
    edata.insert(keys::TYPE.to_string(), get(keys::LOG_TYPE));
    edata.insert(keys::LEVEL.to_string(), get(keys::LOG_LEVEL));
    edata.insert(keys::MESSAGE.to_string(), get(keys::MESSAGE));
    edata.insert(keys::PARAMS.to_string(), Value::Array(rest));
    edata
}

fn error_edata(params: &Fields) -> Fields {
    [keys::ERROR, keys::ERR_TYPE, keys::STACKTRACE]
        .into_iter()
        .map(|key| (key.to_string(), params.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn context() -> Fields {
        fields(json!({
            "actorId": "user-1",
            "actorType": "User",
            "channel": "sunrise",
            "env": "content",
            "pdataId": "quarry",
            "pdataPid": "search-service",
            "pdataVersion": "1.0",
            "requestId": "req-42"
        }))
    }

    fn parse(event: &str) -> Value {
        serde_json::from_str(event).unwrap()
    }

    // ========================================================================
    // Envelope
    // ========================================================================

    #[test]
    fn test_empty_input_yields_empty_string() {
        let params = fields(json!({"type": "content"}));
        assert_eq!(search(&Map::new(), &params), "");
        assert_eq!(search(&context(), &Map::new()), "");
    }

    #[test]
    fn test_envelope_fields() {
        let event = parse(&search(&context(), &fields(json!({"type": "content"}))));

        assert_eq!(event["eid"], "SEARCH");
        assert_eq!(event["ver"], "3.0");
        assert!(event["ets"].as_i64().unwrap() > 0);
        let mid = event["mid"].as_str().unwrap();
        let (prefix, id) = mid.split_once(':').unwrap();
        assert_eq!(prefix, "SEARCH");
        assert!(uuid::Uuid::parse_str(id).is_ok());

        assert_eq!(event["actor"], json!({"id": "user-1", "type": "User"}));
        assert_eq!(event["context"]["channel"], "sunrise");
        assert_eq!(
            event["context"]["pdata"],
            json!({"id": "quarry", "pid": "search-service", "ver": "1.0"})
        );
        assert_eq!(
            event["context"]["cdata"],
            json!([{"id": "req-42", "type": "Request"}])
        );
        assert!(event["context"].get("rollup").is_none());
        assert!(event.get("object").is_none());
    }

    #[test]
    fn test_blank_request_id_not_correlated() {
        let mut ctx = context();
        ctx.insert("requestId".to_string(), json!("  "));
        let event = parse(&log(&ctx, &fields(json!({"logType": "api_access"}))));
        assert_eq!(event["context"]["cdata"], json!([]));
    }

    // ========================================================================
    // Audit
    // ========================================================================

    #[test]
    fn test_audit_event() {
        let params = fields(json!({
            "targetObject": {
                "id": "do_1",
                "type": "Content",
                "currentState": "Live",
                "rollup": {"l1": "course-1"}
            },
            "correlatedObjects": [{"id": "batch-1", "type": "Batch", "extra": true}],
            "props": {"name": "x", "status": "y"}
        }));
        let event = parse(&audit(&context(), &params));

        assert_eq!(event["eid"], "AUDIT");
        assert_eq!(
            event["object"],
            json!({"id": "do_1", "type": "Content", "rollup": {"l1": "course-1"}})
        );
        assert_eq!(
            event["context"]["cdata"],
            json!([
                {"id": "batch-1", "type": "Batch"},
                {"id": "req-42", "type": "Request"}
            ])
        );
        assert_eq!(event["edata"]["props"], json!(["name", "status"]));
        assert_eq!(event["edata"]["state"], "Live");
    }

    #[test]
    fn test_audit_without_target_is_dropped() {
        let params = fields(json!({"props": {"name": "x"}}));
        assert_eq!(audit(&context(), &params), "");
    }

    // ========================================================================
    // Search, log, error
    // ========================================================================

    #[test]
    fn test_search_edata_defaults_query() {
        let params = fields(json!({
            "type": "content",
            "filters": {"status": "Live"},
            "size": 3,
            "topn": [{"identifier": "do_1"}]
        }));
        let event = parse(&search(&context(), &params));

        assert_eq!(event["edata"]["query"], "");
        assert_eq!(event["edata"]["filters"], json!({"status": "Live"}));
        assert_eq!(event["edata"]["sort"], Value::Null);
        assert_eq!(event["edata"]["size"], 3);
    }

    #[test]
    fn test_log_edata_collects_remaining_params() {
        let params = fields(json!({
            "logType": "api_access",
            "logLevel": "INFO",
            "message": "search served",
            "method": "POST",
            "url": "/v1/search"
        }));
        let event = parse(&log(&context(), &params));

        assert_eq!(event["edata"]["type"], "api_access");
        assert_eq!(event["edata"]["level"], "INFO");
        assert_eq!(event["edata"]["message"], "search served");
        assert_eq!(
            event["edata"]["params"],
            json!([{"method": "POST"}, {"url": "/v1/search"}])
        );
    }

    #[test]
    fn test_error_edata() {
        let params = fields(json!({
            "err": "SERVER_ERROR",
            "errtype": "SYSTEM",
            "stacktrace": "at search()"
        }));
        let event = parse(&error(&context(), &params));
        assert_eq!(
            event["edata"],
            json!({"err": "SERVER_ERROR", "errtype": "SYSTEM", "stacktrace": "at search()"})
        );
    }
}
