//! Telemetry event envelope.

use serde::Serialize;
use serde_json::{Map, Value};

/// Event schema version.
pub const EVENT_VERSION: &str = "3.0";

/// The kind of telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A change to a tracked object.
    Audit,
    /// A search request.
    Search,
    /// A log line.
    Log,
    /// A failure.
    Error,
}

impl EventKind {
    /// Returns the `eid` string for this kind.
    pub fn eid(&self) -> &'static str {
        match self {
            EventKind::Audit => "AUDIT",
            EventKind::Search => "SEARCH",
            EventKind::Log => "LOG",
            EventKind::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.eid())
    }
}

/// Who triggered the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Actor {
    /// Actor id.
    pub id: Option<String>,
    /// Actor type, such as `User` or `System`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// The producing system.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Producer {
    /// Producing system.
    pub id: Option<String>,
    /// Producing component.
    pub pid: Option<String>,
    /// Producer version.
    pub ver: Option<String>,
}

/// A correlated object reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    /// Correlated object id.
    pub id: Value,
    /// Correlated object type.
    #[serde(rename = "type")]
    pub kind: Value,
}

/// Where the event happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventContext {
    /// Tenant channel.
    pub channel: Option<String>,
    /// Environment the event belongs to.
    pub env: Option<String>,
    /// Producer.
    pub pdata: Producer,
    /// Correlated objects.
    pub cdata: Vec<Correlation>,
    /// Hierarchy rollup, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup: Option<Map<String, Value>>,
}

/// The object an audit event is about.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Target {
    /// Object id.
    pub id: Option<String>,
    /// Object type.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Object rollup, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup: Option<Map<String, Value>>,
}

/// A complete telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    /// Event kind, such as `AUDIT`.
    pub eid: String,
    /// Milliseconds since the Unix epoch.
    pub ets: i64,
    /// Event format version.
    pub ver: String,
    /// `<eid>:<uuid>`
    pub mid: String,
    /// Who caused the event.
    pub actor: Actor,
    /// Where the event happened.
    pub context: EventContext,
    /// Object the event is about. Audit events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Target>,
    /// Kind-specific payload.
    pub edata: Map<String, Value>,
}

impl TelemetryEvent {
    /// Creates an event stamped with the current time and a fresh message id.
    pub fn new(
        kind: EventKind,
        actor: Actor,
        context: EventContext,
        edata: Map<String, Value>,
    ) -> Self {
        Self {
            eid: kind.eid().to_string(),
            ets: chrono::Utc::now().timestamp_millis(),
            ver: EVENT_VERSION.to_string(),
            mid: format!("{}:{}", kind.eid(), uuid::Uuid::new_v4()),
            actor,
            context,
            object: None,
            edata,
        }
    }

    /// Attaches the audited object.
    pub fn with_object(mut self, object: Target) -> Self {
        self.object = Some(object);
        self
    }
}
