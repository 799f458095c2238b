//! Search layer configuration.
//!
//! Configuration is an explicit value handed to the service, the translator
//! and the metrics gateway at construction time. It can be built from
//! environment variables, from command line arguments, or programmatically.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QUARRY_BACKEND` | rest | Backend transport (`rest` or `transport`) |
//! | `QUARRY_ES_URL` | http://localhost:9200 | Elasticsearch node URL |
//! | `QUARRY_ES_HOSTS` | | Comma-separated hosts used for raw metrics queries |
//! | `QUARRY_ES_METRICS_PORT` | 9200 | Port paired with `QUARRY_ES_HOSTS` |
//! | `QUARRY_ES_CHANNEL` | | Tenant channel injected into every search |
//! | `QUARRY_ES_USERNAME` | | Basic auth user |
//! | `QUARRY_ES_PASSWORD` | | Basic auth password |
//! | `QUARRY_ES_BEARER_TOKEN` | | Bearer token (takes precedence over basic auth) |
//! | `QUARRY_REQUEST_TIMEOUT_MS` | 30000 | Client request timeout |
//! | `QUARRY_HEALTH_INDEX` | user | Index queried by health checks |
//! | `QUARRY_BULK_BATCH_SIZE` | 10000 | Documents per bulk request |
//! | `QUARRY_LOG_LEVEL` | info | Log level |
//! | `QUARRY_DISABLE_CERT_VALIDATION` | false | Skip TLS validation |
//!
//! # Example
//!
//! ```rust
//! use quarry_search::SearchConfig;
//!
//! let config = SearchConfig {
//!     channel: Some("tenant-a".to_string()),
//!     ..Default::default()
//! };
//! assert_eq!(config.tenant_filter().value(), Some("tenant-a"));
//! ```

use std::fmt;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::translate::TenantFilter;

/// Placeholder value meaning "no tenant channel configured".
///
/// Deployments that template their environment leave the key name itself in
/// place when no channel is set, so the literal key is treated as unset.
pub const UNSET_CHANNEL: &str = "quarry_es_channel";

/// Which backend transport executes requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// HTTP Query DSL backend.
    #[default]
    Rest,
    /// Persistent binary transport backend.
    Transport,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Rest => write!(f, "rest"),
            BackendMode::Transport => write!(f, "transport"),
        }
    }
}

/// Configuration for the search layer.
#[derive(Debug, Clone, Parser)]
#[command(name = "quarry")]
#[command(about = "Dual-transport search abstraction layer")]
pub struct SearchConfig {
    /// Backend transport to use.
    #[arg(long, env = "QUARRY_BACKEND", value_enum, default_value = "rest")]
    pub backend: BackendMode,

    /// Elasticsearch node URL.
    #[arg(long, env = "QUARRY_ES_URL", default_value = "http://localhost:9200")]
    pub es_url: String,

    /// Comma-separated Elasticsearch hosts for raw metrics queries.
    #[arg(long, env = "QUARRY_ES_HOSTS")]
    pub es_hosts: Option<String>,

    /// Port used with `es_hosts`.
    #[arg(long, env = "QUARRY_ES_METRICS_PORT", default_value = "9200")]
    pub es_metrics_port: u16,

    /// Tenant channel injected into every search.
    #[arg(long, env = "QUARRY_ES_CHANNEL")]
    pub channel: Option<String>,

    /// Basic auth username.
    #[arg(long, env = "QUARRY_ES_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password.
    #[arg(long, env = "QUARRY_ES_PASSWORD")]
    pub password: Option<String>,

    /// Bearer token.
    #[arg(long, env = "QUARRY_ES_BEARER_TOKEN")]
    pub bearer_token: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, env = "QUARRY_REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Index whose existence signals a healthy backend.
    #[arg(long, env = "QUARRY_HEALTH_INDEX", default_value = "user")]
    pub health_index: String,

    /// Number of documents sent per bulk request.
    #[arg(long, env = "QUARRY_BULK_BATCH_SIZE", default_value = "10000")]
    pub bulk_batch_size: usize,

    /// Log level (error, warn, info, debug, trace) for [`crate::init_logging`].
    #[arg(long, env = "QUARRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Disable TLS certificate validation. Development only.
    #[arg(long, env = "QUARRY_DISABLE_CERT_VALIDATION", default_value = "false")]
    pub disable_certificate_validation: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Rest,
            es_url: "http://localhost:9200".to_string(),
            es_hosts: None,
            es_metrics_port: 9200,
            channel: None,
            username: None,
            password: None,
            bearer_token: None,
            request_timeout_ms: 30000,
            health_index: "user".to_string(),
            bulk_batch_size: 10000,
            log_level: "info".to_string(),
            disable_certificate_validation: false,
        }
    }
}

impl SearchConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults when parsing fails.
    ///
    /// The host process's own arguments are never parsed.
    pub fn from_env() -> Self {
        match Self::try_parse_from([env!("CARGO_PKG_NAME")]) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Invalid QUARRY_* environment, using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Returns the tenant filter injected into every search.
    pub fn tenant_filter(&self) -> TenantFilter {
        TenantFilter::from_config(self.channel.as_deref())
    }

    /// Returns the base URL for raw metrics queries.
    ///
    /// The first entry of `es_hosts` wins when present; otherwise `es_url`.
    pub fn metrics_base_url(&self) -> String {
        let first_host = self
            .es_hosts
            .as_deref()
            .and_then(|hosts| hosts.split(',').map(str::trim).find(|h| !h.is_empty()));

        match first_host {
            Some(host) => format!("http://{}:{}", host, self.es_metrics_port),
            None => self.es_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the connection settings for the REST client.
    pub fn rest_connection_config(&self) -> RestConnectionConfig {
        let auth = match (&self.bearer_token, &self.username, &self.password) {
            (Some(token), _, _) => Some(RestAuth::Bearer {
                token: token.clone(),
            }),
            (None, Some(username), Some(password)) => Some(RestAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        RestConnectionConfig {
            nodes: vec![self.es_url.clone()],
            request_timeout_ms: self.request_timeout_ms,
            auth,
            disable_certificate_validation: self.disable_certificate_validation,
        }
    }

    /// Validates the configuration and returns errors if any.
    ///
    /// [`SearchService::connect`](crate::SearchService::connect) refuses a
    /// configuration that fails here.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.es_url.starts_with("http://") || self.es_url.starts_with("https://")) {
            errors.push(format!("ES URL must be http(s): {}", self.es_url));
        }

        if self.request_timeout_ms == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.bulk_batch_size == 0 {
            errors.push("Bulk batch size cannot be 0".to_string());
        }

        if self.health_index.trim().is_empty() {
            errors.push("Health index cannot be blank".to_string());
        }

        if self.username.is_some() != self.password.is_some() {
            errors.push("Username and password must be set together".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            channel: Some("test-channel".to_string()),
            request_timeout_ms: 5000,
            bulk_batch_size: 100,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }
}

/// Authentication for the REST client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Connection settings for the REST client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConnectionConfig {
    /// Node URLs. The first node is used (single-node connection pool).
    pub nodes: Vec<String>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<RestAuth>,

    /// Whether to disable certificate validation (default: false).
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for RestConnectionConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}
