//! Connection providers.
//!
//! The search layer never manages connections itself. A provider hands out a
//! client handle per operation; the handle is created once and shared, and
//! host discovery, pooling and reconnects stay with the client library.

use std::fmt::Debug;

use crate::error::SearchResult;

/// Supplies a live client handle for a backend.
pub trait ConnectionProvider: Send + Sync + Debug {
    /// Client handle type.
    type Client;

    /// Returns a handle to the backend.
    fn client(&self) -> SearchResult<Self::Client>;
}

/// Hands out clones of a client built once at startup.
#[derive(Debug, Clone)]
pub struct SharedConnection<C> {
    client: C,
}

impl<C> SharedConnection<C> {
    /// Wraps an existing client.
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C> ConnectionProvider for SharedConnection<C>
where
    C: Clone + Send + Sync + Debug,
{
    type Client = C;

    fn client(&self) -> SearchResult<C> {
        Ok(self.client.clone())
    }
}

#[cfg(feature = "rest")]
pub use rest::RestConnection;

#[cfg(feature = "rest")]
mod rest {
    use std::fmt;
    use std::time::Duration;

    use elasticsearch::Elasticsearch;
    use elasticsearch::auth::Credentials;
    use elasticsearch::cert::CertificateValidation;
    use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};

    use crate::config::{RestAuth, RestConnectionConfig};
    use crate::error::{BackendError, SearchResult};

    use super::ConnectionProvider;

    /// Provides the Elasticsearch REST client.
    #[derive(Clone)]
    pub struct RestConnection {
        client: Elasticsearch,
        config: RestConnectionConfig,
    }

    impl fmt::Debug for RestConnection {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("RestConnection")
                .field("nodes", &self.config.nodes)
                .field("request_timeout_ms", &self.config.request_timeout_ms)
                .finish_non_exhaustive()
        }
    }

    impl RestConnection {
        /// Builds the client from configuration.
        pub fn new(config: RestConnectionConfig) -> SearchResult<Self> {
            let client = build_client(&config)?;
            Ok(Self { client, config })
        }

        /// Returns the connection configuration.
        pub fn config(&self) -> &RestConnectionConfig {
            &self.config
        }
    }

    impl ConnectionProvider for RestConnection {
        type Client = Elasticsearch;

        fn client(&self) -> SearchResult<Elasticsearch> {
            Ok(self.client.clone())
        }
    }

    fn connection_failed(message: String) -> BackendError {
        BackendError::Unavailable {
            backend_name: "rest".to_string(),
            message,
        }
    }

    fn build_client(config: &RestConnectionConfig) -> SearchResult<Elasticsearch> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url = url
            .parse()
            .map_err(|e| connection_failed(format!("Invalid URL {}: {}", url, e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                RestAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                RestAuth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
            };
        }

        let transport = builder
            .build()
            .map_err(|e| connection_failed(format!("Failed to build transport: {}", e)))?;

        tracing::info!(node = %url, "Elasticsearch REST client ready");
        Ok(Elasticsearch::new(transport))
    }
}
