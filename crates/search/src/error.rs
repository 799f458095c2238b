//! Error types for the search layer.
//!
//! Errors are grouped by where they are detected: input validation happens
//! before any network call, query errors are raised while translating a
//! descriptor, and backend errors come back from a transport.
//!
//! "Not found" is never an error here. Deletes and lookups report a missing
//! document through their normal return values.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SearchResult<T> = Result<T, SearchError>;

/// The primary error type for all search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Input rejected before contacting a backend
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Descriptor could not be translated into a query
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Backend or transport failures
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Input validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("index name must not be blank")]
    BlankIndex,

    #[error("document identifier must not be blank")]
    BlankIdentifier,

    /// Document body missing or empty where one is required.
    #[error("invalid data for {operation}: {message}")]
    InvalidData { operation: String, message: String },

    /// Configuration rejected by `SearchConfig::validate`.
    #[error("invalid configuration: {}", .errors.join("; "))]
    InvalidConfig { errors: Vec<String> },
}

/// Structural problems found while translating a descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("malformed sort on '{field}': {message}")]
    MalformedSort { field: String, message: String },
}

/// Errors reported by a backend transport.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A call exceeded its wait ceiling.
    #[error("{operation} on {backend_name} timed out after {timeout_ms}ms")]
    Timeout {
        backend_name: String,
        operation: String,
        timeout_ms: u64,
    },

    /// The backend answered with a failure status.
    #[error("{backend_name} request failed (status {status}): {message}")]
    Request {
        backend_name: String,
        status: u16,
        message: String,
    },

    /// The backend answered with a body that could not be parsed.
    #[error("unparsable response from {backend_name}: {message}")]
    UnparsableResponse {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Coarse error taxonomy shared by both transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    BackendUnavailable,
    Timeout,
    MalformedQuery,
    UnparsableResponse,
    Backend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedQuery => "malformed_query",
            ErrorKind::UnparsableResponse => "unparsable_response",
            ErrorKind::Backend => "backend",
        };
        write!(f, "{}", name)
    }
}

impl SearchError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Validation(_) => ErrorKind::InvalidInput,
            SearchError::Query(_) => ErrorKind::MalformedQuery,
            SearchError::Backend(err) => match err {
                BackendError::Unavailable { .. } => ErrorKind::BackendUnavailable,
                BackendError::Timeout { .. } => ErrorKind::Timeout,
                BackendError::UnparsableResponse { .. } => ErrorKind::UnparsableResponse,
                BackendError::Request { .. } | BackendError::Internal { .. } => {
                    ErrorKind::Backend
                }
            },
        }
    }

    /// Returns true if the input was rejected before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }

    /// Returns true if a wait ceiling expired.
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Backend(BackendError::UnparsableResponse {
            backend_name: "unknown".to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "rest")]
impl From<elasticsearch::Error> for SearchError {
    fn from(err: elasticsearch::Error) -> Self {
        // Errors from the client itself are connection or transport level;
        // HTTP failures arrive as responses and are mapped by status.
        SearchError::Backend(BackendError::Unavailable {
            backend_name: "rest".to_string(),
            message: err.to_string(),
        })
    }
}
