//! Elasticsearch REST backend.
//!
//! Plans are rendered to Query DSL JSON ([`query::render_search_body`]) and
//! sent with the official `elasticsearch` client. Writes go through the
//! document APIs; bulk indexing uses the `_bulk` endpoint.
//!
//! This backend has no wait ceiling of its own. Timeouts come from the
//! client's request timeout.
//!
//! # Example
//!
//! ```no_run
//! use quarry_search::SearchConfig;
//! use quarry_search::backends::rest::RestBackend;
//!
//! # fn example() -> quarry_search::SearchResult<()> {
//! let backend = RestBackend::from_config(&SearchConfig::from_env())?;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod query;
mod response;
mod search_impl;
mod storage;

pub use backend::RestBackend;
pub use response::parse_search_response;
