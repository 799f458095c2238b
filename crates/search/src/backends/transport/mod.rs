//! Persistent transport backend.
//!
//! Plans are rendered into typed requests ([`request::SearchSource`] and
//! friends) and handed to a [`TransportClient`]. Update, upsert, delete and
//! get are bounded by [`WAIT_TIME`]; a call that exceeds it fails with a
//! timeout error.

mod backend;
mod client;
pub mod render;
pub mod request;
pub mod response;

pub use backend::{TransportBackend, WAIT_TIME};
pub use client::{SharedTransport, TransportClient, TransportError};
