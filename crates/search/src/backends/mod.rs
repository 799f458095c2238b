//! Backend implementations.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | REST | `rest` (default) | Query DSL over HTTP via the `elasticsearch` client |
//! | Transport | always | Typed requests over any [`transport::TransportClient`] |
//!
//! Both backends consume the same [`QueryPlan`](crate::translate::QueryPlan)
//! and feed the same normalizer, so equivalent inputs produce equal results.

#[cfg(feature = "rest")]
pub mod rest;

pub mod transport;
