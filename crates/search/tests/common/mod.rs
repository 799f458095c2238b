//! Shared test infrastructure for the search layer.
//!
//! - [`fixtures`] - documents and configurations
//! - [`transport`] - an in-memory transport client

#![allow(dead_code)]

pub mod fixtures;
pub mod transport;

pub use fixtures::*;
pub use transport::*;
