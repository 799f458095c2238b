//! Core value types.
//!
//! - [`SearchDescriptor`] - what to search for
//! - [`SearchResponse`] - the uniform result shape
//! - [`Document`] - a document body

mod descriptor;
mod response;

pub use descriptor::{
    Constraint, FacetGroup, FacetRequest, NestedField, NestedSort, RangeBounds, SearchDescriptor,
    SearchMode, SortField, SortOrder, SortSpec,
};
pub use response::{Document, FacetBucket, IDENTIFIER_FIELD, SaveOutcome, SearchResponse};
