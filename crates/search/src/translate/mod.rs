//! Query translation.
//!
//! [`QueryTranslator`] applies the translation rules once and produces a
//! backend-neutral [`QueryPlan`]. Each backend owns a renderer from the plan
//! to its native request, so both transports see identical decisions.

mod plan;
mod translator;

pub use plan::{
    Aggregation, AggregationKind, Clause, Leaf, Occur, Projection, QueryPlan, SortClause,
};
pub use translator::{
    ALL_FIELDS, DATE_HISTOGRAM, QueryTranslator, RAW_SUFFIX, TENANT_FIELD, TenantFilter,
    raw_field,
};
