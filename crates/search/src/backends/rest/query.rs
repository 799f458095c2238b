//! Query DSL rendering.
//!
//! Spells a [`QueryPlan`] as an Elasticsearch search body. Every request asks
//! for an exact total so that counts are not capped at 10,000.

use serde_json::{Map, Value, json};

use crate::translate::{Aggregation, AggregationKind, Clause, Leaf, Occur, QueryPlan, SortClause};

/// Renders the full `_search` request body for a plan.
pub fn render_search_body(plan: &QueryPlan) -> Value {
    let mut body = json!({
        "query": render_query(&plan.clauses),
        "track_total_hits": true,
    });

    if !plan.sort.is_empty() {
        body["sort"] = Value::Array(plan.sort.iter().map(render_sort).collect());
    }

    if !plan.projection.is_unrestricted() {
        let mut source = Map::new();
        if let Some(ref includes) = plan.projection.includes {
            source.insert("includes".to_string(), json!(includes));
        }
        if let Some(ref excludes) = plan.projection.excludes {
            source.insert("excludes".to_string(), json!(excludes));
        }
        body["_source"] = Value::Object(source);
    }

    if let Some(from) = plan.from {
        body["from"] = json!(from);
    }
    if let Some(size) = plan.size {
        body["size"] = json!(size);
    }

    if !plan.aggregations.is_empty() {
        let aggs: Map<String, Value> = plan
            .aggregations
            .iter()
            .map(|agg| (agg.name.clone(), render_aggregation(agg)))
            .collect();
        body["aggs"] = Value::Object(aggs);
    }

    body
}

/// Renders the top-level query. No clauses means match all.
pub fn render_query(clauses: &[Clause]) -> Value {
    if clauses.is_empty() {
        return json!({ "match_all": {} });
    }

    let mut bool_query = Map::new();
    for (occur, key) in [
        (Occur::Must, "must"),
        (Occur::Should, "should"),
        (Occur::MustNot, "must_not"),
    ] {
        let rendered: Vec<Value> = clauses
            .iter()
            .filter(|c| c.occur == occur)
            .map(render_clause)
            .collect();
        if !rendered.is_empty() {
            bool_query.insert(key.to_string(), Value::Array(rendered));
        }
    }

    json!({ "bool": bool_query })
}

fn render_clause(clause: &Clause) -> Value {
    let leaf = render_leaf(&clause.leaf);
    match clause.boost {
        Some(boost) => json!({ "bool": { "must": [leaf], "boost": boost } }),
        None => leaf,
    }
}

fn weighted_field(field: &str, weight: f32) -> String {
    if weight == 1.0 {
        field.to_string()
    } else {
        format!("{}^{}", field, weight)
    }
}

fn render_leaf(leaf: &Leaf) -> Value {
    match leaf {
        Leaf::Match { field, value } => {
            json!({ "match": { field: { "query": value, "operator": "and" } } })
        }
        Leaf::SimpleQueryString { query, fields } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(field, weight)| weighted_field(field, *weight))
                .collect();
            json!({ "simple_query_string": { "query": query, "fields": fields } })
        }
        Leaf::Term { field, value } => json!({ "term": { field: value } }),
        Leaf::Terms { field, values } => json!({ "terms": { field: values } }),
        Leaf::Range { field, bounds } => {
            let bounds = serde_json::to_value(bounds).unwrap_or_else(|_| json!({}));
            json!({ "range": { field: bounds } })
        }
        Leaf::Prefix { field, value } => json!({ "prefix": { field: value } }),
        Leaf::Regexp { field, pattern } => json!({ "regexp": { field: pattern } }),
        Leaf::Exists { field } => json!({ "exists": { "field": field } }),
        Leaf::Nested { path, query } => json!({
            "nested": {
                "path": path,
                "query": render_leaf(query),
                "score_mode": "avg",
            }
        }),
        Leaf::AnyOf(leaves) => json!({
            "bool": {
                "should": leaves.iter().map(render_leaf).collect::<Vec<_>>(),
                "minimum_should_match": 1,
            }
        }),
    }
}

fn render_sort(sort: &SortClause) -> Value {
    match sort {
        SortClause::Field { field, order } => json!({ field: { "order": order.as_str() } }),
        SortClause::Nested {
            field,
            order,
            path,
            filter_field,
            filter_value,
        } => json!({
            field: {
                "order": order.as_str(),
                "mode": "min",
                "nested": {
                    "path": path,
                    "filter": { "term": { filter_field: filter_value } },
                },
            }
        }),
    }
}

fn render_aggregation(agg: &Aggregation) -> Value {
    match agg.kind {
        AggregationKind::Terms => json!({ "terms": { "field": agg.field } }),
        AggregationKind::DateHistogram => json!({
            "date_histogram": { "field": agg.field, "calendar_interval": "1d" }
        }),
    }
}
