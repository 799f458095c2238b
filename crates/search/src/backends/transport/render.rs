//! Renders a [`QueryPlan`] into typed transport requests.

use crate::translate::{
    Aggregation, AggregationKind, Clause, Leaf, Occur, QueryPlan, SortClause,
};

use super::request::{
    AggregationBuilder, BoolQuery, DateHistogramInterval, FieldSort, Operator, QueryBuilder,
    RangeQuery, ScoreMode, SearchSource, SortMode,
};

/// Builds the search source for a plan.
pub fn render_search_source(plan: &QueryPlan) -> SearchSource {
    let mut source = SearchSource::new().query(render_query(&plan.clauses));

    for sort in &plan.sort {
        source = source.sort(render_sort(sort));
    }

    if !plan.projection.is_unrestricted() {
        source = source.fetch_source(
            plan.projection.includes.clone(),
            plan.projection.excludes.clone(),
        );
    }

    if let Some(from) = plan.from {
        source = source.from(from);
    }
    if let Some(size) = plan.size {
        source = source.size(size);
    }

    for agg in &plan.aggregations {
        source = source.aggregation(render_aggregation(agg));
    }

    source
}

fn render_query(clauses: &[Clause]) -> QueryBuilder {
    if clauses.is_empty() {
        return QueryBuilder::MatchAll;
    }

    let query = clauses
        .iter()
        .fold(BoolQuery::new(), |query, clause| {
            let rendered = render_clause(clause);
            match clause.occur {
                Occur::Must => query.must(rendered),
                Occur::Should => query.should(rendered),
                Occur::MustNot => query.must_not(rendered),
            }
        });
    QueryBuilder::Bool(query)
}

fn render_clause(clause: &Clause) -> QueryBuilder {
    let leaf = render_leaf(&clause.leaf);
    match clause.boost {
        Some(boost) => QueryBuilder::Bool(BoolQuery::new().must(leaf).boost(boost)),
        None => leaf,
    }
}

fn render_leaf(leaf: &Leaf) -> QueryBuilder {
    match leaf {
        Leaf::Match { field, value } => QueryBuilder::Match {
            field: field.clone(),
            query: value.clone(),
            operator: Operator::And,
        },
        Leaf::SimpleQueryString { query, fields } => QueryBuilder::SimpleQueryString {
            query: query.clone(),
            fields: fields.clone(),
        },
        Leaf::Term { field, value } => QueryBuilder::Term {
            field: field.clone(),
            value: value.clone(),
        },
        Leaf::Terms { field, values } => QueryBuilder::Terms {
            field: field.clone(),
            values: values.clone(),
        },
        Leaf::Range { field, bounds } => QueryBuilder::Range(RangeQuery {
            field: field.clone(),
            gt: bounds.gt.clone(),
            gte: bounds.gte.clone(),
            lt: bounds.lt.clone(),
            lte: bounds.lte.clone(),
        }),
        Leaf::Prefix { field, value } => QueryBuilder::Prefix {
            field: field.clone(),
            value: value.clone(),
        },
        Leaf::Regexp { field, pattern } => QueryBuilder::Regexp {
            field: field.clone(),
            value: pattern.clone(),
        },
        Leaf::Exists { field } => QueryBuilder::Exists {
            field: field.clone(),
        },
        Leaf::Nested { path, query } => QueryBuilder::Nested {
            path: path.clone(),
            query: Box::new(render_leaf(query)),
            score_mode: ScoreMode::Avg,
        },
        Leaf::AnyOf(leaves) => QueryBuilder::Bool(
            leaves
                .iter()
                .fold(BoolQuery::new(), |query, leaf| query.should(render_leaf(leaf)))
                .minimum_should_match(1),
        ),
    }
}

fn render_sort(sort: &SortClause) -> FieldSort {
    match sort {
        SortClause::Field { field, order } => FieldSort::new(field.clone()).order(*order),
        SortClause::Nested {
            field,
            order,
            path,
            filter_field,
            filter_value,
        } => FieldSort::new(field.clone())
            .order(*order)
            .sort_mode(SortMode::Min)
            .nested(
                path.clone(),
                QueryBuilder::Term {
                    field: filter_field.clone(),
                    value: filter_value.clone(),
                },
            ),
    }
}

fn render_aggregation(agg: &Aggregation) -> AggregationBuilder {
    match agg.kind {
        AggregationKind::Terms => AggregationBuilder::Terms {
            name: agg.name.clone(),
            field: agg.field.clone(),
        },
        AggregationKind::DateHistogram => AggregationBuilder::DateHistogram {
            name: agg.name.clone(),
            field: agg.field.clone(),
            interval: DateHistogramInterval::Day,
        },
    }
}
