//! QueryExecutor implementation for the REST backend.

use async_trait::async_trait;
use elasticsearch::SearchParts;

use crate::backend::QueryExecutor;
use crate::error::SearchResult;
use crate::translate::QueryPlan;
use crate::types::SearchResponse;

use super::backend::{RestBackend, json_body, request_failed};
use super::query::render_search_body;
use super::response::parse_search_response;

#[async_trait]
impl QueryExecutor for RestBackend {
    async fn search(&self, index: &str, plan: &QueryPlan) -> SearchResult<SearchResponse> {
        let body = render_search_body(plan);
        tracing::debug!(index = %index, query = %body, "Executing REST search");

        let response = self
            .client()?
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(request_failed("search", response).await);
        }

        let body = json_body("search", response).await?;
        Ok(parse_search_response(&body, plan))
    }
}
