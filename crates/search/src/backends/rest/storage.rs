//! DocumentStore implementation for the REST backend.

use async_trait::async_trait;
use elasticsearch::indices::{IndicesExistsParts, IndicesRefreshParts};
use elasticsearch::{BulkOperation, BulkParts, DeleteParts, GetParts, IndexParts, UpdateParts};
use serde_json::{Value, json};

use crate::backend::{BulkItem, BulkSummary, DocumentStore, WriteResult};
use crate::error::SearchResult;
use crate::types::Document;

use super::backend::{RestBackend, json_body, request_failed, unparsable};

fn write_result(action: &str, body: &Value) -> SearchResult<WriteResult> {
    let result = body.get("result").and_then(Value::as_str).unwrap_or("");
    WriteResult::parse(result)
        .ok_or_else(|| unparsable(format!("Unexpected {} result '{}'", action, result)))
}

#[async_trait]
impl DocumentStore for RestBackend {
    async fn index(&self, index: &str, id: &str, document: Document) -> SearchResult<WriteResult> {
        let response = self
            .client()?
            .index(IndexParts::IndexId(index, id))
            .body(Value::Object(document))
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(request_failed("index", response).await);
        }

        write_result("index", &json_body("index", response).await?)
    }

    async fn update(
        &self,
        index: &str,
        id: &str,
        document: Document,
    ) -> SearchResult<WriteResult> {
        let response = self
            .client()?
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": document }))
            .send()
            .await?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(WriteResult::NotFound);
        }
        if !status.is_success() {
            return Err(request_failed("update", response).await);
        }

        write_result("update", &json_body("update", response).await?)
    }

    async fn upsert(
        &self,
        index: &str,
        id: &str,
        document: Document,
    ) -> SearchResult<WriteResult> {
        let response = self
            .client()?
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": document, "doc_as_upsert": true }))
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(request_failed("upsert", response).await);
        }

        write_result("upsert", &json_body("upsert", response).await?)
    }

    async fn delete(&self, index: &str, id: &str) -> SearchResult<WriteResult> {
        let response = self
            .client()?
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(WriteResult::NotFound);
        }
        if !status.is_success() {
            return Err(request_failed("delete", response).await);
        }

        write_result("delete", &json_body("delete", response).await?)
    }

    async fn get(&self, index: &str, id: &str) -> SearchResult<Option<Document>> {
        let response = self
            .client()?
            .get(GetParts::IndexId(index, id))
            .send()
            .await?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(request_failed("get", response).await);
        }

        let body = json_body("get", response).await?;
        if !body.get("found").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        Ok(body.get("_source").and_then(Value::as_object).cloned())
    }

    async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> SearchResult<BulkSummary> {
        let submitted = items.len();
        let operations: Vec<BulkOperation<Value>> = items
            .into_iter()
            .map(|item| {
                let op = BulkOperation::index(Value::Object(item.document));
                match item.id {
                    Some(id) => op.id(id).into(),
                    None => op.into(),
                }
            })
            .collect();

        let response = self
            .client()?
            .bulk(BulkParts::Index(index))
            .body(operations)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(request_failed("bulk", response).await);
        }

        let body = json_body("bulk", response).await?;
        let mut failed = 0;
        if body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            let items = body.get("items").and_then(Value::as_array);
            for item in items.into_iter().flatten() {
                let Some(result) = item.get("index") else {
                    continue;
                };
                if let Some(error) = result.get("error") {
                    failed += 1;
                    tracing::warn!(
                        index = %index,
                        identifier = result.get("_id").and_then(serde_json::Value::as_str).unwrap_or(""),
                        error = %error,
                        "Bulk item rejected"
                    );
                }
            }
        }

        Ok(BulkSummary { submitted, failed })
    }

    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        let response = self
            .client()?
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            return Ok(true);
        }
        if status.as_u16() == 404 {
            return Ok(false);
        }
        Err(request_failed("index exists", response).await)
    }

    async fn refresh(&self, index: &str) -> SearchResult<()> {
        let response = self
            .client()?
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Err(request_failed("refresh", response).await);
        }
        Ok(())
    }
}
