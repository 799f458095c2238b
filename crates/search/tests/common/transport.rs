//! In-memory transport client.
//!
//! Stores documents in a map and answers searches with every document in the
//! index unless a canned response is set. Calls are counted so tests can
//! assert that validation happened before any network call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use quarry_search::WriteResult;
use quarry_search::backends::transport::request::{
    BulkRequest, DeleteRequest, GetRequest, IndexRequest, SearchRequest, UpdateRequest,
};
use quarry_search::backends::transport::response::{
    BulkItemResponse, BulkResponse, GetResponse, SearchHit, SearchHits, TransportSearchResponse,
    WriteResponse,
};
use quarry_search::backends::transport::{TransportClient, TransportError};
use quarry_search::Document;

/// Key of a rejected bulk item.
pub const REJECT_FIELD: &str = "reject";

#[derive(Debug, Default)]
pub struct InMemoryTransport {
    documents: Mutex<BTreeMap<(String, String), Document>>,
    indices: Mutex<BTreeSet<String>>,
    searches: Mutex<Vec<SearchRequest>>,
    bulks: Mutex<Vec<BulkRequest>>,
    canned_search: Mutex<Option<TransportSearchResponse>>,
    failure: Mutex<Option<TransportError>>,
    calls: AtomicUsize,
    refreshes: AtomicUsize,
    delay: Option<Duration>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Registers an empty index.
    pub fn with_index(self, index: &str) -> Self {
        self.indices.lock().insert(index.to_string());
        self
    }

    /// Answers every search with `response`.
    pub fn set_search_response(&self, response: TransportSearchResponse) {
        *self.canned_search.lock() = Some(response);
    }

    /// Fails every following call with `error`.
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.lock() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().clone()
    }

    pub fn bulks(&self) -> Vec<BulkRequest> {
        self.bulks.lock().clone()
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Document> {
        self.documents
            .lock()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    pub fn len(&self, index: &str) -> usize {
        self.documents
            .lock()
            .keys()
            .filter(|(i, _)| i == index)
            .count()
    }

    async fn enter(&self) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn store(&self, request: IndexRequest) -> WriteResponse {
        let id = request
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        self.indices.lock().insert(request.index.clone());
        let previous = self
            .documents
            .lock()
            .insert((request.index, id.clone()), request.source);

        WriteResponse {
            id,
            result: if previous.is_some() {
                WriteResult::Updated
            } else {
                WriteResult::Created
            },
        }
    }
}

#[async_trait]
impl TransportClient for InMemoryTransport {
    async fn index(&self, request: IndexRequest) -> Result<WriteResponse, TransportError> {
        self.enter().await?;
        Ok(self.store(request))
    }

    async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError> {
        self.enter().await?;
        let key = (request.index.clone(), request.id.clone());
        let mut documents = self.documents.lock();

        let result = match documents.get_mut(&key) {
            Some(existing) => {
                let mut changed = false;
                for (field, value) in request.doc {
                    if existing.get(&field) != Some(&value) {
                        existing.insert(field, value);
                        changed = true;
                    }
                }
                if changed {
                    WriteResult::Updated
                } else {
                    WriteResult::Noop
                }
            }
            None if request.doc_as_upsert => {
                documents.insert(key, request.doc);
                WriteResult::Created
            }
            None => {
                return Err(TransportError::Remote {
                    status: 404,
                    message: format!("document_missing_exception: [{}]", request.id),
                });
            }
        };

        Ok(WriteResponse {
            id: request.id,
            result,
        })
    }

    async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
        self.enter().await?;
        let removed = self
            .documents
            .lock()
            .remove(&(request.index, request.id.clone()));

        Ok(WriteResponse {
            id: request.id,
            result: if removed.is_some() {
                WriteResult::Deleted
            } else {
                WriteResult::NotFound
            },
        })
    }

    async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
        self.enter().await?;
        let source = self
            .documents
            .lock()
            .get(&(request.index, request.id.clone()))
            .cloned();

        Ok(GetResponse {
            id: request.id,
            found: source.is_some(),
            source,
        })
    }

    async fn search(
        &self,
        request: SearchRequest,
    ) -> Result<TransportSearchResponse, TransportError> {
        self.enter().await?;
        self.searches.lock().push(request.clone());

        if let Some(canned) = self.canned_search.lock().clone() {
            return Ok(canned);
        }

        let hits: Vec<SearchHit> = self
            .documents
            .lock()
            .iter()
            .filter(|((index, _), _)| *index == request.index)
            .map(|((_, id), source)| SearchHit {
                id: id.clone(),
                source: Some(source.clone()),
            })
            .collect();

        Ok(TransportSearchResponse {
            hits: Some(SearchHits {
                total: hits.len() as u64,
                hits,
            }),
            aggregations: Vec::new(),
        })
    }

    async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, TransportError> {
        self.enter().await?;
        self.bulks.lock().push(request.clone());

        let items = request
            .items
            .into_iter()
            .map(|item| {
                if item.source.contains_key(REJECT_FIELD) {
                    BulkItemResponse {
                        id: item.id,
                        failure: Some("mapper_parsing_exception".to_string()),
                    }
                } else {
                    let written = self.store(item);
                    BulkItemResponse {
                        id: Some(written.id),
                        failure: None,
                    }
                }
            })
            .collect();

        Ok(BulkResponse { items })
    }

    async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        self.enter().await?;
        Ok(self.indices.lock().contains(index))
    }

    async fn refresh(&self, _index: &str) -> Result<(), TransportError> {
        self.enter().await?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
