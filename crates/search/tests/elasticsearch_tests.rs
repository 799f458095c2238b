//! Live tests against Elasticsearch.
//!
//! A single container is started with testcontainers and shared by every test;
//! each test gets its own index. The REST backend talks to it through the
//! official client. The transport backend talks to it through a small HTTP
//! adapter implementing `TransportClient`, so both backends run the same
//! scenarios against the same engine.
//!
//! Run with: `cargo test -p quarry-search -- es_integration`
//!
//! Skip if no Docker: `cargo test -p quarry-search -- --skip es_integration`

#![cfg(feature = "rest")]

mod common;

mod es_integration {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use testcontainers::ImageExt;
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::elastic_search::ElasticSearch;
    use tokio::sync::OnceCell;

    use quarry_search::backends::rest::RestBackend;
    use quarry_search::backends::transport::request::{
        BulkRequest, DeleteRequest, GetRequest, IndexRequest, SearchRequest, UpdateRequest,
    };
    use quarry_search::backends::transport::response::{
        AggregationResult, Bucket, BulkItemResponse, BulkResponse, GetResponse, SearchHit,
        SearchHits, TransportSearchResponse, WriteResponse,
    };
    use quarry_search::backends::transport::{
        TransportBackend, TransportClient, TransportError,
    };
    use quarry_search::{
        DocumentStore, SearchBackend, SearchConfig, SearchDescriptor, SearchService, SortOrder,
        WriteResult,
    };

    use super::common::{content, doc, unique_index};

    // ========================================================================
    // Container and index setup
    // ========================================================================

    struct SharedEs {
        url: String,
        _container: testcontainers::ContainerAsync<ElasticSearch>,
    }

    static SHARED_ES: OnceCell<SharedEs> = OnceCell::const_new();

    async fn shared_es() -> &'static SharedEs {
        SHARED_ES
            .get_or_init(|| async {
                let container = ElasticSearch::default()
                    .with_env_var("ES_JAVA_OPTS", "-Xms256m -Xmx256m")
                    .with_startup_timeout(std::time::Duration::from_secs(120))
                    .start()
                    .await
                    .expect("Failed to start Elasticsearch container");

                let port = container
                    .get_host_port_ipv4(9200)
                    .await
                    .expect("Failed to get host port");
                let host = container.get_host().await.expect("Failed to get host");

                SharedEs {
                    url: format!("http://{}:{}", host, port),
                    _container: container,
                }
            })
            .await
    }

    /// Creates an index whose strings carry a lowercase `.raw` keyword and feed
    /// `all_fields`, matching the layout the translator expects.
    async fn create_index(url: &str, index: &str) {
        let mapping = json!({
            "settings": {
                "number_of_replicas": 0,
                "analysis": {
                    "normalizer": {
                        "lowercase_normalizer": {"type": "custom", "filter": ["lowercase"]}
                    }
                }
            },
            "mappings": {
                "dynamic_templates": [
                    {"strings": {
                        "match_mapping_type": "string",
                        "mapping": {
                            "type": "text",
                            "copy_to": "all_fields",
                            "fields": {"raw": {"type": "keyword", "normalizer": "lowercase_normalizer"}}
                        }
                    }},
                    {"longs": {
                        "match_mapping_type": "long",
                        "mapping": {"type": "long", "fields": {"raw": {"type": "long"}}}
                    }},
                    {"dates": {
                        "match_mapping_type": "date",
                        "mapping": {"type": "date", "fields": {"raw": {"type": "date"}}}
                    }}
                ],
                "properties": {"all_fields": {"type": "text"}}
            }
        });

        let response = reqwest::Client::new()
            .put(format!("{}/{}", url, index))
            .json(&mapping)
            .send()
            .await
            .expect("Failed to create index");
        assert!(response.status().is_success(), "index creation failed");
    }

    fn config(url: &str, index: &str) -> SearchConfig {
        SearchConfig {
            es_url: url.to_string(),
            health_index: index.to_string(),
            ..SearchConfig::for_testing()
        }
    }

    /// A REST-backed service plus the backend for explicit refreshes.
    async fn rest_service() -> (SearchService, Arc<dyn SearchBackend>, String) {
        let es = shared_es().await;
        let index = unique_index("rest");
        create_index(&es.url, &index).await;

        let config = config(&es.url, &index);
        let backend: Arc<dyn SearchBackend> =
            Arc::new(RestBackend::from_config(&config).expect("Failed to build REST backend"));
        (SearchService::with_backend(Arc::clone(&backend), &config), backend, index)
    }

    /// A transport-backed service over the HTTP adapter.
    async fn transport_service() -> (SearchService, Arc<dyn SearchBackend>, String) {
        let es = shared_es().await;
        let index = unique_index("transport");
        create_index(&es.url, &index).await;

        let config = config(&es.url, &index);
        let backend: Arc<dyn SearchBackend> =
            Arc::new(TransportBackend::with_client(HttpTransport::new(&es.url)));
        (SearchService::with_backend(Arc::clone(&backend), &config), backend, index)
    }

    // ========================================================================
    // HTTP adapter for the transport seam
    // ========================================================================

    #[derive(Debug)]
    struct HttpTransport {
        client: reqwest::Client,
        base: String,
    }

    impl HttpTransport {
        fn new(base: &str) -> Self {
            Self {
                client: reqwest::Client::new(),
                base: base.trim_end_matches('/').to_string(),
            }
        }

        async fn send(
            &self,
            request: reqwest::RequestBuilder,
        ) -> Result<(u16, Value), TransportError> {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::NoNodeAvailable(e.to_string()))?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            let body = if text.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|e| TransportError::Malformed(e.to_string()))?
            };
            Ok((status, body))
        }

        fn write_response(status: u16, body: &Value) -> Result<WriteResponse, TransportError> {
            let result = body["result"]
                .as_str()
                .and_then(WriteResult::parse)
                .ok_or_else(|| TransportError::Remote {
                    status,
                    message: body.to_string(),
                })?;
            Ok(WriteResponse {
                id: body["_id"].as_str().unwrap_or_default().to_string(),
                result,
            })
        }
    }

    fn source(value: &Value) -> Option<Map<String, Value>> {
        value.as_object().cloned()
    }

    #[async_trait]
    impl TransportClient for HttpTransport {
        async fn index(&self, request: IndexRequest) -> Result<WriteResponse, TransportError> {
            let builder = match &request.id {
                Some(id) => self
                    .client
                    .put(format!("{}/{}/_doc/{}", self.base, request.index, id)),
                None => self.client.post(format!("{}/{}/_doc", self.base, request.index)),
            };
            let (status, body) = self.send(builder.json(&request.source)).await?;
            Self::write_response(status, &body)
        }

        async fn update(&self, request: UpdateRequest) -> Result<WriteResponse, TransportError> {
            let url = format!("{}/{}/_update/{}", self.base, request.index, request.id);
            let payload = json!({"doc": request.doc, "doc_as_upsert": request.doc_as_upsert});
            let (status, body) = self.send(self.client.post(url).json(&payload)).await?;
            if status == 404 {
                return Err(TransportError::Remote {
                    status,
                    message: body.to_string(),
                });
            }
            Self::write_response(status, &body)
        }

        async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse, TransportError> {
            let url = format!("{}/{}/_doc/{}", self.base, request.index, request.id);
            let (status, body) = self.send(self.client.delete(url)).await?;
            Self::write_response(status, &body)
        }

        async fn get(&self, request: GetRequest) -> Result<GetResponse, TransportError> {
            let url = format!("{}/{}/_doc/{}", self.base, request.index, request.id);
            let (_, body) = self.send(self.client.get(url)).await?;
            let found = body["found"].as_bool().unwrap_or(false);
            Ok(GetResponse {
                id: request.id,
                found,
                source: if found { source(&body["_source"]) } else { None },
            })
        }

        async fn search(
            &self,
            request: SearchRequest,
        ) -> Result<TransportSearchResponse, TransportError> {
            let url = format!("{}/{}/_search", self.base, request.index);
            let (status, body) = self
                .send(self.client.post(url).json(&request.source.to_json()))
                .await?;
            if status >= 400 {
                return Err(TransportError::Remote {
                    status,
                    message: body.to_string(),
                });
            }

            let section = &body["hits"];
            let hits = section.is_object().then(|| SearchHits {
                total: section["total"]["value"].as_u64().unwrap_or(0),
                hits: section["hits"]
                    .as_array()
                    .map(|hits| {
                        hits.iter()
                            .map(|hit| SearchHit {
                                id: hit["_id"].as_str().unwrap_or_default().to_string(),
                                source: source(&hit["_source"]),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            });

            let aggregations = body["aggregations"]
                .as_object()
                .map(|aggs| {
                    aggs.iter()
                        .map(|(name, agg)| AggregationResult {
                            name: name.clone(),
                            buckets: agg["buckets"]
                                .as_array()
                                .map(|buckets| {
                                    buckets
                                        .iter()
                                        .map(|b| Bucket {
                                            key: b["key"].clone(),
                                            key_as_string: b["key_as_string"]
                                                .as_str()
                                                .map(str::to_string),
                                            doc_count: b["doc_count"].as_u64().unwrap_or(0),
                                        })
                                        .collect()
                                })
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            Ok(TransportSearchResponse { hits, aggregations })
        }

        async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse, TransportError> {
            let mut payload = String::new();
            for item in &request.items {
                let mut action = json!({"_index": request.index});
                if let Some(id) = &item.id {
                    action["_id"] = json!(id);
                }
                payload.push_str(&json!({"index": action}).to_string());
                payload.push('\n');
                payload.push_str(&Value::Object(item.source.clone()).to_string());
                payload.push('\n');
            }

            let (_, body) = self
                .send(
                    self.client
                        .post(format!("{}/_bulk", self.base))
                        .header("content-type", "application/x-ndjson")
                        .body(payload),
                )
                .await?;

            let items = body["items"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| BulkItemResponse {
                            id: item["index"]["_id"].as_str().map(str::to_string),
                            failure: item["index"]
                                .get("error")
                                .map(|error| error.to_string()),
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(BulkResponse { items })
        }

        async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
            let response = self
                .client
                .head(format!("{}/{}", self.base, index))
                .send()
                .await
                .map_err(|e| TransportError::NoNodeAvailable(e.to_string()))?;
            Ok(response.status().is_success())
        }

        async fn refresh(&self, index: &str) -> Result<(), TransportError> {
            self.send(self.client.post(format!("{}/{}/_refresh", self.base, index)))
                .await
                .map(|_| ())
        }
    }

    // ========================================================================
    // Scenarios shared by both backends
    // ========================================================================

    async fn crud_scenario(service: &SearchService, index: &str) {
        let saved = service
            .save(index, "do_1", content("do_1", "Fractions", "Draft"))
            .await
            .unwrap();
        assert!(saved.is_saved());

        let stored = service.get_data_by_identifier(index, "do_1").await.unwrap();
        assert_eq!(stored["identifier"], "do_1");
        assert_eq!(stored["status"], "Draft");

        assert!(service
            .update(index, "do_1", doc(json!({"status": "Live"})))
            .await
            .unwrap());
        assert!(!service
            .update(index, "do_missing", doc(json!({"status": "Live"})))
            .await
            .unwrap());

        assert!(service
            .upsert(index, "do_2", doc(json!({"name": "Decimals"})))
            .await
            .unwrap());
        assert!(service
            .upsert(index, "do_2", doc(json!({"name": "Decimals"})))
            .await
            .unwrap());
        let upserted = service.get_data_by_identifier(index, "do_2").await.unwrap();
        assert_eq!(upserted["name"], "Decimals");

        assert!(service.delete(index, "do_1").await.unwrap());
        assert!(!service.delete(index, "do_1").await.unwrap());
        assert!(service
            .get_data_by_identifier(index, "do_1")
            .await
            .unwrap()
            .is_empty());

        assert!(service.health_check().await.unwrap());
    }

    async fn seed(service: &SearchService, index: &str) {
        let mut retired = content("do_3", "Ratios", "Retired");
        retired.insert("contentType".to_string(), json!("Collection"));
        let mut other_tenant = content("do_4", "Algebra", "Live");
        other_tenant.insert("channel".to_string(), json!("other"));
        let mut shared_suffix = content("do_5", "Geometry", "Live");
        shared_suffix.insert("channel".to_string(), json!("other-channel"));

        let inserted = service
            .bulk_insert(
                index,
                vec![
                    content("do_1", "Fractions", "Live"),
                    content("do_2", "Decimals", "Live"),
                    retired,
                    other_tenant,
                    shared_suffix,
                ],
            )
            .await
            .unwrap();
        assert!(inserted);
    }

    async fn search_scenario(service: &SearchService, index: &str) {
        seed(service, index).await;

        let everything = service
            .search(&SearchDescriptor::new(), index)
            .await
            .unwrap();
        assert_eq!(everything.count, 3, "tenant filter must hide do_4 and do_5");

        let live = service
            .search(
                &SearchDescriptor::new()
                    .with_filter_value("status", json!("LIVE"))
                    .with_sort("name", SortOrder::Asc)
                    .with_facet("contentType", None),
                index,
            )
            .await
            .unwrap();
        assert_eq!(live.count, 2);
        assert_eq!(live.identifiers(), vec!["do_2", "do_1"]);
        assert_eq!(live.facets["contentType"][0].key, "resource");
        assert_eq!(live.facets["contentType"][0].count, 2);

        let paged = service
            .search(
                &SearchDescriptor::new()
                    .with_sort("name", SortOrder::Desc)
                    .with_offset(1)
                    .with_limit(1)
                    .with_fields(["name"]),
                index,
            )
            .await
            .unwrap();
        assert_eq!(paged.count, 3);
        assert_eq!(paged.content.len(), 1);
        assert_eq!(paged.content[0]["name"], "Fractions");
        assert!(paged.content[0].get("status").is_none());

        let prefixed = service
            .search(
                &SearchDescriptor::new().with_filter_value("name", json!({"startsWith": "DEC"})),
                index,
            )
            .await
            .unwrap();
        assert_eq!(prefixed.identifiers(), vec!["do_2"]);

        let free_text = service
            .search(&SearchDescriptor::new().with_query("ratios"), index)
            .await
            .unwrap();
        assert_eq!(free_text.identifiers(), vec!["do_3"]);

        let empty = service
            .search(
                &SearchDescriptor::new()
                    .with_filter_value("status", json!("Unknown"))
                    .with_facet("contentType", None),
                index,
            )
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert!(empty.facets.is_empty());

        let ids = vec!["do_1".to_string(), "do_3".to_string(), "do_404".to_string()];
        let by_id = service.get_results_by_ids(&ids, &[], index).await.unwrap();
        assert_eq!(
            by_id.keys().cloned().collect::<BTreeSet<_>>(),
            BTreeSet::from(["do_1".to_string(), "do_3".to_string()])
        );
    }

    async fn ranking_scenario(service: &SearchService, index: &str) {
        let scored: Vec<_> = [("do_1", 7, "Maths"), ("do_2", 42, "Science"), ("do_3", 19, "Maths")]
            .into_iter()
            .map(|(id, score, subject)| {
                let mut document = content(id, id, "Live");
                document.insert("score".to_string(), json!(score));
                document.insert("subject".to_string(), json!(subject));
                document
            })
            .collect();
        assert!(service.bulk_insert(index, scored).await.unwrap());

        let ranked = service
            .search(
                &SearchDescriptor::new()
                    .with_sort_value("score", &json!("desc"))
                    .with_facet_group([("subject".to_string(), None)])
                    .with_facet_group([("status".to_string(), None)]),
                index,
            )
            .await
            .unwrap();

        let scores: Vec<i64> = ranked
            .content
            .iter()
            .filter_map(|doc| doc["score"].as_i64())
            .collect();
        assert_eq!(scores, vec![42, 19, 7]);

        assert_eq!(ranked.facets.keys().collect::<Vec<_>>(), vec!["subject"]);
        let subjects: BTreeSet<(String, u64)> = ranked.facets["subject"]
            .iter()
            .map(|bucket| (bucket.key.clone(), bucket.count))
            .collect();
        assert_eq!(
            subjects,
            BTreeSet::from([("maths".to_string(), 2), ("science".to_string(), 1)])
        );
    }

    // ========================================================================
    // REST backend
    // ========================================================================

    #[tokio::test]
    async fn es_integration_rest_ranking_and_facets() {
        let (service, _, index) = rest_service().await;
        ranking_scenario(&service, &index).await;
    }

    #[tokio::test]
    async fn es_integration_rest_crud() {
        let (service, _, index) = rest_service().await;
        crud_scenario(&service, &index).await;
    }

    #[tokio::test]
    async fn es_integration_rest_search() {
        let (service, _, index) = rest_service().await;
        search_scenario(&service, &index).await;
    }

    #[tokio::test]
    async fn es_integration_rest_missing_index_is_unhealthy() {
        let es = shared_es().await;
        let config = config(&es.url, &unique_index("absent"));
        let service = SearchService::new(RestBackend::from_config(&config).unwrap(), &config);
        assert!(!service.health_check().await.unwrap());
    }

    // ========================================================================
    // Transport backend
    // ========================================================================

    #[tokio::test]
    async fn es_integration_transport_crud() {
        let (service, _, index) = transport_service().await;
        crud_scenario(&service, &index).await;
    }

    #[tokio::test]
    async fn es_integration_transport_search() {
        let (service, _, index) = transport_service().await;
        search_scenario(&service, &index).await;
    }

    #[tokio::test]
    async fn es_integration_transport_ranking_and_facets() {
        let (service, _, index) = transport_service().await;
        ranking_scenario(&service, &index).await;
    }

    // ========================================================================
    // Both backends agree
    // ========================================================================

    #[tokio::test]
    async fn es_integration_backends_return_equal_results() {
        let (rest, rest_backend, index) = rest_service().await;
        let es = shared_es().await;
        let transport = SearchService::with_backend(
            Arc::new(TransportBackend::with_client(HttpTransport::new(&es.url))),
            &config(&es.url, &index),
        );

        seed(&rest, &index).await;
        rest_backend.refresh(&index).await.unwrap();

        let descriptor = SearchDescriptor::new()
            .with_query("fractions decimals")
            .with_filter_value("contentType", json!(["Resource", "Collection"]))
            .with_sort("name", SortOrder::Asc)
            .with_facet("status", None)
            .with_facet("createdOn", Some("date_histogram"))
            .with_limit(10);

        let from_rest = rest.search(&descriptor, &index).await.unwrap();
        let from_transport = transport.search(&descriptor, &index).await.unwrap();
        assert_eq!(from_rest, from_transport);
        assert!(!from_rest.is_empty());
    }
}
