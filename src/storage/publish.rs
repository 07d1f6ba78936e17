//! Triple store push
//!
//! After a create, the whole record is exported, converted to N-Quads and
//! posted to a SPARQL endpoint in a detached task. Failures are logged and
//! never reach the caller.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::StorageRecord;
use crate::export::{CollectionMeta, Serializer};
use crate::rdf::{RdfConverter, RdfFormat};

/// Content type of the pushed payload
pub const NQUADS_CONTENT_TYPE: &str = "text/x-nquads";

/// Remote export failures
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Triple store rejected push: HTTP {status} - {body}")]
    Status { status: u16, body: String },
}

/// Destination for RDF payloads
#[async_trait]
pub trait TripleStore: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn push(&self, nquads: String) -> Result<(), ExportError>;
}

/// Triple store reached over HTTP
#[derive(Debug, Clone)]
pub struct SparqlEndpoint {
    client: Client,
    url: String,
}

impl SparqlEndpoint {
    pub fn new(url: impl Into<String>) -> Result<Self, ExportError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TripleStore for SparqlEndpoint {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn push(&self, nquads: String) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, NQUADS_CONTENT_TYPE)
            .body(nquads)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(endpoint = %self.url, status = status.as_u16(), response = %body, "Pushed RDF");
        Ok(())
    }
}

/// Serializes records and pushes them to a [`TripleStore`]
#[derive(Clone)]
pub struct RdfPublisher {
    serializer: Serializer,
    converter: Arc<RdfConverter>,
    store: Arc<dyn TripleStore>,
}

impl RdfPublisher {
    pub fn new(
        serializer: Serializer,
        converter: Arc<RdfConverter>,
        store: Arc<dyn TripleStore>,
    ) -> Self {
        Self {
            serializer,
            converter,
            store,
        }
    }

    /// N-Quads for the whole record, `None` when it cannot be converted
    pub fn render(&self, record: &StorageRecord) -> Option<String> {
        let report = self
            .serializer
            .collection_document(&record.items, &CollectionMeta::for_resource(&record.id));

        let document = match report.to_value() {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(resource = %record.id, error = %e, "RDF export skipped");
                return None;
            }
        };

        self.converter.to_rdf_or_skip(&document, RdfFormat::NQuads)
    }

    /// Start a detached push of the record
    ///
    /// Returns the task handle, or `None` when nothing was sent.
    pub fn publish(&self, record: &StorageRecord) -> Option<JoinHandle<()>> {
        let nquads = self.render(record)?;
        let store = Arc::clone(&self.store);
        let resource = record.id.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = store.push(nquads).await {
                tracing::error!(
                    resource = %resource,
                    endpoint = %store.endpoint(),
                    error = %e,
                    "RDF push failed"
                );
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::ContextLoader;
    use crate::schema::GEKO_SCHEMA;
    use crate::storage::tests::final_annotation;
    use crate::storage::{MemoryBackend, RecordAdapter, StorageAdapter};
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Router};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        pushes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TripleStore for Recorder {
        fn endpoint(&self) -> &str {
            "memory"
        }

        async fn push(&self, nquads: String) -> Result<(), ExportError> {
            self.pushes.lock().push(nquads);
            Ok(())
        }
    }

    fn publisher(store: Arc<dyn TripleStore>) -> RdfPublisher {
        RdfPublisher::new(
            Serializer::new(&GEKO_SCHEMA),
            Arc::new(RdfConverter::new()),
            store,
        )
    }

    type Received = Arc<Mutex<Vec<(String, String)>>>;

    async fn spawn_endpoint(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/store",
                post(
                    move |State(received): State<Received>, headers: HeaderMap, body: String| async move {
                        let content_type = headers
                            .get("content-type")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        received.lock().push((content_type, body));
                        (status, "stored")
                    },
                ),
            )
            .with_state(Arc::clone(&received));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/store", addr), received)
    }

    #[tokio::test]
    async fn test_create_pushes_record() {
        let recorder = Arc::new(Recorder::default());
        let publisher = publisher(recorder.clone());

        let mut record = StorageRecord::empty("canvas-1");
        record.items.push(final_annotation("giovani"));

        publisher.publish(&record).unwrap().await.unwrap();

        let pushes = recorder.pushes.lock();
        assert_eq!(pushes.len(), 1);
        assert!(pushes[0].contains("<http://www.w3id.org/geko/annotation-page/canvas-1>"));
    }

    #[tokio::test]
    async fn test_unconvertible_record_is_not_pushed() {
        let recorder = Arc::new(Recorder::default());
        let publisher = RdfPublisher::new(
            Serializer::new(&GEKO_SCHEMA),
            Arc::new(RdfConverter::with_loader(ContextLoader::empty())),
            recorder.clone(),
        );

        assert!(publisher.publish(&StorageRecord::empty("canvas-1")).is_none());
        assert!(recorder.pushes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sparql_endpoint_posts_nquads() {
        let (url, received) = spawn_endpoint(StatusCode::OK).await;
        let endpoint = SparqlEndpoint::new(&url).unwrap();

        endpoint
            .push("<http://a> <http://b> <http://c> .\n".to_string())
            .await
            .unwrap();

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, NQUADS_CONTENT_TYPE);
        assert_eq!(received[0].1, "<http://a> <http://b> <http://c> .\n");
    }

    #[tokio::test]
    async fn test_sparql_endpoint_reports_status() {
        let (url, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
        let endpoint = SparqlEndpoint::new(&url).unwrap();

        match endpoint.push(String::new()).await {
            Err(ExportError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "stored");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_failure_keeps_local_write() {
        let (url, received) = spawn_endpoint(StatusCode::SERVICE_UNAVAILABLE).await;
        let endpoint = Arc::new(SparqlEndpoint::new(&url).unwrap());
        let adapter = RecordAdapter::new("canvas-1", Arc::new(MemoryBackend::new()))
            .with_publisher(publisher(endpoint));

        let record = adapter.create(final_annotation("giovani")).await.unwrap();
        assert_eq!(record.items.len(), 1);

        // wait for the detached push to reach the endpoint
        for _ in 0..50 {
            if !received.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(received.lock().len(), 1);
        assert_eq!(adapter.all().await.unwrap().unwrap().items.len(), 1);
    }
}
