//! Application state management

use std::sync::Arc;

use crate::annotations::StoreSettings;
use crate::config::Config;
use crate::export::Serializer;
use crate::ner::{NerClient, NerError};
use crate::rdf::RdfConverter;
use crate::schema::{FieldSchema, GEKO_SCHEMA};
use crate::storage::{AdapterFactory, ExportError, RdfPublisher, SparqlEndpoint, StorageError};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to open annotation storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to build triple store client: {0}")]
    Export(#[from] ExportError),

    #[error("Failed to build NER client: {0}")]
    Ner(#[from] NerError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    factory: AdapterFactory,
    serializer: Serializer,
    converter: Arc<RdfConverter>,
    ner: NerClient,
}

impl AppState {
    /// Open storage and clients described by `config`
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let factory = AdapterFactory::open(&config.storage).await?;
        Self::with_factory(config, factory)
    }

    /// Build the state over an already opened storage
    ///
    /// The RDF publisher is attached when an endpoint is configured.
    pub fn with_factory(config: Config, factory: AdapterFactory) -> Result<Self, StateError> {
        let serializer = Serializer::new(&GEKO_SCHEMA);
        let converter = Arc::new(RdfConverter::new());

        let publisher = match &config.export.rdf_endpoint {
            Some(url) => {
                tracing::info!(endpoint = %url, "RDF push enabled");
                Some(RdfPublisher::new(
                    serializer,
                    Arc::clone(&converter),
                    Arc::new(SparqlEndpoint::new(url)?),
                ))
            }
            None => None,
        };
        let ner = NerClient::new(&config.ner.endpoint)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                factory: factory.with_publisher(publisher),
                config,
                serializer,
                converter,
                ner,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn schema(&self) -> &'static FieldSchema {
        &GEKO_SCHEMA
    }

    /// Get the adapter factory
    pub fn storage(&self) -> &AdapterFactory {
        &self.inner.factory
    }

    pub fn serializer(&self) -> &Serializer {
        &self.inner.serializer
    }

    pub fn converter(&self) -> &RdfConverter {
        &self.inner.converter
    }

    pub fn ner(&self) -> &NerClient {
        &self.inner.ner
    }

    /// Settings stamped on annotations created through the API
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            source: self.inner.config.export.annotation_source.clone(),
            id_base: self.inner.config.export.annotation_base.clone(),
            ..StoreSettings::default()
        }
    }
}
