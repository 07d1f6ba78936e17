//! Configuration management for the GEKO annotator service

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::ner::DEFAULT_NER_ENDPOINT;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub ner: NerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Directory of the file backend
    pub dir: PathBuf,
    /// Database of the sqlite backend
    pub database_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    File,
    Sqlite,
}

impl StorageBackendKind {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "memory" => StorageBackendKind::Memory,
            "sqlite" => StorageBackendKind::Sqlite,
            _ => StorageBackendKind::File,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// SPARQL endpoint receiving N-Quads; no push when unset
    pub rdf_endpoint: Option<String>,
    /// Prefix of minted annotation IRIs
    pub annotation_base: String,
    /// Source IRI of annotation targets
    pub annotation_source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NerConfig {
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                backend: StorageBackendKind::File,
                dir: PathBuf::from("./annotations"),
                database_url: "sqlite:./annotations.db".to_string(),
            },
            export: ExportConfig {
                rdf_endpoint: None,
                annotation_base: "https://example.org/annotations/".to_string(),
                annotation_source: "https://example.org/texts/main".to_string(),
            },
            ner: NerConfig {
                endpoint: DEFAULT_NER_ENDPOINT.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            storage: StorageConfig {
                backend: env::var("STORAGE_BACKEND")
                    .map(|value| StorageBackendKind::parse(&value))
                    .unwrap_or(defaults.storage.backend),
                dir: env::var("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.dir),
                database_url: env::var("DATABASE_URL").unwrap_or(defaults.storage.database_url),
            },
            export: ExportConfig {
                rdf_endpoint: env::var("RDF_ENDPOINT")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                annotation_base: env::var("ANNOTATION_BASE")
                    .unwrap_or(defaults.export.annotation_base),
                annotation_source: env::var("ANNOTATION_SOURCE")
                    .unwrap_or(defaults.export.annotation_source),
            },
            ner: NerConfig {
                endpoint: env::var("NER_ENDPOINT").unwrap_or(defaults.ner.endpoint),
            },
        })
    }
}
