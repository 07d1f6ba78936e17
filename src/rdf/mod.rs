//! JSON-LD to RDF conversion
//!
//! Expands exported JSON-LD documents against their contexts and extracts
//! RDF statements, serialized as N-Quads for triple stores.

mod context;
mod convert;

pub use context::{ActiveContext, ContextLoader, TermDefinition, TypeMapping};

use oxrdf::Quad;
use serde_json::Value;
use std::fmt::Write;

use convert::Emitter;

/// Errors converting a document to RDF
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Unknown remote context: {0}")]
    UnknownContext(String),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Cyclic term definition: {0}")]
    CyclicTerm(String),

    #[error("Unresolvable term: {0}")]
    UnresolvableTerm(String),

    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// RDF serialization formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RdfFormat {
    #[default]
    NQuads,
}

impl RdfFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            RdfFormat::NQuads => "application/n-quads",
        }
    }

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.split(';').next().map(str::trim) {
            Some("application/n-quads") | Some("text/x-nquads") => Some(RdfFormat::NQuads),
            _ => None,
        }
    }
}

/// Converts JSON-LD documents to RDF
#[derive(Debug, Clone, Default)]
pub struct RdfConverter {
    loader: ContextLoader,
}

impl RdfConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: ContextLoader) -> Self {
        Self { loader }
    }

    /// Statements of `document`, in traversal order without duplicates
    pub fn to_quads(&self, document: &Value) -> Result<Vec<Quad>, ConversionError> {
        let mut emitter = Emitter::new(&self.loader);
        emitter.document(document)?;
        Ok(emitter.into_quads())
    }

    pub fn to_rdf(&self, document: &Value, format: RdfFormat) -> Result<String, ConversionError> {
        let quads = self.to_quads(document)?;
        let mut output = String::new();
        match format {
            RdfFormat::NQuads => {
                for quad in &quads {
                    // writing to a String cannot fail
                    let _ = writeln!(output, "{} .", quad);
                }
            }
        }
        tracing::debug!(statements = quads.len(), "Converted document to RDF");
        Ok(output)
    }

    /// Like [`RdfConverter::to_rdf`] for a collection document
    ///
    /// Each entry of `items` is converted on its own first; entries that
    /// fail are logged and left out, so one broken annotation does not hide
    /// the rest of the collection.
    pub fn collection_to_rdf(
        &self,
        collection: &Value,
        format: RdfFormat,
    ) -> Result<String, ConversionError> {
        self.to_rdf(&self.convertible_items(collection), format)
    }

    fn convertible_items(&self, collection: &Value) -> Value {
        let (Some(context), Some(items)) = (
            collection.get("@context"),
            collection.get("items").and_then(Value::as_array),
        ) else {
            return collection.clone();
        };

        let kept: Vec<Value> = items
            .iter()
            .filter(|item| {
                let Value::Object(fields) = item else {
                    return true;
                };
                let mut standalone = fields.clone();
                standalone
                    .entry("@context")
                    .or_insert_with(|| context.clone());

                match self.to_quads(&Value::Object(standalone)) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!(
                            id = %fields.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
                            error = %e,
                            "Annotation left out of RDF export"
                        );
                        false
                    }
                }
            })
            .cloned()
            .collect();

        let mut pruned = collection.clone();
        pruned["items"] = Value::Array(kept);
        pruned
    }

    /// Like [`RdfConverter::collection_to_rdf`], logging failures and returning `None`
    pub fn to_rdf_or_skip(&self, document: &Value, format: RdfFormat) -> Option<String> {
        match self.collection_to_rdf(document, format) {
            Ok(rdf) => Some(rdf),
            Err(e) => {
                tracing::error!(error = %e, "RDF export skipped");
                None
            }
        }
    }
}
