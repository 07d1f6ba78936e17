//! JSON-LD context processing
//!
//! Supports the subset of JSON-LD 1.1 context features used by Web
//! Annotation documents: prefixes and compact IRIs, keyword aliases,
//! `@vocab`, `@type` coercion (`@id`, `@vocab`, datatypes), `@list`
//! containers and remote contexts resolved through a [`ContextLoader`].
//! Term definitions are resolved eagerly against the context they are
//! defined in, so redefining a prefix later does not change them.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::ConversionError;
use crate::export::ANNO_CONTEXT_URI;

const ANNO_CONTEXT: &str = include_str!("anno.jsonld");

/// Resolves remote context URIs to context documents
#[derive(Debug, Clone)]
pub struct ContextLoader {
    documents: HashMap<String, String>,
}

impl Default for ContextLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextLoader {
    /// A loader knowing the Web Annotation context
    pub fn new() -> Self {
        let mut documents = HashMap::new();
        documents.insert(ANNO_CONTEXT_URI.to_string(), ANNO_CONTEXT.to_string());
        documents.insert(
            ANNO_CONTEXT_URI.replacen("http://", "https://", 1),
            ANNO_CONTEXT.to_string(),
        );
        Self { documents }
    }

    /// A loader that resolves nothing
    pub fn empty() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    /// Register a context document under `uri`
    pub fn with_document(mut self, uri: impl Into<String>, document: impl Into<String>) -> Self {
        self.documents.insert(uri.into(), document.into());
        self
    }

    /// The `@context` value of the document registered under `uri`
    pub fn load(&self, uri: &str) -> Result<Value, ConversionError> {
        let raw = self
            .documents
            .get(uri)
            .ok_or_else(|| ConversionError::UnknownContext(uri.to_string()))?;
        let mut document: Value = serde_json::from_str(raw)
            .map_err(|e| ConversionError::InvalidContext(format!("{}: {}", uri, e)))?;
        document
            .get_mut("@context")
            .map(Value::take)
            .ok_or_else(|| ConversionError::InvalidContext(format!("{} has no @context", uri)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMapping {
    /// String values are IRIs
    Id,
    /// String values are vocabulary terms or IRIs
    Vocab,
    /// String values are literals of this datatype
    Datatype(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDefinition {
    /// Absolute IRI or keyword the term stands for
    pub iri: String,
    pub type_mapping: Option<TypeMapping>,
    /// Values form an ordered `@list`
    pub list: bool,
}

/// The result of processing one or more contexts
#[derive(Debug, Clone, Default)]
pub struct ActiveContext {
    terms: HashMap<String, TermDefinition>,
    vocab: Option<String>,
}

pub(crate) fn is_keyword(value: &str) -> bool {
    value.len() > 1 && value.starts_with('@') && value[1..].chars().all(|c| c.is_ascii_alphabetic())
}

pub(crate) fn is_absolute(iri: &str) -> bool {
    !is_keyword(iri) && iri.contains(':')
}

impl ActiveContext {
    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    /// Expand a term, compact IRI or IRI
    ///
    /// With `vocab` set the value may be a term or vocabulary-relative;
    /// otherwise only compact IRIs are expanded. Values that cannot be
    /// expanded are returned unchanged.
    pub fn expand_iri(&self, value: &str, vocab: bool) -> String {
        if is_keyword(value) {
            return value.to_string();
        }
        if vocab {
            if let Some(definition) = self.terms.get(value) {
                return definition.iri.clone();
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return value.to_string();
            }
            return match self.terms.get(prefix) {
                Some(definition) => format!("{}{}", definition.iri, suffix),
                None => value.to_string(),
            };
        }
        match (&self.vocab, vocab) {
            (Some(base), true) => format!("{}{}", base, value),
            _ => value.to_string(),
        }
    }

    /// Process a local context on top of this one
    pub fn process(&self, local: &Value, loader: &ContextLoader) -> Result<Self, ConversionError> {
        self.process_at(local, loader, &mut Vec::new())
    }

    fn process_at(
        &self,
        local: &Value,
        loader: &ContextLoader,
        remote: &mut Vec<String>,
    ) -> Result<Self, ConversionError> {
        match local {
            Value::Null => Ok(Self::default()),
            Value::String(uri) => {
                if remote.contains(uri) {
                    return Err(ConversionError::InvalidContext(format!(
                        "recursive inclusion of {}",
                        uri
                    )));
                }
                let context = loader.load(uri)?;
                remote.push(uri.clone());
                let processed = self.process_at(&context, loader, remote);
                remote.pop();
                processed
            }
            Value::Array(items) => {
                let mut active = self.clone();
                for item in items {
                    active = active.process_at(item, loader, remote)?;
                }
                Ok(active)
            }
            Value::Object(definitions) => self.define(definitions),
            other => Err(ConversionError::InvalidContext(format!(
                "context must be an object, string, array or null, got {}",
                other
            ))),
        }
    }

    fn define(&self, local: &Map<String, Value>) -> Result<Self, ConversionError> {
        let mut active = self.clone();

        match local.get("@vocab") {
            None => {}
            Some(Value::Null) => active.vocab = None,
            Some(Value::String(vocab)) => {
                let expanded = active.expand_iri(vocab, true);
                if !is_absolute(&expanded) {
                    return Err(ConversionError::InvalidContext(format!(
                        "@vocab must be an absolute IRI: {}",
                        vocab
                    )));
                }
                active.vocab = Some(expanded);
            }
            Some(other) => {
                return Err(ConversionError::InvalidContext(format!(
                    "invalid @vocab: {}",
                    other
                )))
            }
        }

        let mut defined = HashMap::new();
        for term in local.keys().filter(|k| !k.starts_with('@')) {
            active.create_term(local, term, &mut defined)?;
        }
        Ok(active)
    }

    fn create_term(
        &mut self,
        local: &Map<String, Value>,
        term: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<(), ConversionError> {
        match defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => return Err(ConversionError::CyclicTerm(term.to_string())),
            None => {}
        }
        defined.insert(term.to_string(), false);

        let (id, type_mapping, container) = match local.get(term) {
            Some(Value::Null) | None => {
                self.terms.remove(term);
                defined.insert(term.to_string(), true);
                return Ok(());
            }
            Some(Value::String(iri)) => (Some(iri.as_str()), None, None),
            Some(Value::Object(definition)) => {
                let id = match definition.get("@id") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(iri)) => Some(iri.as_str()),
                    Some(other) => {
                        return Err(ConversionError::InvalidContext(format!(
                            "invalid @id for {}: {}",
                            term, other
                        )))
                    }
                };
                let type_mapping = definition.get("@type").and_then(Value::as_str);
                let container = definition.get("@container").and_then(Value::as_str);
                (id, type_mapping, container)
            }
            Some(other) => {
                return Err(ConversionError::InvalidContext(format!(
                    "invalid definition for {}: {}",
                    term, other
                )))
            }
        };

        let iri = match id {
            Some(id) if is_keyword(id) => id.to_string(),
            Some(id) => self.expand_for_definition(local, id, defined)?,
            None if term.contains(':') => self.expand_for_definition(local, term, defined)?,
            None => match &self.vocab {
                Some(vocab) => format!("{}{}", vocab, term),
                None => return Err(ConversionError::UnresolvableTerm(term.to_string())),
            },
        };
        if !is_keyword(&iri) && !is_absolute(&iri) {
            return Err(ConversionError::UnresolvableTerm(term.to_string()));
        }

        let type_mapping = match type_mapping {
            None => None,
            Some("@id") => Some(TypeMapping::Id),
            Some("@vocab") => Some(TypeMapping::Vocab),
            Some(datatype) => {
                let expanded = self.expand_for_definition(local, datatype, defined)?;
                if !is_absolute(&expanded) {
                    return Err(ConversionError::UnresolvableTerm(datatype.to_string()));
                }
                Some(TypeMapping::Datatype(expanded))
            }
        };

        self.terms.insert(
            term.to_string(),
            TermDefinition {
                iri,
                type_mapping,
                list: container == Some("@list"),
            },
        );
        defined.insert(term.to_string(), true);
        Ok(())
    }

    /// Expand `value` while `local` is being defined, defining the terms it
    /// depends on first
    fn expand_for_definition(
        &mut self,
        local: &Map<String, Value>,
        value: &str,
        defined: &mut HashMap<String, bool>,
    ) -> Result<String, ConversionError> {
        if is_keyword(value) {
            return Ok(value.to_string());
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Ok(value.to_string());
            }
            if local.contains_key(prefix) {
                self.create_term(local, prefix, defined)?;
            }
            return Ok(match self.terms.get(prefix) {
                Some(definition) => format!("{}{}", definition.iri, suffix),
                None => value.to_string(),
            });
        }
        if local.contains_key(value) {
            self.create_term(local, value, defined)?;
        }
        Ok(self.expand_iri(value, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn processed(local: Value) -> Result<ActiveContext, ConversionError> {
        ActiveContext::default().process(&local, &ContextLoader::new())
    }

    #[test]
    fn test_anno_context_loads() {
        let context = processed(json!(ANNO_CONTEXT_URI)).unwrap();

        assert_eq!(context.expand_iri("id", true), "@id");
        assert_eq!(context.expand_iri("type", true), "@type");
        assert_eq!(
            context.expand_iri("TextualBody", true),
            "http://www.w3.org/ns/oa#TextualBody"
        );
        let items = context.term("items").unwrap();
        assert!(items.list);
        assert_eq!(items.type_mapping, Some(TypeMapping::Id));
        assert_eq!(
            context.term("created").unwrap().type_mapping,
            Some(TypeMapping::Datatype(
                "http://www.w3.org/2001/XMLSchema#dateTime".to_string()
            ))
        );
    }

    #[test]
    fn test_prefix_redefinition_keeps_earlier_terms() {
        let context = processed(json!([
            ANNO_CONTEXT_URI,
            {"foaf": "http://xmlns.com/foaf/spec/", "name": "foaf:name"}
        ]))
        .unwrap();

        assert_eq!(
            context.expand_iri("Organization", true),
            "http://xmlns.com/foaf/0.1/Organization"
        );
        assert_eq!(
            context.expand_iri("name", true),
            "http://xmlns.com/foaf/spec/name"
        );
        assert_eq!(
            context.expand_iri("foaf:Person", false),
            "http://xmlns.com/foaf/spec/Person"
        );
    }

    #[test]
    fn test_terms_defined_out_of_order() {
        let context = processed(json!({
            "Entity": "crm:E1_Entity",
            "crm": "http://erlangen-crm.org/current/"
        }))
        .unwrap();
        assert_eq!(
            context.expand_iri("Entity", true),
            "http://erlangen-crm.org/current/E1_Entity"
        );
    }

    #[test]
    fn test_vocab() {
        let context = processed(json!({"@vocab": "http://example.org/vocab#"})).unwrap();
        assert_eq!(context.expand_iri("thing", true), "http://example.org/vocab#thing");
        assert_eq!(context.expand_iri("thing", false), "thing");
    }

    #[test]
    fn test_absolute_iris_pass_through() {
        let context = processed(json!({"https": "http://wrong.example/"})).unwrap();
        assert_eq!(
            context.expand_iri("https://www.wikidata.org/wiki/Q24011", false),
            "https://www.wikidata.org/wiki/Q24011"
        );
        assert_eq!(context.expand_iri("_:b1", false), "_:b1");
    }

    #[test]
    fn test_unknown_remote_context() {
        assert_eq!(
            processed(json!("http://example.org/missing.jsonld")).unwrap_err(),
            ConversionError::UnknownContext("http://example.org/missing.jsonld".to_string())
        );
    }

    #[test]
    fn test_cyclic_terms() {
        let result = processed(json!({"a": "b:x", "b": "a:y"}));
        assert!(matches!(result, Err(ConversionError::CyclicTerm(_))));
    }

    #[test]
    fn test_unresolvable_term() {
        let result = processed(json!({"label": {"@type": "@id"}}));
        assert_eq!(
            result.unwrap_err(),
            ConversionError::UnresolvableTerm("label".to_string())
        );
    }

    #[test]
    fn test_malformed_context() {
        assert!(matches!(
            processed(json!(42)),
            Err(ConversionError::InvalidContext(_))
        ));
        assert!(matches!(
            processed(json!({"term": 7})),
            Err(ConversionError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_recursive_remote_context() {
        let loader = ContextLoader::empty()
            .with_document("urn:ctx:a", r#"{"@context": "urn:ctx:a"}"#);
        let result = ActiveContext::default().process(&json!("urn:ctx:a"), &loader);
        assert!(matches!(result, Err(ConversionError::InvalidContext(_))));
    }
}
