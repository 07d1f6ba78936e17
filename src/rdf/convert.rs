//! JSON-LD to RDF extraction
//!
//! Walks node objects depth-first, producing one quad per property value in
//! the default graph. Blank nodes are labelled `b0`, `b1`, ... in traversal
//! order, so the same document always yields the same quads.

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Subject, Term};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use super::context::{is_absolute, is_keyword, ActiveContext, ContextLoader, TermDefinition, TypeMapping};
use super::ConversionError;

pub(crate) struct Emitter<'a> {
    loader: &'a ContextLoader,
    quads: Vec<Quad>,
    seen: HashSet<Quad>,
    labels: HashMap<String, BlankNode>,
    next_blank: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(loader: &'a ContextLoader) -> Self {
        Self {
            loader,
            quads: Vec::new(),
            seen: HashSet::new(),
            labels: HashMap::new(),
            next_blank: 0,
        }
    }

    pub(crate) fn into_quads(self) -> Vec<Quad> {
        self.quads
    }

    pub(crate) fn document(&mut self, document: &Value) -> Result<(), ConversionError> {
        let context = ActiveContext::default();
        match document {
            Value::Object(node) => {
                self.node(&context, node)?;
            }
            Value::Array(nodes) => {
                for node in nodes {
                    match node {
                        Value::Object(node) => {
                            self.node(&context, node)?;
                        }
                        other => {
                            return Err(ConversionError::InvalidDocument(format!(
                                "top-level items must be objects, got {}",
                                other
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(ConversionError::InvalidDocument(format!(
                    "document must be an object or array, got {}",
                    other
                )))
            }
        }
        Ok(())
    }

    fn node(
        &mut self,
        context: &ActiveContext,
        node: &Map<String, Value>,
    ) -> Result<NamedOrBlankNode, ConversionError> {
        let context = match node.get("@context") {
            Some(local) => Cow::Owned(context.process(local, self.loader)?),
            None => Cow::Borrowed(context),
        };

        let mut id = None;
        let mut types = Vec::new();
        let mut graph = Vec::new();
        let mut properties = Vec::new();

        for (key, value) in node {
            if key == "@context" {
                continue;
            }
            let expanded = context.expand_iri(key, true);
            match expanded.as_str() {
                "@id" => id = Some(value),
                "@type" => types.push(value),
                "@graph" => graph.push(value),
                keyword if is_keyword(keyword) => {
                    tracing::debug!(keyword, "Ignoring unsupported keyword");
                }
                _ if !is_absolute(&expanded) || expanded.starts_with("_:") => {
                    tracing::debug!(key = %key, "Dropping property without an IRI mapping");
                }
                _ => properties.push((key, expanded, value)),
            }
        }

        let subject = match id {
            Some(Value::String(id)) => self.resource(&context, id, false)?,
            Some(other) => {
                return Err(ConversionError::InvalidDocument(format!(
                    "@id must be a string, got {}",
                    other
                )))
            }
            None => self.fresh().into(),
        };

        for value in types.into_iter().flat_map(values) {
            let Value::String(name) = value else {
                return Err(ConversionError::InvalidDocument(format!(
                    "@type values must be strings, got {}",
                    value
                )));
            };
            let class = self.resource(&context, name, true)?;
            self.emit(subject.clone(), rdf::TYPE.into_owned(), class);
        }

        for (key, iri, value) in properties {
            let predicate = named(&iri)?;
            let definition = context.term(key);

            if definition.is_some_and(|d| d.list) {
                let list = self.list(&context, definition, value)?;
                self.emit(subject.clone(), predicate, list);
                continue;
            }

            for item in values(value) {
                let object = match list_items(item) {
                    Some(_) => Some(self.list(&context, definition, item)?),
                    None => self.object(&context, definition, item)?,
                };
                if let Some(object) = object {
                    self.emit(subject.clone(), predicate.clone(), object);
                }
            }
        }

        for item in graph.into_iter().flat_map(values) {
            match item {
                Value::Object(node) => {
                    self.node(&context, node)?;
                }
                other => {
                    return Err(ConversionError::InvalidDocument(format!(
                        "@graph items must be objects, got {}",
                        other
                    )))
                }
            }
        }

        Ok(subject)
    }

    fn object(
        &mut self,
        context: &ActiveContext,
        definition: Option<&TermDefinition>,
        value: &Value,
    ) -> Result<Option<Term>, ConversionError> {
        let coercion = definition.and_then(|d| d.type_mapping.as_ref());

        let term = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => {
                let datatype = match coercion {
                    Some(TypeMapping::Datatype(dt)) => named(dt)?,
                    _ => xsd::BOOLEAN.into_owned(),
                };
                Literal::new_typed_literal(b.to_string(), datatype).into()
            }
            Value::Number(n) => number_literal(n, coercion)?.into(),
            Value::String(s) => match coercion {
                Some(TypeMapping::Id) => self.resource(context, s, false)?.into(),
                Some(TypeMapping::Vocab) => self.resource(context, s, true)?.into(),
                Some(TypeMapping::Datatype(dt)) => {
                    Literal::new_typed_literal(s.as_str(), named(dt)?).into()
                }
                None => Literal::new_simple_literal(s.as_str()).into(),
            },
            Value::Object(map) => match keyword_entry(context, map, "@value") {
                Some(literal) => value_object(context, map, literal)?.into(),
                None => Term::from(self.node(context, map)?),
            },
            Value::Array(_) => {
                return Err(ConversionError::InvalidDocument(
                    "nested arrays are not supported".to_string(),
                ))
            }
        };
        Ok(Some(term))
    }

    fn list(
        &mut self,
        context: &ActiveContext,
        definition: Option<&TermDefinition>,
        value: &Value,
    ) -> Result<Term, ConversionError> {
        let items = match list_items(value) {
            Some(items) => items,
            None => values(value),
        };

        let mut objects = Vec::with_capacity(items.len());
        for item in items {
            if let Some(object) = self.object(context, definition, item)? {
                objects.push(object);
            }
        }
        if objects.is_empty() {
            return Ok(rdf::NIL.into_owned().into());
        }

        let cells: Vec<BlankNode> = objects.iter().map(|_| self.fresh()).collect();
        for (i, object) in objects.into_iter().enumerate() {
            self.emit(cells[i].clone(), rdf::FIRST.into_owned(), object);
            let rest: Term = match cells.get(i + 1) {
                Some(next) => next.clone().into(),
                None => rdf::NIL.into_owned().into(),
            };
            self.emit(cells[i].clone(), rdf::REST.into_owned(), rest);
        }
        Ok(cells[0].clone().into())
    }

    /// A node reference from an IRI, compact IRI, term or blank node id
    fn resource(
        &mut self,
        context: &ActiveContext,
        value: &str,
        vocab: bool,
    ) -> Result<NamedOrBlankNode, ConversionError> {
        let expanded = context.expand_iri(value, vocab);
        if let Some(label) = expanded.strip_prefix("_:") {
            return Ok(self.labelled(label).into());
        }
        if !is_absolute(&expanded) {
            return Err(if vocab {
                ConversionError::UnresolvableTerm(value.to_string())
            } else {
                ConversionError::InvalidIri(format!("relative IRI {}", value))
            });
        }
        Ok(named(&expanded)?.into())
    }

    fn labelled(&mut self, label: &str) -> BlankNode {
        if let Some(node) = self.labels.get(label) {
            return node.clone();
        }
        let node = self.fresh();
        self.labels.insert(label.to_string(), node.clone());
        node
    }

    fn fresh(&mut self) -> BlankNode {
        let node = BlankNode::new_unchecked(format!("b{}", self.next_blank));
        self.next_blank += 1;
        node
    }

    fn emit(
        &mut self,
        subject: impl Into<Subject>,
        predicate: NamedNode,
        object: impl Into<Term>,
    ) {
        let quad = Quad::new(subject, predicate, object, GraphName::DefaultGraph);
        if self.seen.insert(quad.clone()) {
            self.quads.push(quad);
        }
    }
}

fn named(iri: &str) -> Result<NamedNode, ConversionError> {
    NamedNode::new(iri).map_err(|e| ConversionError::InvalidIri(format!("{}: {}", iri, e)))
}

/// Property values as a flat sequence (arrays and `@set` objects unwrapped)
fn values(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(values).collect(),
        Value::Object(map) if map.contains_key("@set") => {
            map.get("@set").map(values).unwrap_or_default()
        }
        other => vec![other],
    }
}

fn list_items(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Object(map) => map.get("@list").map(|items| match items {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        }),
        _ => None,
    }
}

fn keyword_entry<'v>(
    context: &ActiveContext,
    map: &'v Map<String, Value>,
    keyword: &str,
) -> Option<&'v Value> {
    map.iter()
        .find(|(key, _)| context.expand_iri(key, true) == keyword)
        .map(|(_, value)| value)
}

fn value_object(
    context: &ActiveContext,
    map: &Map<String, Value>,
    literal: &Value,
) -> Result<Literal, ConversionError> {
    let datatype = keyword_entry(context, map, "@type").and_then(Value::as_str);
    let language = keyword_entry(context, map, "@language").and_then(Value::as_str);

    let lexical = match literal {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            let coercion = datatype.map(|dt| TypeMapping::Datatype(context.expand_iri(dt, true)));
            return number_literal(n, coercion.as_ref());
        }
        other => {
            return Err(ConversionError::InvalidDocument(format!(
                "@value must be a scalar, got {}",
                other
            )))
        }
    };

    match (datatype, language) {
        (Some(dt), _) => Ok(Literal::new_typed_literal(
            lexical,
            named(&context.expand_iri(dt, true))?,
        )),
        (None, Some(tag)) => Literal::new_language_tagged_literal(lexical, tag)
            .map_err(|e| ConversionError::InvalidDocument(format!("language tag {}: {}", tag, e))),
        (None, None) => Ok(Literal::new_simple_literal(lexical)),
    }
}

fn number_literal(
    number: &Number,
    coercion: Option<&TypeMapping>,
) -> Result<Literal, ConversionError> {
    let (lexical, default) = if number.is_i64() || number.is_u64() {
        (number.to_string(), xsd::INTEGER)
    } else {
        let double = number.as_f64().unwrap_or_default();
        (format!("{:E}", double), xsd::DOUBLE)
    };
    let datatype = match coercion {
        Some(TypeMapping::Datatype(dt)) => named(dt)?,
        _ => default.into_owned(),
    };
    Ok(Literal::new_typed_literal(lexical, datatype))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quads(document: Value) -> Result<Vec<String>, ConversionError> {
        let loader = ContextLoader::new();
        let mut emitter = Emitter::new(&loader);
        emitter.document(&document)?;
        Ok(emitter.into_quads().iter().map(|q| q.to_string()).collect())
    }

    #[test]
    fn test_simple_node() {
        let lines = quads(json!({
            "@context": {"ex": "http://example.org/", "name": "ex:name"},
            "@id": "ex:a",
            "@type": "ex:Thing",
            "name": "Primavera"
        }))
        .unwrap();

        assert_eq!(
            lines,
            vec![
                "<http://example.org/a> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/Thing>",
                "<http://example.org/a> <http://example.org/name> \"Primavera\"",
            ]
        );
    }

    #[test]
    fn test_blank_nodes_are_deterministic() {
        let document = json!({
            "@context": {"ex": "http://example.org/", "knows": {"@id": "ex:knows"}},
            "knows": [{"knows": {"@id": "_:x"}}, {"@id": "_:x"}]
        });
        let first = quads(document.clone()).unwrap();
        let second = quads(document).unwrap();
        assert_eq!(first, second);
        assert!(first.contains(&"_:b1 <http://example.org/knows> _:b2".to_string()));
        assert!(first.contains(&"_:b0 <http://example.org/knows> _:b1".to_string()));
        assert!(first.contains(&"_:b0 <http://example.org/knows> _:b2".to_string()));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_list_container() {
        let lines = quads(json!({
            "@context": {
                "ex": "http://example.org/",
                "items": {"@id": "ex:items", "@container": "@list"}
            },
            "@id": "ex:c",
            "items": ["a", "b"]
        }))
        .unwrap();

        assert!(lines.contains(&"_:b0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#first> \"a\"".to_string()));
        assert!(lines.contains(&"_:b0 <http://www.w3.org/1999/02/22-rdf-syntax-ns#rest> _:b1".to_string()));
        assert!(lines.contains(&"_:b1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#rest> <http://www.w3.org/1999/02/22-rdf-syntax-ns#nil>".to_string()));
        assert!(lines.contains(&"<http://example.org/c> <http://example.org/items> _:b0".to_string()));
    }

    #[test]
    fn test_typed_and_native_literals() {
        let lines = quads(json!({
            "@context": {
                "ex": "http://example.org/",
                "xsd": "http://www.w3.org/2001/XMLSchema#",
                "when": {"@id": "ex:when", "@type": "xsd:dateTime"},
                "count": "ex:count",
                "flag": "ex:flag",
                "title": "ex:title"
            },
            "@id": "ex:a",
            "when": "2025-01-01T00:00:00Z",
            "count": 3,
            "flag": true,
            "title": {"@value": "Titolo", "@language": "it"}
        }))
        .unwrap();

        assert!(lines.contains(&"<http://example.org/a> <http://example.org/when> \"2025-01-01T00:00:00Z\"^^<http://www.w3.org/2001/XMLSchema#dateTime>".to_string()));
        assert!(lines.contains(&"<http://example.org/a> <http://example.org/count> \"3\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_string()));
        assert!(lines.contains(&"<http://example.org/a> <http://example.org/flag> \"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>".to_string()));
        assert!(lines.contains(&"<http://example.org/a> <http://example.org/title> \"Titolo\"@it".to_string()));
    }

    #[test]
    fn test_undefined_terms_are_dropped() {
        let lines = quads(json!({
            "@context": {"ex": "http://example.org/"},
            "@id": "ex:a",
            "blockIndex": 0,
            "ex:kept": "yes"
        }))
        .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("kept"));
    }

    #[test]
    fn test_duplicate_statements_collapse() {
        let lines = quads(json!([
            {"@id": "http://example.org/a", "http://example.org/p": "x"},
            {"@id": "http://example.org/a", "http://example.org/p": "x"}
        ]))
        .unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_relative_iri_fails() {
        let result = quads(json!({"@id": "relative/path", "http://example.org/p": "x"}));
        assert!(matches!(result, Err(ConversionError::InvalidIri(_))));
    }

    #[test]
    fn test_unresolvable_type_fails() {
        let result = quads(json!({"@id": "http://example.org/a", "@type": "Thing"}));
        assert_eq!(
            result.unwrap_err(),
            ConversionError::UnresolvableTerm("Thing".to_string())
        );
    }

    #[test]
    fn test_scalar_document_fails() {
        assert!(matches!(
            quads(json!("just a string")),
            Err(ConversionError::InvalidDocument(_))
        ));
    }
}
