//! JSON-LD documents built from final annotations
//!
//! Documents are constructed field by field from the schema table; nothing
//! is copied from the stored record wholesale, so anchoring data
//! (`blockIndex`, offsets, `selectedText`) can never leak into an export.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::context::{export_context, CONTEXT_VERSION};
use crate::annotations::{
    AnnotationKind, AnnotationTarget, BodyType, FinalAnnotation, Motivation,
};
use crate::schema::{self, FieldSchema};

/// File name offered for collection downloads
pub const DOWNLOAD_FILE_NAME: &str = "annotations.jsonld";

/// Content type of collection downloads
pub const DOWNLOAD_CONTENT_TYPE: &str = "application/json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A linked-data node reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl NodeRef {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: Some(node_type.into()),
        }
    }
}

/// A schema field value as a labelled node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValueNode {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyDocument {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub value: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// One node per schema field, keyed by ontology term
    #[serde(flatten)]
    pub terms: BTreeMap<String, FieldValueNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpretationAct {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "hasInterpretationCriterion")]
    pub criterion: NodeRef,
    #[serde(rename = "hasInterpretationType")]
    pub interpretation_type: NodeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    #[serde(rename = "hasConceptualLevel")]
    pub conceptual_level: NodeRef,
    #[serde(rename = "isAnchoredTo")]
    pub anchored_to: NodeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
}

/// Export shape of one final annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub motivation: Motivation,
    pub body: BodyDocument,
    pub target: AnnotationTarget,
    #[serde(rename = "wasGeneratedBy")]
    pub was_generated_by: InterpretationAct,
    #[serde(rename = "hasAnchor")]
    pub has_anchor: AnchorNode,
    pub creator: PersonNode,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Collection-level metadata of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMeta {
    pub id: String,
    pub form: NodeRef,
    pub textual_referent: NodeRef,
    pub iconic_referent: NodeRef,
}

impl Default for CollectionMeta {
    fn default() -> Self {
        Self {
            id: "geko:annotation-page/default".to_string(),
            form: NodeRef::new("geko:form-mimetic", "Mimetic"),
            textual_referent: NodeRef::new("geko:riviere-text-ek", "Expression"),
            iconic_referent: NodeRef::new("https://www.wikidata.org/wiki/Q24011", "Work"),
        }
    }
}

impl CollectionMeta {
    /// Metadata for the collection of one resource
    pub fn for_resource(resource_id: &str) -> Self {
        Self {
            id: format!(
                "geko:annotation-page/{}",
                urlencoding::encode(resource_id)
            ),
            ..Self::default()
        }
    }
}

/// An exported annotation collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionDocument {
    #[serde(rename = "@context")]
    pub context: Value,
    pub id: String,
    #[serde(rename = "type")]
    pub kinds: Vec<String>,
    #[serde(rename = "hasForm")]
    pub form: NodeRef,
    #[serde(rename = "hasTextualReferent")]
    pub textual_referent: NodeRef,
    #[serde(rename = "hasIconicReferent")]
    pub iconic_referent: NodeRef,
    /// Version of the context the collection was written with
    #[serde(rename = "versionInfo")]
    pub context_version: String,
    pub items: Vec<AnnotationDocument>,
}

/// Result of a collection export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub document: CollectionDocument,
    /// Ids of records left out of the export
    pub skipped: Vec<String>,
}

impl ExportReport {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.document)
    }

    /// Pretty-printed body of the download file
    pub fn to_download(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

/// Builds JSON-LD documents from final annotations
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    schema: &'static FieldSchema,
}

impl Serializer {
    pub fn new(schema: &'static FieldSchema) -> Self {
        Self { schema }
    }

    pub fn annotation_document(&self, annotation: &FinalAnnotation) -> AnnotationDocument {
        let terms = self
            .schema
            .iter()
            .map(|field| {
                let value = annotation.field(field.id);
                let node = FieldValueNode {
                    id: field.node_id(value),
                    node_type: field.node_type(value).map(str::to_string),
                    label: value.to_string(),
                };
                (field.term.to_string(), node)
            })
            .collect();

        let provenance = &annotation.provenance;

        AnnotationDocument {
            id: annotation.id.clone(),
            kind: annotation.kind,
            motivation: annotation.motivation,
            body: BodyDocument {
                body_type: annotation.body.body_type,
                value: annotation.body.value.clone(),
                format: annotation.body.format.clone(),
                language: annotation.body.language.clone(),
                terms,
            },
            target: annotation.target.clone(),
            was_generated_by: InterpretationAct {
                id: provenance.generated_by.clone(),
                node_type: "InterpretationAct".to_string(),
                criterion: self.node_ref(
                    schema::INTERPRETATION_CRITERION,
                    annotation.field(schema::INTERPRETATION_CRITERION),
                ),
                interpretation_type: self.node_ref(
                    schema::INTERPRETATION_TYPE,
                    annotation.field(schema::INTERPRETATION_TYPE),
                ),
            },
            has_anchor: AnchorNode {
                id: self.node_ref(schema::ANCHOR, &provenance.anchor).id,
                node_type: "Anchor".to_string(),
                label: provenance.anchor.clone(),
                conceptual_level: self
                    .node_ref(schema::CONCEPTUAL_LEVEL, &provenance.conceptual_level),
                anchored_to: self.node_ref(schema::ENTITY, annotation.field(schema::ENTITY)),
            },
            creator: PersonNode {
                id: self.node_ref(schema::CREATOR, &provenance.creator).id,
                node_type: "Person".to_string(),
                name: provenance.creator.clone(),
            },
            created: provenance.created.format(TIMESTAMP_FORMAT).to_string(),
            modified: annotation
                .modified
                .map(|m| m.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    /// Wrap the exportable finals into a collection document
    ///
    /// Records without selected text are left out and reported; the rest
    /// keep their order.
    pub fn collection_document(
        &self,
        finals: &[FinalAnnotation],
        meta: &CollectionMeta,
    ) -> ExportReport {
        let mut items = Vec::with_capacity(finals.len());
        let mut skipped = Vec::new();

        for annotation in finals {
            if !annotation.is_exportable() {
                tracing::warn!(id = %annotation.id, "Skipping annotation without selected text");
                skipped.push(annotation.id.clone());
                continue;
            }
            items.push(self.annotation_document(annotation));
        }

        tracing::debug!(
            collection = %meta.id,
            items = items.len(),
            skipped = skipped.len(),
            "Built annotation collection"
        );

        ExportReport {
            document: CollectionDocument {
                context: export_context(),
                id: meta.id.clone(),
                kinds: vec!["AnnotationCollection".to_string(), "Ekphrasis".to_string()],
                form: meta.form.clone(),
                textual_referent: meta.textual_referent.clone(),
                iconic_referent: meta.iconic_referent.clone(),
                context_version: CONTEXT_VERSION.to_string(),
                items,
            },
            skipped,
        }
    }

    fn node_ref(&self, field_id: &str, value: &str) -> NodeRef {
        match self.schema.get(field_id) {
            Some(field) => NodeRef {
                id: field.node_id(value),
                node_type: field.node_type(value).map(str::to_string),
            },
            None => NodeRef {
                id: format!("geko:{}/{}", field_id, schema::slug(value)),
                node_type: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationStore, StoreSettings};
    use crate::schema::GEKO_SCHEMA;
    use crate::selection::SelectionTuple;

    fn finalized(fields: &[(&str, &str)]) -> FinalAnnotation {
        let mut store = AnnotationStore::new(&GEKO_SCHEMA, StoreSettings::default());
        let temp = store.create(SelectionTuple {
            block_index: 0,
            start_offset: 10,
            end_offset: 17,
            text: "giovani".to_string(),
        });
        for (field, value) in fields {
            store.set_field(&temp.into(), field, value).unwrap();
        }
        store.finalize(temp, "note").unwrap()
    }

    #[test]
    fn test_document_maps_fields_to_terms() {
        let annotation = finalized(&[
            ("ekphrastic-modality", "Denotation"),
            ("int-type", "Allegorical Reading"),
            ("icon-level", "IconologicalSubject"),
            ("creator", "Giorgio Vasari"),
        ]);
        let document = Serializer::new(&GEKO_SCHEMA).annotation_document(&annotation);
        let json = serde_json::to_value(&document).unwrap();

        let modality = &json["body"]["hasEkphrasticModality"];
        assert_eq!(modality["id"], "geko:ek-mod/denotation");
        assert_eq!(modality["type"], "Denotation");
        assert_eq!(modality["label"], "Denotation");
        assert_eq!(json["body"]["value"], "note");
        assert_eq!(json["body"]["type"], "TextualBody");

        assert_eq!(
            json["wasGeneratedBy"]["hasInterpretationType"]["id"],
            "geko:int-type/allegorical-reading"
        );
        assert_eq!(
            json["hasAnchor"]["hasConceptualLevel"]["type"],
            "IconologicalSubject"
        );
        assert_eq!(json["creator"]["id"], "geko:creator/giorgio-vasari");
        assert_eq!(json["creator"]["name"], "Giorgio Vasari");
        assert_eq!(json["target"]["selector"]["exact"], "giovani");
    }

    #[test]
    fn test_document_has_no_internal_fields() {
        let annotation = finalized(&[("anchor", "Cupid")]);
        let json = serde_json::to_value(
            Serializer::new(&GEKO_SCHEMA).annotation_document(&annotation),
        )
        .unwrap();

        for key in [
            "tempId",
            "paragraphIndex",
            "blockIndex",
            "startOffset",
            "endOffset",
            "selectedText",
            "provenance",
        ] {
            assert!(json.get(key).is_none(), "{} leaked", key);
        }
        // raw field values are not duplicated into the body
        for field in GEKO_SCHEMA.iter() {
            assert!(!json["body"][field.id].is_string(), "{} leaked", field.id);
        }
    }

    #[test]
    fn test_empty_values_still_produce_nodes() {
        let annotation = finalized(&[]);
        let json = serde_json::to_value(
            Serializer::new(&GEKO_SCHEMA).annotation_document(&annotation),
        )
        .unwrap();

        assert_eq!(json["body"]["hasAnchor"]["id"], "geko:anchor/");
        assert_eq!(json["body"]["hasAnchor"]["label"], "");
        assert_eq!(json["hasAnchor"]["label"], "");
        assert!(json["wasGeneratedBy"]["id"]
            .as_str()
            .unwrap()
            .starts_with("geko:int-act/"));
        assert!(json["creator"]["name"].is_string());
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let annotation = finalized(&[("ekphrastic-modality", "Integration")]);
        let serializer = Serializer::new(&GEKO_SCHEMA);

        let first = serde_json::to_value(serializer.annotation_document(&annotation)).unwrap();
        let second = serde_json::to_value(serializer.annotation_document(&annotation)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_created_timestamp_format() {
        let annotation = finalized(&[]);
        let document = Serializer::new(&GEKO_SCHEMA).annotation_document(&annotation);

        let created = document.created.as_bytes();
        assert_eq!(created.len(), 20);
        assert_eq!(created[10], b'T');
        assert_eq!(created[19], b'Z');
        assert!(document.modified.is_none());
    }

    #[test]
    fn test_collection_skips_records_without_text() {
        let kept = finalized(&[]);
        let mut broken = finalized(&[]);
        broken.selected_text = "   ".to_string();
        let later = finalized(&[]);

        let report = Serializer::new(&GEKO_SCHEMA).collection_document(
            &[kept.clone(), broken.clone(), later.clone()],
            &CollectionMeta::for_resource("canvas 1"),
        );

        assert_eq!(report.skipped, vec![broken.id]);
        let ids: Vec<_> = report.document.items.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec![kept.id, later.id]);

        let json = report.to_value().unwrap();
        assert_eq!(json["id"], "geko:annotation-page/canvas%201");
        assert_eq!(json["type"][0], "AnnotationCollection");
        assert_eq!(json["type"][1], "Ekphrasis");
        assert_eq!(json["hasIconicReferent"]["type"], "Work");
        assert_eq!(json["@context"][0], "http://www.w3.org/ns/anno.jsonld");
        assert_eq!(json["versionInfo"], CONTEXT_VERSION);
    }

    #[test]
    fn test_download_is_pretty_json() {
        let report = Serializer::new(&GEKO_SCHEMA)
            .collection_document(&[finalized(&[])], &CollectionMeta::default());
        let download = report.to_download().unwrap();
        assert!(download.contains("\n  \"@context\""));
        assert!(DOWNLOAD_FILE_NAME.ends_with(".jsonld"));
    }
}
