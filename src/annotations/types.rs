//! Annotation types following the Web Annotation model
//!
//! An annotation is either a draft (a selection being edited, known only by
//! an ephemeral id) or a final Web-Annotation-shaped record with a stable
//! IRI. Final records keep their anchoring data (block index, offsets,
//! selected text) for local re-rendering; the exporter never emits them.
//!
//! Reference: <https://www.w3.org/TR/annotation-model/>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::{self, FieldSchema};
use crate::selection::SelectionTuple;

/// Process-unique identifier of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(u64);

impl TempId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft-{}", self.0)
    }
}

/// Identifier of either annotation state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationId {
    Draft(TempId),
    Final(String),
}

impl AnnotationId {
    pub fn final_id(id: impl Into<String>) -> Self {
        Self::Final(id.into())
    }
}

impl From<TempId> for AnnotationId {
    fn from(id: TempId) -> Self {
        Self::Draft(id)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationId::Draft(id) => id.fmt(f),
            AnnotationId::Final(id) => f.write_str(id),
        }
    }
}

/// An annotation in either state
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Draft(DraftAnnotation),
    Final(FinalAnnotation),
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Annotation::Draft(d) => AnnotationId::Draft(d.temp_id),
            Annotation::Final(f) => AnnotationId::Final(f.id.clone()),
        }
    }

    pub fn block_index(&self) -> usize {
        match self {
            Annotation::Draft(d) => d.block_index,
            Annotation::Final(f) => f.block_index,
        }
    }

    /// Character range in the block's original text
    pub fn range(&self) -> (usize, usize) {
        match self {
            Annotation::Draft(d) => (d.start_offset, d.end_offset),
            Annotation::Final(f) => (f.start_offset, f.end_offset),
        }
    }

    pub fn selected_text(&self) -> &str {
        match self {
            Annotation::Draft(d) => &d.selected_text,
            Annotation::Final(f) => &f.selected_text,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        match self {
            Annotation::Draft(d) => &d.fields,
            Annotation::Final(f) => &f.body.fields,
        }
    }

    pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, String> {
        match self {
            Annotation::Draft(d) => &mut d.fields,
            Annotation::Final(f) => &mut f.body.fields,
        }
    }

    pub fn as_final(&self) -> Option<&FinalAnnotation> {
        match self {
            Annotation::Final(f) => Some(f),
            Annotation::Draft(_) => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Annotation::Draft(_))
    }
}

/// A selection being edited, not yet finalized
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAnnotation {
    pub temp_id: TempId,
    pub selected_text: String,
    pub block_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Current value of every schema field
    pub fields: BTreeMap<String, String>,
}

impl DraftAnnotation {
    pub fn new(temp_id: TempId, selection: SelectionTuple, schema: &FieldSchema) -> Self {
        Self {
            temp_id,
            selected_text: selection.text,
            block_index: selection.block_index,
            start_offset: selection.start_offset,
            end_offset: selection.end_offset,
            fields: schema.empty_values(),
        }
    }
}

/// The only annotation type emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[default]
    Annotation,
}

/// Web Annotation motivations used by the annotator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motivation {
    #[default]
    Commenting,
    Describing,
    Classifying,
    Highlighting,
    Identifying,
    Linking,
    Tagging,
}

/// Types of annotation body content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BodyType {
    /// Plain text note
    #[default]
    TextualBody,
}

/// Body/content of a final annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBody {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    /// Free-text note
    pub value: String,
    /// Format of the note
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Schema field values, keyed by field id
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

/// Selector anchoring the annotation in its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    /// The exact text that was selected
    #[serde(rename = "TextQuoteSelector")]
    TextQuote { exact: String },
}

/// The target of an annotation (what is being annotated)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTarget {
    /// IRI of the annotated text
    pub source: String,
    pub selector: Selector,
}

impl AnnotationTarget {
    pub fn text_quote(source: &str, exact: &str) -> Self {
        Self {
            source: source.to_string(),
            selector: Selector::TextQuote {
                exact: exact.to_string(),
            },
        }
    }

    pub fn exact(&self) -> &str {
        match &self.selector {
            Selector::TextQuote { exact } => exact,
        }
    }
}

/// Who made the annotation, when, and what it interprets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub creator: String,
    pub created: DateTime<Utc>,
    /// Compact IRI of the interpretation act that produced the annotation
    #[serde(rename = "generatedBy")]
    pub generated_by: String,
    pub anchor: String,
    #[serde(rename = "conceptualLevel")]
    pub conceptual_level: String,
}

impl Provenance {
    /// Stamp a new interpretation act for `fields`
    pub fn stamp(fields: &BTreeMap<String, String>, default_creator: Option<&str>) -> Self {
        let mut provenance = Self {
            creator: String::new(),
            created: Utc::now(),
            generated_by: format!("geko:int-act/{}", uuid::Uuid::new_v4()),
            anchor: String::new(),
            conceptual_level: String::new(),
        };
        provenance.refresh(fields, default_creator);
        provenance
    }

    /// Re-read the field-derived parts after the fields changed
    pub fn refresh(&mut self, fields: &BTreeMap<String, String>, default_creator: Option<&str>) {
        let get = |id: &str| fields.get(id).cloned().unwrap_or_default();
        self.creator = match get(schema::CREATOR) {
            c if c.trim().is_empty() => default_creator.unwrap_or_default().to_string(),
            c => c,
        };
        self.anchor = get(schema::ANCHOR);
        self.conceptual_level = get(schema::CONCEPTUAL_LEVEL);
    }
}

/// A finalized, Web-Annotation-shaped annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnnotation {
    /// Stable IRI
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub motivation: Motivation,
    pub body: AnnotationBody,
    pub target: AnnotationTarget,
    pub provenance: Provenance,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(rename = "blockIndex")]
    pub block_index: usize,
    #[serde(rename = "startOffset")]
    pub start_offset: usize,
    #[serde(rename = "endOffset")]
    pub end_offset: usize,
    #[serde(rename = "selectedText")]
    pub selected_text: String,
}

impl FinalAnnotation {
    /// Value of a schema field, empty when unset
    pub fn field(&self, id: &str) -> &str {
        self.body.fields.get(id).map(String::as_str).unwrap_or("")
    }

    /// Whether the record carries everything an export needs
    pub fn is_exportable(&self) -> bool {
        !self.selected_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GEKO_SCHEMA;

    fn sample_final() -> FinalAnnotation {
        let mut fields = GEKO_SCHEMA.empty_values();
        fields.insert("ekphrastic-modality".into(), "Denotation".into());
        FinalAnnotation {
            id: "https://example.org/annotations/1".into(),
            kind: AnnotationKind::Annotation,
            motivation: Motivation::Commenting,
            body: AnnotationBody {
                body_type: BodyType::TextualBody,
                value: "note".into(),
                format: "text/plain".into(),
                language: None,
                fields: fields.clone(),
            },
            target: AnnotationTarget::text_quote("https://example.org/text", "giovani"),
            provenance: Provenance::stamp(&fields, Some("anonymous")),
            modified: None,
            block_index: 0,
            start_offset: 10,
            end_offset: 17,
            selected_text: "giovani".into(),
        }
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(TempId::new(3).to_string(), "draft-3");
        assert_eq!(AnnotationId::from(TempId::new(3)).to_string(), "draft-3");
        assert_eq!(AnnotationId::final_id("urn:x").to_string(), "urn:x");
    }

    #[test]
    fn test_draft_starts_with_every_field_empty() {
        let tuple = SelectionTuple {
            block_index: 0,
            start_offset: 10,
            end_offset: 17,
            text: "giovani".into(),
        };
        let draft = DraftAnnotation::new(TempId::new(1), tuple, &GEKO_SCHEMA);
        assert_eq!(draft.fields.len(), GEKO_SCHEMA.len());
        assert_eq!(draft.selected_text, "giovani");
    }

    #[test]
    fn test_provenance_defaults_creator() {
        let fields = GEKO_SCHEMA.empty_values();
        let provenance = Provenance::stamp(&fields, Some("anonymous"));
        assert_eq!(provenance.creator, "anonymous");
        assert!(provenance.generated_by.starts_with("geko:int-act/"));

        let mut fields = fields;
        fields.insert("creator".into(), "Ada".into());
        let provenance = Provenance::stamp(&fields, Some("anonymous"));
        assert_eq!(provenance.creator, "Ada");
    }

    #[test]
    fn test_serialization() {
        let annotation = sample_final();
        let json = serde_json::to_value(&annotation).unwrap();

        assert_eq!(json["type"], "Annotation");
        assert_eq!(json["motivation"], "commenting");
        assert_eq!(json["body"]["type"], "TextualBody");
        assert_eq!(json["body"]["ekphrastic-modality"], "Denotation");
        assert_eq!(json["target"]["selector"]["type"], "TextQuoteSelector");
        assert_eq!(json["target"]["selector"]["exact"], "giovani");
        assert_eq!(json["startOffset"], 10);
        assert!(json.get("modified").is_none());

        // Verify round-trip
        let parsed: FinalAnnotation = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, annotation);
    }
}
