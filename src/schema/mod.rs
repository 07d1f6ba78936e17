//! Annotation field schema
//!
//! A closed, ordered table of the metadata fields a user can attach to an
//! annotation. The same table drives the edit form (labels and allowed
//! values) and the ontology mapping used when exporting JSON-LD.

use std::collections::BTreeMap;

/// How a field value becomes a linked-data node in the exported body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldNode {
    /// Node of a fixed class, identified by `id_prefix` + slug of the value
    Classified {
        class: &'static str,
        id_prefix: &'static str,
    },
    /// The value is itself a vocabulary term and becomes the node type
    Vocabulary { id_prefix: &'static str },
    /// The value is an external IRI when it is a valid absolute one, otherwise a slug
    Reference {
        class: &'static str,
        id_prefix: &'static str,
    },
}

/// A single metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Stable field identifier, used as the key in annotation bodies
    pub id: &'static str,
    /// Human readable label for the edit form
    pub label: &'static str,
    /// Values offered by the form; empty means free text
    pub allowed: &'static [&'static str],
    /// Ontology term the field maps onto
    pub term: &'static str,
    /// Node shape of the exported value
    pub node: FieldNode,
}

impl FieldDef {
    /// Whether the form offers a fixed list of values
    fn is_choice(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// Whether `value` is one of the offered values (free text accepts all)
    pub fn offers(&self, value: &str) -> bool {
        !self.is_choice() || self.allowed.contains(&value)
    }

    /// Compact IRI of the node for a stored value
    pub fn node_id(&self, value: &str) -> String {
        match self.node {
            FieldNode::Classified { id_prefix, .. } | FieldNode::Vocabulary { id_prefix } => {
                format!("{}{}", id_prefix, slug(value))
            }
            FieldNode::Reference { id_prefix, .. } => {
                let trimmed = value.trim();
                if trimmed.contains("://") && oxrdf::NamedNode::new(trimmed).is_ok() {
                    trimmed.to_string()
                } else {
                    format!("{}{}", id_prefix, slug(value))
                }
            }
        }
    }

    /// Node type for a stored value, if one can be named
    pub fn node_type(&self, value: &str) -> Option<&'static str> {
        match self.node {
            FieldNode::Classified { class, .. } | FieldNode::Reference { class, .. } => Some(class),
            FieldNode::Vocabulary { .. } => self.allowed.iter().copied().find(|v| *v == value),
        }
    }
}

/// Ordered collection of field definitions
#[derive(Debug)]
pub struct FieldSchema {
    fields: &'static [FieldDef],
}

impl FieldSchema {
    pub const fn new(fields: &'static [FieldDef]) -> Self {
        Self { fields }
    }

    /// Look up a field by id
    pub fn get(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Fields in form order
    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A value map with every field present and unset
    pub fn empty_values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.id.to_string(), String::new()))
            .collect()
    }

    /// Complete value map for `values`: every schema field, unknown keys dropped
    pub fn complete(&self, values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| {
                let value = values.get(f.id).cloned().unwrap_or_default();
                (f.id.to_string(), value)
            })
            .collect()
    }
}

pub const EKPHRASTIC_MODALITY: &str = "ekphrastic-modality";
pub const INTERPRETATION_TYPE: &str = "int-type";
pub const INTERPRETATION_CRITERION: &str = "int-criterion";
pub const ANCHOR: &str = "anchor";
pub const ENTITY: &str = "entity";
pub const CONCEPTUAL_LEVEL: &str = "icon-level";
pub const CREATOR: &str = "creator";

static GEKO_FIELD_DEFS: [FieldDef; 7] = [
    FieldDef {
        id: EKPHRASTIC_MODALITY,
        label: "Ekphrastic Modality",
        allowed: &["Denotation", "Dynamization", "Integration"],
        term: "hasEkphrasticModality",
        node: FieldNode::Vocabulary {
            id_prefix: "geko:ek-mod/",
        },
    },
    FieldDef {
        id: INTERPRETATION_TYPE,
        label: "Interpretation Type",
        allowed: &[],
        term: "hasInterpretationType",
        node: FieldNode::Classified {
            class: "InterpretationType",
            id_prefix: "geko:int-type/",
        },
    },
    FieldDef {
        id: INTERPRETATION_CRITERION,
        label: "Interpretation Criterion",
        allowed: &[],
        term: "hasInterpretationCriterion",
        node: FieldNode::Classified {
            class: "InterpretationCriterion",
            id_prefix: "geko:int-crit/",
        },
    },
    FieldDef {
        id: ANCHOR,
        label: "Anchor",
        allowed: &[],
        term: "hasAnchor",
        node: FieldNode::Classified {
            class: "Anchor",
            id_prefix: "geko:anchor/",
        },
    },
    FieldDef {
        id: ENTITY,
        label: "Entity",
        allowed: &[],
        term: "isAnchoredTo",
        node: FieldNode::Reference {
            class: "Entity",
            id_prefix: "geko:entity/",
        },
    },
    FieldDef {
        id: CONCEPTUAL_LEVEL,
        label: "Conceptual Level",
        allowed: &[
            "PreiconographicalSubject",
            "IconographicalSubject",
            "IconologicalSubject",
        ],
        term: "hasConceptualLevel",
        node: FieldNode::Vocabulary {
            id_prefix: "geko:conc-lvl/",
        },
    },
    FieldDef {
        id: CREATOR,
        label: "Creator",
        allowed: &[],
        term: "creator",
        node: FieldNode::Classified {
            class: "Person",
            id_prefix: "geko:creator/",
        },
    },
];

/// The ekphrasis annotation schema
pub static GEKO_SCHEMA: FieldSchema = FieldSchema::new(&GEKO_FIELD_DEFS);

/// Turn a free-text value into an IRI path segment
///
/// Trims, lowercases, collapses whitespace runs into `-`, then
/// percent-encodes anything not allowed in a path segment.
pub fn slug(value: &str) -> String {
    let joined = value
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    urlencoding::encode(&joined).into_owned()
}
