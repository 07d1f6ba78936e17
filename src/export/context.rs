//! The fixed JSON-LD context of exported collections
//!
//! Changing any mapping here changes the exported format; bump
//! `CONTEXT_VERSION` when doing so. Collections carry the version as
//! `versionInfo`.

use serde_json::{json, Value};

/// Version of the prefix table below
pub const CONTEXT_VERSION: &str = "1.0";

/// The W3C Web Annotation context
pub const ANNO_CONTEXT_URI: &str = "http://www.w3.org/ns/anno.jsonld";

/// Ontology prefixes and terms used by the ekphrasis vocabulary
pub const PREFIXES: &[(&str, &str)] = &[
    ("mlao", "http://www.w3id.org/mlao/"),
    ("oa", "https://www.w3.org/TR/annotation-vocab/#"),
    ("crm", "http://erlangen-crm.org/current/"),
    ("lrmoo", "http://iflastandards.info/ns/lrm/lrmoo/"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("hico", "http://purl.org/emmedi/hico/"),
    ("prov", "http://www.w3.org/ns/prov#"),
    (
        "dct",
        "https://www.dublincore.org/specifications/dublin-core/dcmi-terms/",
    ),
    ("foaf", "http://xmlns.com/foaf/spec/"),
    ("geko", "http://www.w3id.org/geko/"),
    ("icon", "https://w3id.org/icon/ontology/"),
    ("IconographicalSubject", "icon:IconographicalSubject"),
    ("PreiconographicalSubject", "icon:PreiconographicalSubject"),
    ("IconologicalSubject", "icon:IconologicalSubject"),
    ("Entity", "crm:E1_Entity"),
    ("Mimetic", "geko:Mimetic"),
    ("Notional", "geko:Notional"),
    ("Dynamization", "geko:Dynamization"),
    ("Denotation", "geko:Denotation"),
    ("Integration", "geko:Integration"),
    ("Ekphrasis", "geko:Ekphrasis"),
    ("hasEkphrasticModality", "geko:hasEkphrasticModality"),
    ("hasTextualReferent", "geko:hasTextualReferent"),
    ("hasIconicReferent", "geko:hasIconicReferent"),
    ("hasForm", "geko:hasForm"),
    ("wasGeneratedBy", "prov:wasGeneratedBy"),
    ("hasConceptualLevel", "mlao:hasConceptualLevel"),
    ("hasInterpretationCriterion", "hico:hasInterpretationCriterion"),
    ("hasInterpretationType", "hico:hasInterpretationType"),
    ("InterpretationType", "hico:InterpretationType"),
    ("InterpretationAct", "hico:InterpretationAct"),
    ("InterpretationCriterion", "hico:InterpretationCriterion"),
    ("hasAnchor", "mlao:hasAnchor"),
    ("isAnchoredTo", "mlao:isAnchoredTo"),
    ("Anchor", "mlao:Anchor"),
    ("Person", "foaf:Person"),
    ("name", "foaf:name"),
    ("versionInfo", "http://www.w3.org/2002/07/owl#versionInfo"),
    ("Work", "http://iflastandards.info/ns/lrm/lrmoo/F1_Work"),
    ("Expression", "http://iflastandards.info/ns/lrm/lrmoo/F2_Expression"),
    (
        "Manifestation",
        "http://iflastandards.info/ns/lrm/lrmoo/F3_Manifestation",
    ),
    ("Item", "http://iflastandards.info/ns/lrm/lrmoo/F5_Item"),
];

/// `@context` value of exported collections
pub fn export_context() -> Value {
    let table: serde_json::Map<String, Value> = PREFIXES
        .iter()
        .map(|(term, iri)| (term.to_string(), Value::String(iri.to_string())))
        .collect();
    json!([ANNO_CONTEXT_URI, table])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_shape() {
        let context = export_context();
        let items = context.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ANNO_CONTEXT_URI);
        assert_eq!(items[1]["geko"], "http://www.w3id.org/geko/");
        assert_eq!(items[1].as_object().unwrap().len(), PREFIXES.len());
    }

    #[test]
    fn test_every_schema_term_is_mapped() {
        for field in crate::schema::GEKO_SCHEMA.iter() {
            // creator comes from the Web Annotation context
            if field.term == "creator" {
                continue;
            }
            assert!(
                PREFIXES.iter().any(|(term, _)| *term == field.term),
                "unmapped term {}",
                field.term
            );
        }
    }
}
