//! JSON-LD export
//!
//! Turns final annotations into Web-Annotation-shaped JSON-LD documents and
//! wraps them in a collection carrying the fixed ekphrasis `@context`.

mod context;
mod document;

pub use context::{export_context, ANNO_CONTEXT_URI, CONTEXT_VERSION, PREFIXES};
pub use document::{
    AnchorNode, AnnotationDocument, BodyDocument, CollectionDocument, CollectionMeta,
    ExportReport, FieldValueNode, InterpretationAct, NodeRef, PersonNode, Serializer,
    DOWNLOAD_CONTENT_TYPE, DOWNLOAD_FILE_NAME,
};
