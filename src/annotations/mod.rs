//! Annotation module
//!
//! Draft and final annotations following the W3C Web Annotation model,
//! and the store that drives their lifecycle.
//!
//! # Lifecycle
//!
//! - `create` a draft from a resolved selection
//! - `set_field` on drafts and finals
//! - `finalize` a draft into a final record with a stable IRI
//! - `edit` / `update` a final in place
//! - `remove` either

mod store;
mod types;

pub use store::{AnnotationStore, EditContext, FormState, StoreError, StoreSettings};
pub use types::{
    Annotation, AnnotationBody, AnnotationId, AnnotationKind, AnnotationTarget, BodyType,
    DraftAnnotation, FinalAnnotation, Motivation, Provenance, Selector, TempId,
};
