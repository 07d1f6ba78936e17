//! In-memory annotation store
//!
//! Holds drafts and finals in render order and drives the
//! `Draft -> Final`, `Final -> Final` (update) and removal transitions.
//! At most one edit context (the open popup) exists at a time.
//!
//! The store is single-owner and mutated through `&mut self` only; events
//! are processed one at a time, so no locking is involved.

use chrono::Utc;
use std::collections::BTreeMap;

use super::types::{
    Annotation, AnnotationBody, AnnotationId, AnnotationKind, AnnotationTarget, BodyType,
    DraftAnnotation, FinalAnnotation, Motivation, Provenance, TempId,
};
use crate::schema::FieldSchema;
use crate::selection::{PopupAnchor, SelectionTuple};

/// Errors raised by store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Annotation not found: {0}")]
    NotFound(String),
}

/// Values stamped on every finalized annotation
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// IRI of the annotated text
    pub source: String,
    /// Prefix of minted annotation IRIs
    pub id_base: String,
    pub motivation: Motivation,
    /// Body format
    pub format: String,
    pub language: Option<String>,
    /// Creator used when the creator field is left empty
    pub default_creator: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            source: "https://example.org/texts/main".to_string(),
            id_base: "https://example.org/annotations/".to_string(),
            motivation: Motivation::Commenting,
            format: "text/plain".to_string(),
            language: Some("en".to_string()),
            default_creator: None,
        }
    }
}

/// Form state of the open popup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    /// Field values as shown in the form
    pub fields: BTreeMap<String, String>,
    /// Free-text note typed so far
    pub body: String,
}

/// The single open edit context
#[derive(Debug, Clone, PartialEq)]
pub struct EditContext {
    pub target: AnnotationId,
    pub form: FormState,
    pub anchor: Option<PopupAnchor>,
}

type ChangeListener = Box<dyn FnMut(&[FinalAnnotation])>;

/// Ordered collection of drafts and finals
pub struct AnnotationStore {
    schema: &'static FieldSchema,
    settings: StoreSettings,
    entries: Vec<Annotation>,
    edit: Option<EditContext>,
    next_temp: u64,
    listeners: Vec<ChangeListener>,
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("entries", &self.entries)
            .field("edit", &self.edit)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AnnotationStore {
    pub fn new(schema: &'static FieldSchema, settings: StoreSettings) -> Self {
        Self {
            schema,
            settings,
            entries: Vec::new(),
            edit: None,
            next_temp: 1,
            listeners: Vec::new(),
        }
    }

    /// Rehydrate a store from persisted finals, keeping their order
    pub fn with_finals(
        schema: &'static FieldSchema,
        settings: StoreSettings,
        finals: Vec<FinalAnnotation>,
    ) -> Self {
        let mut store = Self::new(schema, settings);
        store.entries = finals.into_iter().map(Annotation::Final).collect();
        store
    }

    pub fn schema(&self) -> &'static FieldSchema {
        self.schema
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Register a listener called with the finals after every change
    pub fn on_change(&mut self, listener: impl FnMut(&[FinalAnnotation]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Every entry, drafts included, in render order
    pub fn entries(&self) -> &[Annotation] {
        &self.entries
    }

    /// Finalized annotations in render order
    pub fn finals(&self) -> Vec<FinalAnnotation> {
        self.entries
            .iter()
            .filter_map(Annotation::as_final)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.entries.iter().find(|a| &a.id() == id)
    }

    pub fn edit_context(&self) -> Option<&EditContext> {
        self.edit.as_ref()
    }

    /// Annotations of a block as `(id, start, end)` in registration order
    pub fn spans_in_block(&self, block_index: usize) -> Vec<(AnnotationId, usize, usize)> {
        self.entries
            .iter()
            .filter(|a| a.block_index() == block_index)
            .map(|a| {
                let (start, end) = a.range();
                (a.id(), start, end)
            })
            .collect()
    }

    /// Start a draft for a resolved selection and open its edit context
    ///
    /// Any previously open context is replaced; its uncommitted input is
    /// dropped, values already applied with `set_field` stay on their target.
    pub fn create(&mut self, selection: SelectionTuple) -> TempId {
        debug_assert!(selection.start_offset < selection.end_offset);

        let temp_id = TempId::new(self.next_temp);
        self.next_temp += 1;

        let draft = DraftAnnotation::new(temp_id, selection, self.schema);
        let form = FormState {
            fields: draft.fields.clone(),
            body: String::new(),
        };
        self.entries.push(Annotation::Draft(draft));
        self.open(AnnotationId::Draft(temp_id), form);

        tracing::debug!(%temp_id, "Created draft annotation");
        temp_id
    }

    /// Record where the popup of the open context is shown
    pub fn set_anchor(&mut self, anchor: PopupAnchor) {
        if let Some(edit) = self.edit.as_mut() {
            edit.anchor = Some(anchor);
        }
    }

    /// Uncommitted note input of the open context
    pub fn set_body_input(&mut self, text: &str) {
        if let Some(edit) = self.edit.as_mut() {
            edit.form.body = text.to_string();
        }
    }

    /// Set a schema field on a draft or final
    pub fn set_field(
        &mut self,
        target: &AnnotationId,
        field_id: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let field = self
            .schema
            .get(field_id)
            .ok_or_else(|| StoreError::UnknownField(field_id.to_string()))?;
        if !field.offers(value) {
            tracing::warn!(field = field_id, value, "Value is not one the form offers");
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|a| &a.id() == target)
            .ok_or_else(|| StoreError::NotFound(target.to_string()))?;

        entry
            .fields_mut()
            .insert(field_id.to_string(), value.to_string());

        if let Some(edit) = self.edit.as_mut().filter(|e| &e.target == target) {
            edit.form
                .fields
                .insert(field_id.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Promote a draft to a final annotation in place
    pub fn finalize(
        &mut self,
        temp_id: TempId,
        body_text: &str,
    ) -> Result<FinalAnnotation, StoreError> {
        let annotation = self.prepare_final(temp_id, body_text)?;
        self.commit_final(temp_id, annotation.clone())?;
        Ok(annotation)
    }

    /// The final a draft would become, leaving the store untouched
    pub fn prepare_final(
        &self,
        temp_id: TempId,
        body_text: &str,
    ) -> Result<FinalAnnotation, StoreError> {
        let draft = self
            .entries
            .iter()
            .find_map(|a| match a {
                Annotation::Draft(d) if d.temp_id == temp_id => Some(d),
                _ => None,
            })
            .ok_or_else(|| StoreError::NotFound(temp_id.to_string()))?;

        let fields = self.schema.complete(&draft.fields);
        let settings = &self.settings;
        let annotation = FinalAnnotation {
            id: format!("{}{}", settings.id_base, uuid::Uuid::new_v4()),
            kind: AnnotationKind::Annotation,
            motivation: settings.motivation,
            provenance: Provenance::stamp(&fields, settings.default_creator.as_deref()),
            body: AnnotationBody {
                body_type: BodyType::TextualBody,
                value: body_text.to_string(),
                format: settings.format.clone(),
                language: settings.language.clone(),
                fields,
            },
            target: AnnotationTarget::text_quote(&settings.source, &draft.selected_text),
            modified: None,
            block_index: draft.block_index,
            start_offset: draft.start_offset,
            end_offset: draft.end_offset,
            selected_text: draft.selected_text.clone(),
        };
        Ok(annotation)
    }

    /// Replace a draft with the final prepared for it
    pub fn commit_final(
        &mut self,
        temp_id: TempId,
        annotation: FinalAnnotation,
    ) -> Result<(), StoreError> {
        let position = self
            .entries
            .iter()
            .position(|a| matches!(a, Annotation::Draft(d) if d.temp_id == temp_id))
            .ok_or_else(|| StoreError::NotFound(temp_id.to_string()))?;

        tracing::debug!(%temp_id, id = %annotation.id, "Finalized annotation");
        self.entries[position] = Annotation::Final(annotation);
        self.close_if(&AnnotationId::Draft(temp_id));

        self.notify();
        Ok(())
    }

    /// Reopen the edit context of a final annotation
    pub fn edit(&mut self, id: &str) -> Result<&EditContext, StoreError> {
        let annotation = self
            .entries
            .iter()
            .find_map(|a| a.as_final().filter(|f| f.id == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let form = FormState {
            fields: self.schema.complete(&annotation.body.fields),
            body: annotation.body.value.clone(),
        };
        self.open(AnnotationId::final_id(id), form);

        self.edit
            .as_ref()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Commit an edited final annotation in place
    pub fn update(&mut self, id: &str, body_text: &str) -> Result<FinalAnnotation, StoreError> {
        let updated = self.prepare_update(id, body_text)?;
        self.commit_update(updated.clone())?;
        Ok(updated)
    }

    /// The final as `update` would leave it, leaving the store untouched
    pub fn prepare_update(&self, id: &str, body_text: &str) -> Result<FinalAnnotation, StoreError> {
        let mut annotation = self
            .entries
            .iter()
            .find_map(|a| a.as_final().filter(|f| f.id == id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        annotation.body.value = body_text.to_string();
        annotation.provenance.refresh(
            &annotation.body.fields,
            self.settings.default_creator.as_deref(),
        );
        annotation.modified = Some(Utc::now());
        Ok(annotation)
    }

    /// Replace a final with its prepared update
    pub fn commit_update(&mut self, annotation: FinalAnnotation) -> Result<(), StoreError> {
        let id = annotation.id.clone();
        let entry = self
            .entries
            .iter_mut()
            .find(|a| matches!(a, Annotation::Final(f) if f.id == id))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        *entry = Annotation::Final(annotation);

        self.close_if(&AnnotationId::final_id(&id));
        tracing::debug!(%id, "Updated annotation");

        self.notify();
        Ok(())
    }

    /// Remove a draft or final; unknown ids are ignored
    pub fn remove(&mut self, target: &AnnotationId) {
        let before = self.entries.len();
        self.entries.retain(|a| &a.id() != target);
        self.close_if(target);

        if self.entries.len() != before {
            tracing::debug!(%target, "Removed annotation");
        }
        self.notify();
    }

    /// Close the popup without committing anything
    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    fn open(&mut self, target: AnnotationId, form: FormState) {
        if let Some(previous) = self.edit.take() {
            tracing::debug!(target = %previous.target, "Discarding open edit context");
        }
        self.edit = Some(EditContext {
            target,
            form,
            anchor: None,
        });
    }

    fn close_if(&mut self, target: &AnnotationId) {
        if self.edit.as_ref().is_some_and(|e| &e.target == target) {
            self.edit = None;
        }
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let finals = self.finals();
        for listener in &mut self.listeners {
            listener(&finals);
        }
    }
}
