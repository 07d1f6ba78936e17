//! Annotation session over one resource
//!
//! Ties the selection tracker, the in-memory store and a storage adapter
//! together: selections become drafts, finalized drafts are persisted, and
//! blocks are re-rendered (and their nodes re-registered) after every change
//! that affects their highlights.

use std::sync::Arc;

use crate::annotations::{
    AnnotationId, AnnotationStore, EditContext, FinalAnnotation, StoreError, StoreSettings, TempId,
};
use crate::html::{layout_block, render_block, BlockLayout, HighlightConfig, HighlightSpan};
use crate::schema::FieldSchema;
use crate::selection::{LiveSelection, SelectionError, SelectionTracker, TextBlock};
use crate::storage::{StorageAdapter, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct Annotator {
    tracker: SelectionTracker,
    store: AnnotationStore,
    adapter: Arc<dyn StorageAdapter>,
    highlight: HighlightConfig,
}

impl Annotator {
    /// Start a session, loading the finals already stored for the resource
    pub async fn open(
        blocks: Vec<TextBlock>,
        schema: &'static FieldSchema,
        settings: StoreSettings,
        adapter: Arc<dyn StorageAdapter>,
    ) -> Result<Self, AnnotatorError> {
        let finals = adapter
            .all()
            .await?
            .map(|record| record.items)
            .unwrap_or_default();

        tracing::debug!(
            resource = %adapter.resource_id(),
            annotations = finals.len(),
            "Opened annotation session"
        );

        let mut annotator = Self {
            tracker: SelectionTracker::new(blocks),
            store: AnnotationStore::with_finals(schema, settings, finals),
            adapter,
            highlight: HighlightConfig::default(),
        };
        annotator.render();
        Ok(annotator)
    }

    pub fn with_highlight_config(mut self, highlight: HighlightConfig) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.adapter
    }

    /// Turn the live selection into a draft and open its popup
    pub fn select(&mut self, selection: &mut LiveSelection) -> Result<TempId, AnnotatorError> {
        let resolved = self.tracker.resolve(selection)?;
        let block_index = resolved.tuple.block_index;

        let temp_id = self.store.create(resolved.tuple);
        self.store.set_anchor(resolved.anchor);
        self.relayout(block_index);
        Ok(temp_id)
    }

    pub fn set_field(
        &mut self,
        target: &AnnotationId,
        field_id: &str,
        value: &str,
    ) -> Result<(), AnnotatorError> {
        Ok(self.store.set_field(target, field_id, value)?)
    }

    /// Finalize a draft and persist it
    ///
    /// The draft is promoted only once storage accepted the final; on a
    /// storage error it stays open as a draft.
    pub async fn finalize(
        &mut self,
        temp_id: TempId,
        body_text: &str,
    ) -> Result<FinalAnnotation, AnnotatorError> {
        let annotation = self.store.prepare_final(temp_id, body_text)?;
        self.adapter.create(annotation.clone()).await?;

        self.store.commit_final(temp_id, annotation.clone())?;
        self.relayout(annotation.block_index);
        Ok(annotation)
    }

    pub fn edit(&mut self, id: &str) -> Result<&EditContext, AnnotatorError> {
        Ok(self.store.edit(id)?)
    }

    /// Commit an edit and write it through
    pub async fn update(
        &mut self,
        id: &str,
        body_text: &str,
    ) -> Result<FinalAnnotation, AnnotatorError> {
        let annotation = self.store.prepare_update(id, body_text)?;
        if self.adapter.update(annotation.clone()).await?.is_none() {
            tracing::warn!(id, resource = %self.adapter.resource_id(), "Updated annotation is not stored");
        }
        self.store.commit_update(annotation.clone())?;
        Ok(annotation)
    }

    /// Remove a draft or final; finals are deleted from storage first
    pub async fn remove(&mut self, target: &AnnotationId) -> Result<(), AnnotatorError> {
        if let AnnotationId::Final(id) = target {
            self.adapter.delete(id).await?;
        }

        let block_index = self.store.get(target).map(|a| a.block_index());
        self.store.remove(target);
        if let Some(block_index) = block_index {
            self.relayout(block_index);
        }
        Ok(())
    }

    /// Render every block, re-registering its nodes
    pub fn render(&mut self) -> Vec<String> {
        let layouts: Vec<BlockLayout> = (0..self.tracker.blocks().len())
            .filter_map(|block_index| self.relayout(block_index))
            .collect();
        layouts
            .iter()
            .map(|layout| render_block(layout, &self.highlight))
            .collect()
    }

    /// Annotation whose highlight covers the character at `offset`
    ///
    /// Overlapping annotations that were not rendered are never hit.
    pub fn annotation_at(&self, block_index: usize, offset: usize) -> Option<AnnotationId> {
        self.layout(block_index)?.annotation_at(offset).cloned()
    }

    /// Lay out one block against the current annotations
    pub fn relayout(&mut self, block_index: usize) -> Option<BlockLayout> {
        let layout = self.layout(block_index)?;
        self.tracker.apply_layout(&layout);
        Some(layout)
    }

    fn layout(&self, block_index: usize) -> Option<BlockLayout> {
        let text = &self.tracker.block(block_index)?.text;
        let spans: Vec<HighlightSpan> = self
            .store
            .spans_in_block(block_index)
            .into_iter()
            .map(|(id, start, end)| HighlightSpan::new(id, start, end))
            .collect();

        Some(layout_block(block_index, text, &spans))
    }
}
