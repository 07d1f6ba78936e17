//! Annotation API endpoints
//!
//! CRUD over the stored annotations of one resource. Creation runs the
//! same draft-to-final lifecycle as an interactive session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::annotations::{AnnotationId, AnnotationStore, FinalAnnotation};
use crate::error::{AppError, Result};
use crate::selection::SelectionTuple;
use crate::state::AppState;
use crate::storage::{StorageAdapter, StorageRecord};

/// Create the annotations router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:resource/annotations",
            get(list_annotations).post(create_annotation),
        )
        .route(
            "/:resource/annotations/:id",
            get(get_annotation)
                .put(update_annotation)
                .delete(delete_annotation),
        )
}

/// Request body for creating annotations
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotationRequest {
    #[serde(default)]
    pub block_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub selected_text: String,
    /// Free-text note
    #[serde(default)]
    pub body: String,
    /// Schema field values keyed by field id
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Request body for updating annotations
#[derive(Debug, Deserialize)]
pub struct UpdateAnnotationRequest {
    pub body: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// All annotations of a resource; empty when nothing is stored
async fn list_annotations(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Json<StorageRecord>> {
    let record = state
        .storage()
        .adapter(&resource)
        .all()
        .await?
        .unwrap_or_else(|| StorageRecord::empty(&resource));
    Ok(Json(record))
}

async fn create_annotation(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(request): Json<CreateAnnotationRequest>,
) -> Result<(StatusCode, Json<StorageRecord>)> {
    if request.selected_text.trim().is_empty() {
        return Err(AppError::BadRequest("selectedText must not be empty".to_string()));
    }
    if request.start_offset >= request.end_offset {
        return Err(AppError::BadRequest(format!(
            "Invalid range {}..{}",
            request.start_offset, request.end_offset
        )));
    }

    let annotation = {
        let mut store = AnnotationStore::new(state.schema(), state.store_settings());
        let temp_id = store.create(SelectionTuple {
            block_index: request.block_index,
            start_offset: request.start_offset,
            end_offset: request.end_offset,
            text: request.selected_text,
        });
        for (field, value) in &request.fields {
            store.set_field(&temp_id.into(), field, value)?;
        }
        store.finalize(temp_id, &request.body)?
    };

    let record = state.storage().adapter(&resource).create(annotation).await?;
    tracing::info!(resource = %resource, items = record.items.len(), "Annotation created");

    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_annotation(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<FinalAnnotation>> {
    state
        .storage()
        .adapter(&resource)
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Annotation not found: {}", id)))
}

async fn update_annotation(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(request): Json<UpdateAnnotationRequest>,
) -> Result<Json<StorageRecord>> {
    let adapter = state.storage().adapter(&resource);
    let current = adapter
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Annotation not found: {}", id)))?;
    let body = request.body.unwrap_or_else(|| current.body.value.clone());

    let annotation = {
        let mut store =
            AnnotationStore::with_finals(state.schema(), state.store_settings(), vec![current]);
        let target = AnnotationId::final_id(&id);
        for (field, value) in &request.fields {
            store.set_field(&target, field, value)?;
        }
        store.update(&id, &body)?
    };

    adapter
        .update(annotation)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Annotation not found: {}", id)))
}

async fn delete_annotation(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<StorageRecord>> {
    let record = state.storage().adapter(&resource).delete(&id).await?;
    Ok(Json(record))
}
