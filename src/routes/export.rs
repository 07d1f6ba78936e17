//! Export endpoints
//!
//! JSON-LD download of a resource's annotation collection, and the same
//! collection converted to N-Quads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::export::{CollectionMeta, ExportReport, DOWNLOAD_CONTENT_TYPE, DOWNLOAD_FILE_NAME};
use crate::rdf::RdfFormat;
use crate::state::AppState;
use crate::storage::StorageAdapter;

/// Create the export router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:resource/export", get(export_jsonld))
        .route("/:resource/export/rdf", get(export_rdf))
}

async fn collection(state: &AppState, resource: &str) -> Result<ExportReport> {
    let items = state
        .storage()
        .adapter(resource)
        .all()
        .await?
        .map(|record| record.items)
        .unwrap_or_default();

    Ok(state
        .serializer()
        .collection_document(&items, &CollectionMeta::for_resource(resource)))
}

/// Download the collection as `annotations.jsonld`
async fn export_jsonld(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Response> {
    let report = collection(&state, &resource).await?;
    let body = report.to_download()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, DOWNLOAD_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// RDF format named by the `Accept` header; wildcards and a missing header
/// select N-Quads
fn negotiate(headers: &HeaderMap) -> Result<RdfFormat> {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return Ok(RdfFormat::default());
    };
    let accept = accept
        .to_str()
        .map_err(|_| AppError::BadRequest("Accept header is not valid text".to_string()))?;

    for media_type in accept.split(',') {
        if let Some(format) = RdfFormat::from_media_type(media_type) {
            return Ok(format);
        }
        if matches!(
            media_type.split(';').next().map(str::trim),
            Some("*/*") | Some("application/*")
        ) {
            return Ok(RdfFormat::default());
        }
    }
    Err(AppError::NotAcceptable(format!(
        "no supported RDF format in {}",
        accept
    )))
}

async fn export_rdf(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let format = negotiate(&headers)?;
    let report = collection(&state, &resource).await?;
    let document = report.to_value()?;
    let rdf = state.converter().collection_to_rdf(&document, format)?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, format.media_type())], rdf).into_response())
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{body_json, body_text, json_request, request, state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    async fn app_with_annotation() -> axum::Router {
        let app = crate::app(state());
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/resources/canvas-1/annotations",
                json!({
                    "startOffset": 10,
                    "endOffset": 17,
                    "selectedText": "giovani",
                    "body": "note",
                    "fields": {"creator": "Ada Lovelace"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        app
    }

    #[tokio::test]
    async fn test_jsonld_download() {
        let app = app_with_annotation().await;

        let response = app
            .oneshot(request("GET", "/api/v1/resources/canvas-1/export"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"annotations.jsonld\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let document = body_json(response).await;
        assert_eq!(document["@context"][0], "http://www.w3.org/ns/anno.jsonld");
        assert_eq!(document["type"], json!(["AnnotationCollection", "Ekphrasis"]));
        let item = &document["items"][0];
        assert_eq!(item["body"]["value"], "note");
        assert!(item.get("selectedText").is_none());
        assert!(item.get("startOffset").is_none());
    }

    #[tokio::test]
    async fn test_rdf_export() {
        let app = app_with_annotation().await;

        let response = app
            .oneshot(request("GET", "/api/v1/resources/canvas-1/export/rdf"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/n-quads");
        let nquads = body_text(response).await;
        assert!(nquads.contains("<http://xmlns.com/foaf/spec/name> \"Ada Lovelace\""));
    }

    #[tokio::test]
    async fn test_rdf_export_honors_accept() {
        let app = app_with_annotation().await;

        let accepted = Request::builder()
            .uri("/api/v1/resources/canvas-1/export/rdf")
            .header(header::ACCEPT, "text/html, text/x-nquads;q=0.9")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(accepted).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/n-quads");

        let rejected = Request::builder()
            .uri("/api/v1/resources/canvas-1/export/rdf")
            .header(header::ACCEPT, "text/turtle")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(rejected).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(body_json(response).await["error"], "not_acceptable");
    }

    #[tokio::test]
    async fn test_export_of_empty_resource() {
        let app = crate::app(state());

        let response = app
            .oneshot(request("GET", "/api/v1/resources/canvas-9/export"))
            .await
            .unwrap();

        let document = body_json(response).await;
        assert!(document["items"].as_array().unwrap().is_empty());
    }
}
