//! Entity recognition proxy

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::ner::{locate, EntitySpan, NerMatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(recognize))
}

#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub matches: Vec<NerMatch>,
    /// Matches located in the submitted text
    pub spans: Vec<EntitySpan>,
}

async fn recognize(
    State(state): State<AppState>,
    Json(request): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let matches = state.ner().classify(&request.text).await?;
    let spans = locate(&request.text, &matches);

    Ok(Json(RecognizeResponse { matches, spans }))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::routes::test_support::{body_json, json_request, state, state_with};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn spawn_recognizer() -> String {
        let app = Router::new().route(
            "/process-ner",
            post(|Json(_): Json<Value>| async {
                Json(json!({"nerResults": [{"text": "Tiziano", "label": "ARTISTA"}]}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/process-ner", addr)
    }

    #[tokio::test]
    async fn test_recognize_locates_matches() {
        let mut config = Config::default();
        config.ner.endpoint = spawn_recognizer().await;
        let app = crate::app(state_with(config));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/ner",
                json!({"text": "Il giovane tiziano"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["matches"][0]["label"], "ARTISTA");
        assert_eq!(
            body["spans"],
            json!([{"start": 11, "end": 18, "text": "tiziano", "label": "artist"}])
        );
    }

    #[tokio::test]
    async fn test_recognize_rejects_empty_text() {
        let app = crate::app(state());

        let response = app
            .oneshot(json_request("POST", "/api/v1/ner", json!({"text": " "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
