//! GEKO Annotator
//!
//! Text annotation with ekphrasis metadata. Selections over rendered text
//! become draft annotations, drafts are finalized into Web-Annotation-shaped
//! records, and records are persisted per resource, exported as JSON-LD and
//! pushed to a triple store as N-Quads.

pub mod annotations;
pub mod config;
pub mod error;
pub mod export;
pub mod html;
pub mod ner;
pub mod rdf;
pub mod routes;
pub mod schema;
pub mod selection;
pub mod session;
pub mod state;
pub mod storage;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the HTTP application
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/health", get(routes::health::health_check))
        .nest(
            "/api/v1/resources",
            routes::annotations::router().merge(routes::export::router()),
        )
        .nest("/api/v1/ner", routes::ner::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
