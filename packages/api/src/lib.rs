//! HTTP surface of the WasteSense service
//!
//! - `POST /predict` classifies an uploaded image
//! - `GET /health` reports the loaded deployment

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wastesense::InferenceContext;

mod routes;

pub mod error;
pub mod payload;
pub mod state;

pub use axum;
pub use state::{AppState, State};

/// Default request body limit in bytes
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn construct_router(context: InferenceContext, max_upload_bytes: usize) -> Router {
    let state: AppState = Arc::new(State::new(context));

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::predict::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
