use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Yomichan custom audio source
        .route("/", get(handlers::query_audio))
        // Downloaded audio
        .route("/forvo/*path", get(handlers::serve_audio))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
