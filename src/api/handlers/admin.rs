use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub cached_records: u64,
    pub public_url: String,
    pub status: String,
    pub version: String,
}

pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<HealthResponse>>, ApiError> {
    let cached_records = state
        .db
        .count()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(HealthResponse {
        cached_records,
        public_url: state.config.server.public_url.clone(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
