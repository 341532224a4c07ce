//! API routes

pub mod analysis;

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub service_url: String,
    pub timeout_ms: u64,
}

/// Where analyses are sent, for the front-end's about panel
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        service_url: state.config.service.base_url.clone(),
        timeout_ms: state.config.service.timeout_ms,
    })
}
