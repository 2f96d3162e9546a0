use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        api_prefix: api.prefix.clone(),
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.backend().ping().await {
        Ok(()) => {
            components.insert("backend".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("backend".to_string(), format!("unhealthy: {err}"));
            status = "degraded".to_string();
        }
    }

    let seeds = if state.seeds().is_empty() { "none" } else { "loaded" };
    components.insert("seed_accounts".to_string(), seeds.to_string());

    Json(HealthResponse { service: "reportcard-gateway".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
