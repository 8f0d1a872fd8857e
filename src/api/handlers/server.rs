use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::fetch_roster;
use crate::api::response::ApiError;
use crate::config::UpstreamBackend;
use crate::normalize::{roster_from_status, ClientSummary};
use crate::AppState;

const DEBUG_CLIENT_LIMIT: usize = 10;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub arch: String,
    pub generated_at: String,
    pub os: String,
    pub upstream_clients: Value,
    pub upstream_config: UpstreamSummary,
    pub upstream_status: Value,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct UpstreamSummary {
    pub backend: String,
    pub password: String,
    pub url: String,
    pub username: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    tracing::info!("Fetching server status");
    let status = state.upstream.status().await?;
    Ok(Json(status))
}

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ClientSummary>>, ApiError> {
    tracing::info!("Listing clients");
    let roster = fetch_roster(&state).await?;
    Ok(Json(roster.iter().map(ClientSummary::from).collect()))
}

/// Runtime and upstream diagnostics. Upstream failures are reported inline.
pub async fn debug_info(State(state): State<Arc<AppState>>) -> Json<DebugResponse> {
    tracing::info!("Gathering debug information");
    let upstream = &state.config.upstream;

    let (upstream_status, upstream_clients) = match state.upstream.status().await {
        Ok(status) => {
            let clients = match roster_from_status(&status) {
                Ok(roster) => serde_json::to_value(
                    roster.into_iter().take(DEBUG_CLIENT_LIMIT).collect::<Vec<_>>(),
                )
                .unwrap_or_else(|e| Value::String(format!("Error: {e}"))),
                Err(e) => Value::String(format!("Error: {e}")),
            };
            (status, clients)
        }
        Err(e) => {
            tracing::error!(error = %e, "Error retrieving backup server status");
            let message = Value::String(format!("Error: {e}"));
            (message.clone(), message)
        }
    };

    Json(DebugResponse {
        arch: std::env::consts::ARCH.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        os: std::env::consts::OS.to_string(),
        upstream_clients,
        upstream_config: UpstreamSummary {
            backend: match upstream.backend {
                UpstreamBackend::Memory => "memory".to_string(),
                UpstreamBackend::UrBackup => "urbackup".to_string(),
            },
            password: "***".to_string(),
            url: upstream.url.clone(),
            username: upstream.username.clone(),
        },
        upstream_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
