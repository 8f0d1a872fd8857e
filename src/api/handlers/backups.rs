use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::clients::ClientRequest;
use super::fetch_roster;
use crate::api::response::{ApiError, AppJson, AppPath, SuccessResponse};
use crate::models::BackupKind;
use crate::resolver::{resolve, ClientRef};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteBackupRequest {
    pub client: ClientRef,
    pub backup_id: i64,
}

pub async fn start_full_backup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    start_backup(&state, &req.client, BackupKind::FullFile).await
}

pub async fn start_image_backup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    start_backup(&state, &req.client, BackupKind::FullImage).await
}

pub async fn start_incremental_backup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    start_backup(&state, &req.client, BackupKind::IncrementalFile).await
}

async fn start_backup(
    state: &AppState,
    identifier: &ClientRef,
    kind: BackupKind,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %identifier, kind = %kind, "Starting backup");

    let roster = fetch_roster(state).await?;
    let client = resolve(identifier, &roster)?;
    let ok = state.upstream.start_backup(client.id, kind).await?;
    Ok(SuccessResponse::json(ok))
}

pub async fn list_backups(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Listing backups");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let backups = state.upstream.client_backups(client.id).await?;
    Ok(Json(backups))
}

pub async fn delete_backup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DeleteBackupRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.client, backup_id = req.backup_id, "Deleting backup");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&req.client, &roster)?;
    let ok = state
        .upstream
        .delete_backup(client.id, req.backup_id)
        .await?;
    Ok(SuccessResponse::json(ok))
}
