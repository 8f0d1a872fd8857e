use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::fetch_roster;
use crate::api::response::{ApiError, AppJson, AppPath, SuccessResponse};
use crate::models::ClientRecord;
use crate::normalize::{quota_bytes, used_bytes};
use crate::resolver::{resolve, ClientRef};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub client: ClientRef,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub client: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameClientRequest {
    pub old: ClientRef,
    pub new: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeSettingRequest {
    pub client: ClientRef,
    pub key: String,
    pub new_value: String,
}

#[derive(Debug, Deserialize)]
pub struct SetQuotaRequest {
    pub client: ClientRef,
    pub quota_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthKeyResponse {
    pub authkey: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuotaResponse {
    pub client: String,
    pub quota_bytes: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsedSpaceResponse {
    pub client: String,
    pub used_bytes: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<ClientRecord>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Retrieving client detail");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    Ok(Json(client.clone()))
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.client, "Creating client");
    let ok = state.upstream.add_client(&req.client).await?;
    Ok(SuccessResponse::json(ok))
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.client, "Deleting client");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&req.client, &roster)?;
    let ok = state.upstream.remove_client(client.id).await?;
    Ok(SuccessResponse::json(ok))
}

/// `new` is passed to the backup server verbatim; it is never resolved.
pub async fn rename_client(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RenameClientRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.old, new_name = %req.new, "Renaming client");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&req.old, &roster)?;
    let ok = state.upstream.rename_client(client.id, &req.new).await?;
    Ok(SuccessResponse::json(ok))
}

pub async fn get_client_settings(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<Value>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Getting client settings");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let settings = state.upstream.client_settings(client.id).await?;
    Ok(Json(settings))
}

pub async fn change_client_setting(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ChangeSettingRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.client, key = %req.key, "Changing client setting");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&req.client, &roster)?;
    let ok = state
        .upstream
        .change_client_setting(client.id, &req.key, &req.new_value)
        .await?;
    Ok(SuccessResponse::json(ok))
}

pub async fn get_client_authkey(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<AuthKeyResponse>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Getting client authkey");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let authkey = state.upstream.client_authkey(client.id).await?;
    Ok(Json(AuthKeyResponse { authkey }))
}

pub async fn get_client_logs(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Getting client logs");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let logs = state.upstream.client_logs(client.id).await?;
    Ok(Json(logs))
}

pub async fn get_client_quota(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Getting client quota");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let settings = state.upstream.client_settings(client.id).await?;
    Ok(Json(QuotaResponse {
        client: client.name.clone(),
        quota_bytes: quota_bytes(&settings)?,
    }))
}

pub async fn set_client_quota(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SetQuotaRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    tracing::info!(client = %req.client, quota_bytes = req.quota_bytes, "Setting client quota");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&req.client, &roster)?;
    let ok = state
        .upstream
        .change_client_setting(client.id, "quota", &req.quota_bytes.to_string())
        .await?;
    Ok(SuccessResponse::json(ok))
}

pub async fn get_client_used_space(
    State(state): State<Arc<AppState>>,
    AppPath(identifier): AppPath<String>,
) -> Result<Json<UsedSpaceResponse>, ApiError> {
    let identifier = ClientRef::parse(&identifier);
    tracing::info!(client = %identifier, "Calculating used space");

    let roster = fetch_roster(&state).await?;
    let client = resolve(&identifier, &roster)?;
    let backups = state.upstream.client_backups(client.id).await?;
    Ok(Json(UsedSpaceResponse {
        client: client.name.clone(),
        used_bytes: used_bytes(&backups),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_state, unreachable_state};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_client_by_name_and_id() {
        let (state, _) = test_state().await;
        let Json(by_name) = get_client(State(Arc::clone(&state)), AppPath("bob".into()))
            .await
            .unwrap();
        let Json(by_id) = get_client(State(state), AppPath(by_name.id.to_string()))
            .await
            .unwrap();
        assert_eq!(by_name, by_id);
    }

    #[tokio::test]
    async fn test_numeric_name_is_unreachable() {
        let (state, _) = test_state().await;
        let err = get_client(State(state), AppPath("42".into())).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Client '42' not found");
    }

    #[tokio::test]
    async fn test_used_space_sums_present_totals() {
        let (state, server) = test_state().await;
        server.seed_client_with_id(7, "carol").await;
        server
            .seed_backup(7, json!({"backup_id": 1, "total_bytes": 1000}))
            .await;
        server.seed_backup(7, json!({"backup_id": 2})).await;

        let Json(used) = get_client_used_space(State(state), AppPath("7".into()))
            .await
            .unwrap();
        assert_eq!(used.client, "carol");
        assert_eq!(used.used_bytes, 1000);
    }

    #[tokio::test]
    async fn test_quota_unset_then_zero() {
        let (state, _) = test_state().await;
        let Json(quota) = get_client_quota(State(Arc::clone(&state)), AppPath("alice".into()))
            .await
            .unwrap();
        assert_eq!(quota.quota_bytes, None);

        let Json(set) = set_client_quota(
            State(Arc::clone(&state)),
            AppJson(SetQuotaRequest {
                client: "alice".into(),
                quota_bytes: 0,
            }),
        )
        .await
        .unwrap();
        assert!(set.success);

        let Json(quota) = get_client_quota(State(state), AppPath("alice".into()))
            .await
            .unwrap();
        assert_eq!(quota.client, "alice");
        assert_eq!(quota.quota_bytes, Some(0));
    }

    #[tokio::test]
    async fn test_rename_uses_new_name_verbatim() {
        let (state, _) = test_state().await;
        let Json(result) = rename_client(
            State(Arc::clone(&state)),
            AppJson(RenameClientRequest {
                old: "bob".into(),
                new: "7".into(),
            }),
        )
        .await
        .unwrap();
        assert!(result.success);

        let err = get_client(State(Arc::clone(&state)), AppPath("bob".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_client_reports_upstream_indicator() {
        let (state, _) = test_state().await;
        let Json(created) = create_client(
            State(Arc::clone(&state)),
            AppJson(CreateClientRequest {
                client: "dave".into(),
            }),
        )
        .await
        .unwrap();
        assert!(created.success);

        let Json(duplicate) = create_client(
            State(state),
            AppJson(CreateClientRequest {
                client: "dave".into(),
            }),
        )
        .await
        .unwrap();
        assert!(!duplicate.success);
    }

    #[tokio::test]
    async fn test_delete_unknown_client_is_not_found() {
        let (state, _) = test_state().await;
        let err = delete_client(
            State(state),
            AppJson(ClientRequest {
                client: "ghost".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_authkey_and_settings() {
        let (state, _) = test_state().await;
        let Json(settings) = get_client_settings(State(Arc::clone(&state)), AppPath("alice".into()))
            .await
            .unwrap();
        let expected = settings["internet_authkey"]["value"].as_str().unwrap().to_string();

        let Json(key) = get_client_authkey(State(state), AppPath("alice".into()))
            .await
            .unwrap();
        assert_eq!(key.authkey, expected);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let state = unreachable_state();
        let err = get_client_used_space(State(state), AppPath("alice".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().is_empty());
    }
}
