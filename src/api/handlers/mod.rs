mod backups;
mod clients;
mod server;

use crate::api::response::ApiError;
use crate::models::ClientRecord;
use crate::normalize::roster_from_status;
use crate::AppState;

pub use backups::{
    delete_backup, list_backups, start_full_backup, start_image_backup, start_incremental_backup,
};
pub use clients::{
    change_client_setting, create_client, delete_client, get_client, get_client_authkey,
    get_client_logs, get_client_quota, get_client_settings, get_client_used_space, rename_client,
    set_client_quota,
};
pub use server::{debug_info, get_status, health, list_clients};

/// Fetch the roster snapshot a request resolves its identifiers against.
///
/// Called once per request; the snapshot is never reused across requests.
async fn fetch_roster(state: &AppState) -> Result<Vec<ClientRecord>, ApiError> {
    let status = state.upstream.status().await?;
    Ok(roster_from_status(&status)?)
}
