mod memory;
mod urbackup;

pub use memory::MemoryServer;
pub use urbackup::UrBackupServer;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::BackupKind;
use crate::normalize::NormalizeError;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Unable to reach backup server: {0}")]
    Unavailable(String),
    #[error("Backup server rejected the session: {0}")]
    Unauthorized(String),
    #[error("Backup server request '{action}' failed ({status}): {body}")]
    Rejected {
        action: String,
        status: u16,
        body: String,
    },
    #[error("Malformed response from backup server: {0}")]
    Malformed(String),
}

impl From<NormalizeError> for UpstreamError {
    fn from(e: NormalizeError) -> Self {
        UpstreamError::Malformed(e.to_string())
    }
}

/// The capability set of a backup server's control API.
///
/// Client-scoped calls take the numeric client id; resolving names is the
/// caller's job. Mutations report the upstream's own success indicator.
#[async_trait]
pub trait BackupServer: Send + Sync {
    /// The raw status document, including the client roster.
    async fn status(&self) -> Result<Value, UpstreamError>;
    async fn client_settings(&self, client_id: i64) -> Result<Value, UpstreamError>;
    async fn change_client_setting(
        &self,
        client_id: i64,
        key: &str,
        value: &str,
    ) -> Result<bool, UpstreamError>;
    async fn client_authkey(&self, client_id: i64) -> Result<String, UpstreamError>;
    async fn client_logs(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError>;
    async fn client_backups(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError>;
    async fn delete_backup(&self, client_id: i64, backup_id: i64) -> Result<bool, UpstreamError>;
    async fn start_backup(&self, client_id: i64, kind: BackupKind) -> Result<bool, UpstreamError>;
    async fn add_client(&self, name: &str) -> Result<bool, UpstreamError>;
    async fn remove_client(&self, client_id: i64) -> Result<bool, UpstreamError>;
    async fn rename_client(&self, client_id: i64, new_name: &str) -> Result<bool, UpstreamError>;
}
