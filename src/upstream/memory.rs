use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use super::{BackupServer, UpstreamError};
use crate::models::{BackupKind, ClientRecord};
use crate::normalize::setting_value;

/// In-process backup server for development and testing.
///
/// Behaves like a small UrBackup instance: ids are assigned sequentially,
/// names are unique, and settings use the `{"value": ...}` shape.
#[derive(Default)]
pub struct MemoryServer {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    clients: Vec<ClientRecord>,
    settings: HashMap<i64, Map<String, Value>>,
    backups: HashMap<i64, Vec<Value>>,
    logs: HashMap<i64, Vec<Value>>,
    started: Vec<(i64, BackupKind)>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client directly and return its id.
    pub async fn seed_client(&self, name: &str) -> i64 {
        let mut inner = self.inner.write().await;
        inner.insert_client(name)
    }

    /// Register a client under a fixed id.
    pub async fn seed_client_with_id(&self, id: i64, name: &str) {
        let mut inner = self.inner.write().await;
        inner.next_id = inner.next_id.max(id);
        inner.clients.push(ClientRecord::new(id, name));
        inner.settings.insert(id, default_settings(id));
    }

    pub async fn seed_backup(&self, client_id: i64, backup: Value) {
        let mut inner = self.inner.write().await;
        inner.backups.entry(client_id).or_default().push(backup);
    }

    pub async fn seed_log(&self, client_id: i64, entry: Value) {
        let mut inner = self.inner.write().await;
        inner.logs.entry(client_id).or_default().push(entry);
    }

    /// Backups started so far, in request order.
    pub async fn started_backups(&self) -> Vec<(i64, BackupKind)> {
        self.inner.read().await.started.clone()
    }
}

impl Inner {
    fn insert_client(&mut self, name: &str) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.clients.push(ClientRecord::new(id, name));
        self.settings.insert(id, default_settings(id));
        id
    }

    fn has_client(&self, client_id: i64) -> bool {
        self.clients.iter().any(|c| c.id == client_id)
    }

    fn settings(&self, client_id: i64) -> Result<&Map<String, Value>, UpstreamError> {
        self.settings
            .get(&client_id)
            .ok_or_else(|| unknown_client(client_id))
    }
}

fn default_settings(client_id: i64) -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert("clientid".into(), json!(client_id));
    settings.insert(
        "internet_authkey".into(),
        json!({ "value": format!("key-{client_id:04}") }),
    );
    settings
}

fn unknown_client(client_id: i64) -> UpstreamError {
    UpstreamError::Rejected {
        action: "settings".into(),
        status: 404,
        body: format!("no client with id {client_id}"),
    }
}

#[async_trait]
impl BackupServer for MemoryServer {
    async fn status(&self) -> Result<Value, UpstreamError> {
        let inner = self.inner.read().await;
        let clients = serde_json::to_value(&inner.clients)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        Ok(json!({ "status": clients }))
    }

    async fn client_settings(&self, client_id: i64) -> Result<Value, UpstreamError> {
        let inner = self.inner.read().await;
        Ok(Value::Object(inner.settings(client_id)?.clone()))
    }

    async fn change_client_setting(
        &self,
        client_id: i64,
        key: &str,
        value: &str,
    ) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        let Some(settings) = inner.settings.get_mut(&client_id) else {
            return Ok(false);
        };
        settings.insert(key.to_string(), json!({ "value": value }));
        Ok(true)
    }

    async fn client_authkey(&self, client_id: i64) -> Result<String, UpstreamError> {
        let inner = self.inner.read().await;
        let settings = Value::Object(inner.settings(client_id)?.clone());
        setting_value(&settings, "internet_authkey")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Malformed("settings have no internet_authkey".into()))
    }

    async fn client_logs(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError> {
        let inner = self.inner.read().await;
        Ok(inner.logs.get(&client_id).cloned().unwrap_or_default())
    }

    async fn client_backups(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError> {
        let inner = self.inner.read().await;
        Ok(inner.backups.get(&client_id).cloned().unwrap_or_default())
    }

    async fn delete_backup(&self, client_id: i64, backup_id: i64) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        let Some(backups) = inner.backups.get_mut(&client_id) else {
            return Ok(false);
        };
        let before = backups.len();
        backups.retain(|b| b.get("backup_id").and_then(Value::as_i64) != Some(backup_id));
        Ok(backups.len() < before)
    }

    async fn start_backup(&self, client_id: i64, kind: BackupKind) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        if !inner.has_client(client_id) {
            return Ok(false);
        }
        inner.started.push((client_id, kind));
        Ok(true)
    }

    async fn add_client(&self, name: &str) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        if inner.clients.iter().any(|c| c.name == name) {
            return Ok(false);
        }
        inner.insert_client(name);
        Ok(true)
    }

    async fn remove_client(&self, client_id: i64) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        let before = inner.clients.len();
        inner.clients.retain(|c| c.id != client_id);
        inner.settings.remove(&client_id);
        inner.backups.remove(&client_id);
        inner.logs.remove(&client_id);
        Ok(inner.clients.len() < before)
    }

    async fn rename_client(&self, client_id: i64, new_name: &str) -> Result<bool, UpstreamError> {
        let mut inner = self.inner.write().await;
        if inner.clients.iter().any(|c| c.name == new_name) {
            return Ok(false);
        }
        match inner.clients.iter_mut().find(|c| c.id == client_id) {
            Some(client) => {
                client.name = new_name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
