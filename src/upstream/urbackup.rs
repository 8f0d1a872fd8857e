use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{BackupServer, UpstreamError};
use crate::config::UpstreamConfig;
use crate::models::BackupKind;
use crate::normalize::{roster_from_status, setting_value};

/// Client for the UrBackup server web API (`/x?a=<action>`).
///
/// The session token from the login handshake is shared by all requests. When
/// the server rejects it the token is dropped and the next call logs in again.
pub struct UrBackupServer {
    client: Client,
    url: String,
    username: String,
    password: String,
    session: RwLock<Option<String>>,
}

impl UrBackupServer {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            session: RwLock::new(None),
        })
    }

    /// POST one action without session handling.
    async fn post(&self, action: &str, params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let resp = self
            .client
            .post(&self.url)
            .query(&[("a", action)])
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Rejected {
                action: action.to_string(),
                status,
                body,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| UpstreamError::Malformed(format!("'{action}' response: {e}")))
    }

    /// POST one action with the current session attached.
    async fn call(&self, action: &str, mut params: Vec<(&str, String)>) -> Result<Value, UpstreamError> {
        let session = self.session().await?;
        params.push(("ses", session));

        let value = self.post(action, &params).await?;
        if value.get("error").and_then(Value::as_i64) == Some(1) {
            *self.session.write().await = None;
            return Err(UpstreamError::Unauthorized(format!(
                "session rejected during '{action}'"
            )));
        }
        Ok(value)
    }

    async fn session(&self) -> Result<String, UpstreamError> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(session);
        }

        let mut lock = self.session.write().await;
        if let Some(session) = lock.clone() {
            return Ok(session);
        }

        let session = self.login().await?;
        tracing::debug!(user = %self.username, "Logged in to backup server");
        *lock = Some(session.clone());
        Ok(session)
    }

    async fn login(&self) -> Result<String, UpstreamError> {
        let anonymous = self.post("login", &[]).await?;
        if truthy(anonymous.get("success")) {
            if let Some(session) = anonymous.get("session").and_then(Value::as_str) {
                return Ok(session.to_string());
            }
        }

        let salt = self
            .post("salt", &[("username", self.username.clone())])
            .await?;
        let session = salt
            .get("ses")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                UpstreamError::Unauthorized(format!("unknown user '{}'", self.username))
            })?
            .to_string();
        let salt_value = required_str(&salt, "salt")?;
        let rnd = required_str(&salt, "rnd")?;
        let rounds = salt
            .get("pbkdf2_rounds")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0);

        let password = password_hash(salt_value, rnd, &self.password, rounds as u32);
        let login = self
            .post(
                "login",
                &[
                    ("username", self.username.clone()),
                    ("password", password),
                    ("ses", session.clone()),
                ],
            )
            .await?;

        if !truthy(login.get("success")) {
            return Err(UpstreamError::Unauthorized(format!(
                "login failed for user '{}'",
                self.username
            )));
        }
        Ok(session)
    }
}

#[async_trait]
impl BackupServer for UrBackupServer {
    async fn status(&self) -> Result<Value, UpstreamError> {
        self.call("status", Vec::new()).await
    }

    async fn client_settings(&self, client_id: i64) -> Result<Value, UpstreamError> {
        let resp = self
            .call(
                "settings",
                vec![
                    ("sa", "clientsettings".into()),
                    ("t_clientid", client_id.to_string()),
                ],
            )
            .await?;

        resp.get("settings")
            .filter(|s| s.is_object())
            .cloned()
            .ok_or_else(|| UpstreamError::Malformed("settings response has no 'settings' object".into()))
    }

    async fn change_client_setting(
        &self,
        client_id: i64,
        key: &str,
        value: &str,
    ) -> Result<bool, UpstreamError> {
        // The save call replaces the whole settings set, so resend the current values.
        let current = self.client_settings(client_id).await?;
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(map) = current.as_object() {
            for name in map.keys() {
                if name == key || name == "clientid" {
                    continue;
                }
                let raw = setting_value(&current, name).unwrap_or(&Value::Null);
                params.push((name.as_str(), form_value(raw)));
            }
        }
        params.push((key, value.to_string()));
        params.push(("overwrite", "true".into()));
        params.push(("sa", "clientsettings_save".into()));
        params.push(("t_clientid", client_id.to_string()));

        let resp = self.call("settings", params).await?;
        Ok(truthy(resp.get("saved_ok")))
    }

    async fn client_authkey(&self, client_id: i64) -> Result<String, UpstreamError> {
        let settings = self.client_settings(client_id).await?;
        setting_value(&settings, "internet_authkey")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Malformed("settings have no internet_authkey".into()))
    }

    async fn client_logs(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError> {
        let resp = self
            .call(
                "logs",
                vec![("filter", client_id.to_string()), ("ll", "0".into())],
            )
            .await?;

        resp.get("logs")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| UpstreamError::Malformed("logs response has no 'logs' list".into()))
    }

    async fn client_backups(&self, client_id: i64) -> Result<Vec<Value>, UpstreamError> {
        let resp = self
            .call(
                "backups",
                vec![("sa", "backups".into()), ("clientid", client_id.to_string())],
            )
            .await?;

        // File backups only; `backup_images` has its own id space.
        resp.get("backups")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| UpstreamError::Malformed("backups response has no 'backups' list".into()))
    }

    async fn delete_backup(&self, client_id: i64, backup_id: i64) -> Result<bool, UpstreamError> {
        let resp = self
            .call(
                "backups",
                vec![
                    ("sa", "backups".into()),
                    ("clientid", client_id.to_string()),
                    ("delete_now", backup_id.to_string()),
                ],
            )
            .await?;
        Ok(resp.get("err").is_none())
    }

    async fn start_backup(&self, client_id: i64, kind: BackupKind) -> Result<bool, UpstreamError> {
        let resp = self
            .call(
                "start_backup",
                vec![
                    ("start_client", client_id.to_string()),
                    ("start_type", kind.start_type().into()),
                ],
            )
            .await?;

        Ok(resp
            .get("result")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .is_some_and(|r| truthy(r.get("start_ok"))))
    }

    async fn add_client(&self, name: &str) -> Result<bool, UpstreamError> {
        let resp = self
            .call("add_client", vec![("clientname", name.to_string())])
            .await?;
        Ok(!truthy(resp.get("already_exists")))
    }

    async fn remove_client(&self, client_id: i64) -> Result<bool, UpstreamError> {
        let resp = self
            .call("status", vec![("remove_client", client_id.to_string())])
            .await?;
        let roster = roster_from_status(&resp)?;

        // A client that is gone from the roster has already been removed.
        Ok(roster
            .iter()
            .find(|c| c.id == client_id)
            .map_or(true, |c| truthy(c.attributes.get("delete_pending"))))
    }

    async fn rename_client(&self, client_id: i64, new_name: &str) -> Result<bool, UpstreamError> {
        let resp = self
            .call(
                "status",
                vec![
                    ("rename_client", client_id.to_string()),
                    ("new_name", new_name.to_string()),
                ],
            )
            .await?;
        let roster = roster_from_status(&resp)?;
        Ok(roster
            .iter()
            .any(|c| c.id == client_id && c.name == new_name))
    }
}

/// UrBackup login hash: `md5(rnd + H)` where `H` is `md5(salt + password)`,
/// optionally stretched with PBKDF2-HMAC-SHA256 keyed by the salt.
pub(crate) fn password_hash(salt: &str, rnd: &str, password: &str, pbkdf2_rounds: u32) -> String {
    let salted = Md5::digest(format!("{salt}{password}").as_bytes());
    let mut hashed = to_hex(&salted);

    if let Some(rounds) = NonZeroU32::new(pbkdf2_rounds) {
        let mut stretched = [0u8; 32];
        ring::pbkdf2::derive(
            ring::pbkdf2::PBKDF2_HMAC_SHA256,
            rounds,
            salt.as_bytes(),
            &salted,
            &mut stretched,
        );
        hashed = to_hex(&stretched);
    }

    to_hex(&Md5::digest(format!("{rnd}{hashed}").as_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn required_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, UpstreamError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| UpstreamError::Malformed(format!("login response has no '{key}'")))
}

/// UrBackup mixes booleans, 0/1 and "0"/"1" for flags.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
