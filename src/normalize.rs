//! Projections and computed fields derived from raw upstream records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::ClientRecord;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Status document has no client list")]
    MissingClientList,
    #[error("Malformed client record: {0}")]
    MalformedClient(#[from] serde_json::Error),
    #[error("Quota value '{0}' is not an integer")]
    InvalidQuota(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub name: String,
    pub id: i64,
}

impl From<&ClientRecord> for ClientSummary {
    fn from(client: &ClientRecord) -> Self {
        ClientSummary {
            name: client.name.clone(),
            id: client.id,
        }
    }
}

/// Extract the client roster from a status document.
///
/// Accepts a bare array, or an object carrying the array under `clients`
/// or `status` (the key UrBackup itself uses).
pub fn roster_from_status(status: &Value) -> Result<Vec<ClientRecord>, NormalizeError> {
    let list = match status {
        Value::Array(_) => status,
        Value::Object(map) => map
            .get("clients")
            .or_else(|| map.get("status"))
            .filter(|v| v.is_array())
            .ok_or(NormalizeError::MissingClientList)?,
        _ => return Err(NormalizeError::MissingClientList),
    };
    Ok(Vec::<ClientRecord>::deserialize(list)?)
}

/// Total bytes across backups. Records without a usable `total_bytes` count
/// as zero; the sum saturates at `u64::MAX`.
pub fn used_bytes(backups: &[Value]) -> u64 {
    backups
        .iter()
        .filter_map(|b| b.get("total_bytes"))
        .filter_map(byte_count)
        .fold(0, u64::saturating_add)
}

fn byte_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
        .map(|f| f as u64)
}

/// Configured quota in bytes, or `None` when no quota is set.
///
/// Absent key, null and an empty string all mean unset; `"0"` is a real
/// zero quota.
pub fn quota_bytes(settings: &Value) -> Result<Option<i64>, NormalizeError> {
    let raw = match settings.get("quota") {
        Some(Value::Object(setting)) => setting.get("value"),
        other => other,
    };

    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| NormalizeError::InvalidQuota(s.clone())),
        Some(Value::Number(n)) => integral(n)
            .map(Some)
            .ok_or_else(|| NormalizeError::InvalidQuota(n.to_string())),
        Some(other) => Err(NormalizeError::InvalidQuota(other.to_string())),
    }
}

fn integral(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Read a setting that may be a bare scalar or a `{"value": ...}` object.
pub fn setting_value<'a>(settings: &'a Value, key: &str) -> Option<&'a Value> {
    match settings.get(key)? {
        Value::Object(setting) => setting.get("value"),
        scalar => Some(scalar),
    }
}
