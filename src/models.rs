use std::fmt;

use serde::{Deserialize, Serialize};

/// A client as listed in the upstream status document.
///
/// Only `id` and `name` are interpreted here; every other attribute is kept
/// verbatim so the record serializes back to what the upstream sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ClientRecord {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Kinds of backup the upstream can be asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    FullFile,
    FullImage,
    IncrementalFile,
}

impl BackupKind {
    /// The `start_type` value the UrBackup web API expects.
    pub fn start_type(self) -> &'static str {
        match self {
            BackupKind::FullFile => "full_file",
            BackupKind::FullImage => "full_image",
            BackupKind::IncrementalFile => "incr_file",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.start_type())
    }
}
