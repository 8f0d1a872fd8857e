//! urbackup-gateway - A REST gateway in front of the UrBackup server control API
//!
//! This crate exposes UrBackup's client and backup operations as plain JSON
//! endpoints with:
//! - Clients addressed by numeric id or by name, resolved against the live roster
//! - Computed fields (used space, quota) derived from raw upstream records
//! - A fixed error contract: 404 for unknown clients, 500 for upstream failures
//! - Swappable upstream backends (UrBackup web API, in-memory)

pub mod api;
pub mod config;
pub mod models;
pub mod normalize;
pub mod resolver;
#[cfg(test)]
pub mod testutil;
pub mod upstream;

use std::sync::Arc;

use config::Config;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub upstream: Arc<dyn upstream::BackupServer>,
}
