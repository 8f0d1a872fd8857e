//! Shared test helpers for handler tests.

use std::sync::Arc;

use crate::config::{Config, ServerConfig, UpstreamBackend, UpstreamConfig};
use crate::upstream::{MemoryServer, UrBackupServer};
use crate::AppState;

fn test_config(upstream: UpstreamConfig) -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        upstream,
        debug_route: true,
    }
}

/// Create a test AppState over a memory upstream seeded with
/// `alice` (1), `bob` (2) and a client literally named `42` (3).
pub async fn test_state() -> (Arc<AppState>, Arc<MemoryServer>) {
    let server = Arc::new(MemoryServer::new());
    for name in ["alice", "bob", "42"] {
        server.seed_client(name).await;
    }

    let config = test_config(UpstreamConfig {
        backend: UpstreamBackend::Memory,
        ..Default::default()
    });

    let state = Arc::new(AppState {
        config,
        upstream: Arc::clone(&server) as Arc<dyn crate::upstream::BackupServer>,
    });
    (state, server)
}

/// Create a test AppState whose UrBackup upstream refuses connections.
pub fn unreachable_state() -> Arc<AppState> {
    let upstream = UpstreamConfig {
        url: "http://127.0.0.1:1/x".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let server = UrBackupServer::new(&upstream).expect("Failed to build upstream client");

    Arc::new(AppState {
        config: test_config(upstream),
        upstream: Arc::new(server),
    })
}
