use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::response::panic_response;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Server
        .route("/status", get(handlers::get_status))
        .route("/clients", get(handlers::list_clients))
        // Backups
        .route("/backup/full", post(handlers::start_full_backup))
        .route("/backup/image", post(handlers::start_image_backup))
        .route("/backup/incremental", post(handlers::start_incremental_backup))
        .route("/backup/delete", post(handlers::delete_backup))
        .route("/backups/:identifier", get(handlers::list_backups))
        // Clients
        .route("/client/create", post(handlers::create_client))
        .route("/client/delete", post(handlers::delete_client))
        .route("/client/rename", post(handlers::rename_client))
        .route("/client/quota", post(handlers::set_client_quota))
        .route("/client/settings/change", post(handlers::change_client_setting))
        .route("/client/settings/:identifier", get(handlers::get_client_settings))
        .route("/client/authkey/:identifier", get(handlers::get_client_authkey))
        .route("/client/:identifier", get(handlers::get_client))
        .route("/client/:identifier/quota", get(handlers::get_client_quota))
        .route("/client/:identifier/used_space", get(handlers::get_client_used_space))
        .route("/logs/:identifier", get(handlers::get_client_logs))
        // Internal
        .route("/health", get(handlers::health));

    if state.config.debug_route {
        tracing::warn!("Debug route enabled; /debug exposes upstream diagnostics");
        router = router.route("/debug", get(handlers::debug_info));
    }

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
