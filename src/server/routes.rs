use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::*;
use crate::connectivity::ManualConnectivity;
use crate::offline::OfflineContext;

pub fn create_router(ctx: OfflineContext, connectivity: Arc<ManualConnectivity>) -> Router {
    let state = AppState { ctx, connectivity };

    Router::new()
        // Status
        .route("/_api/status", get(get_status))
        .route("/_api/connectivity", put(set_connectivity))
        // Cache routes
        .route("/_api/cache/_sweep", post(sweep_cache))
        .route(
            "/_api/cache/{key}",
            get(get_cache_entry).put(save_cache_entry),
        )
        // Pending actions
        .route(
            "/_api/actions",
            get(list_pending_actions).post(add_pending_action),
        )
        // Sync
        .route("/_api/sync", post(trigger_sync))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
