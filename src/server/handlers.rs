use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::connectivity::ManualConnectivity;
use crate::error::OfflineError;
use crate::offline::OfflineContext;
use crate::status::StatusSnapshot;
use crate::store::PendingAction;
use crate::sync::SyncReport;

#[derive(Clone)]
pub struct AppState {
    pub ctx: OfflineContext,
    pub connectivity: Arc<ManualConnectivity>,
}

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct SetConnectivityRequest {
    pub online: bool,
}

/// The monitor applies the change asynchronously, so this echoes the request
#[derive(Debug, Serialize)]
pub struct SetConnectivityResponse {
    pub online: bool,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveCacheResponse {
    pub key: String,
    pub saved: bool,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct AddActionRequest {
    pub action: String,
    pub table: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct AddActionResponse {
    pub queued: bool,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
pub struct ListActionsResponse {
    pub actions: Vec<PendingAction>,
    pub total: usize,
}

// ==================== Status ====================

pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.ctx.status())
}

pub async fn set_connectivity(
    State(state): State<AppState>,
    Json(req): Json<SetConnectivityRequest>,
) -> Json<SetConnectivityResponse> {
    let changed = state.connectivity.set_reachable(req.online);
    if changed {
        tracing::info!(
            "Connectivity set to {} via API",
            if req.online { "online" } else { "offline" }
        );
    }
    Json(SetConnectivityResponse {
        online: req.online,
        changed,
    })
}

// ==================== Cache ====================

pub async fn get_cache_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, OfflineError> {
    state
        .ctx
        .get_from_local::<Value>(&key)
        .map(Json)
        .ok_or(OfflineError::NotFound(key))
}

pub async fn save_cache_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(data): Json<Value>,
) -> Result<Json<SaveCacheResponse>, OfflineError> {
    if key.starts_with('_') {
        return Err(OfflineError::BadRequest(format!(
            "Cache keys starting with '_' are reserved: {}",
            key
        )));
    }

    let saved = state.ctx.save_to_local(&key, &data);
    Ok(Json(SaveCacheResponse { key, saved }))
}

pub async fn sweep_cache(State(state): State<AppState>) -> Json<SweepResponse> {
    let removed = state.ctx.sweeper().sweep().await;
    Json(SweepResponse { removed })
}

// ==================== Pending Actions ====================

pub async fn list_pending_actions(State(state): State<AppState>) -> Json<ListActionsResponse> {
    let actions = state.ctx.pending_actions();
    let total = actions.len();
    Json(ListActionsResponse { actions, total })
}

pub async fn add_pending_action(
    State(state): State<AppState>,
    Json(req): Json<AddActionRequest>,
) -> Result<Json<AddActionResponse>, OfflineError> {
    if req.action.trim().is_empty() || req.table.trim().is_empty() {
        return Err(OfflineError::BadRequest(
            "Both 'action' and 'table' are required".to_string(),
        ));
    }

    let queued = state
        .ctx
        .add_pending_action(&req.action, &req.table, &req.data);
    Ok(Json(AddActionResponse {
        queued,
        pending: state.ctx.pending_actions_count(),
    }))
}

// ==================== Sync ====================

pub async fn trigger_sync(State(state): State<AppState>) -> Json<SyncReport> {
    Json(state.ctx.sync_pending_actions().await)
}
