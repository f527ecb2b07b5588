//! HTTP API handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::protocol::DeviceStatus;
use crate::relay::RelayStats;
use crate::transport::ClientInfo;
use crate::web::server::AppState;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Detailed server status
#[derive(Serialize)]
pub struct ServerStatus {
    #[serde(flatten)]
    pub relay: RelayStats,
    pub client_count: usize,
    pub clients: Vec<ClientInfo>,
    pub events_sent: u64,
    pub events_dropped: u64,
}

/// `{mobile_connected, pc_connected}`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DeviceStatus> {
    Json(state.relay.registry.get_status())
}

/// Get detailed relay statistics
pub async fn get_server_status(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ServerStatus>> {
    let status = ServerStatus {
        relay: state.relay.stats(),
        client_count: state.hub.client_count(),
        clients: state.hub.clients(),
        events_sent: state.hub.sent_count(),
        events_dropped: state.hub.dropped_count(),
    };

    Json(ApiResponse::ok(status))
}

pub async fn health() -> &'static str {
    "ok"
}
