use super::socket;
use super::state::AppState;
use crate::session::SessionInfo;
use crate::transcode::EngineReadiness;
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub transcoder: EngineReadiness,
    pub live_connections: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Always 200; readiness is reported, not enforced
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            transcoder: state.pipeline.engine().readiness(),
            live_connections: state.live_connections(),
        }),
    )
}

/// GET /sessions
/// Snapshot of connected clients
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    let mut infos: Vec<SessionInfo> = sessions.values().map(|s| s.info()).collect();
    infos.sort_by_key(|info| info.connected_at);

    (StatusCode::OK, Json(infos))
}

/// GET /ws
/// Upgrade to the submission WebSocket
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> impl IntoResponse {
    let remote_addr = forwarded_for(&headers)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.to_string()));

    ws.max_message_size(state.max_message_bytes)
        .max_frame_size(state.max_message_bytes)
        .on_upgrade(move |ws_socket| socket::handle_socket(ws_socket, state, remote_addr))
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
}
