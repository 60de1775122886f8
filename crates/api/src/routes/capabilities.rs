//! Static capabilities/handshake info, mirrored from the `connected`
//! WebSocket frame, for clients that want it without opening a socket
//! (spec.md §4.9).

use axum::extract::State;
use axum::response::Json;
use gateway_hub::codec::Capabilities;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CapabilitiesResponse {
    pub server_version: String,
    pub capabilities: CapabilitiesDoc,
    pub heartbeat_interval_ms: u64,
    pub connection_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CapabilitiesDoc {
    pub backfill: bool,
    pub acknowledgment: bool,
    pub compression: bool,
}

impl From<Capabilities> for CapabilitiesDoc {
    fn from(c: Capabilities) -> Self {
        Self {
            backfill: c.backfill,
            acknowledgment: c.acknowledgment,
            compression: c.compression,
        }
    }
}

#[utoipa::path(
    get,
    path = "/capabilities",
    responses((status = 200, description = "Handshake capabilities", body = CapabilitiesResponse)),
    tag = "discovery"
)]
pub async fn capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        server_version: state.server_version.clone(),
        capabilities: Capabilities::default().into(),
        heartbeat_interval_ms: state.hub.config().heartbeat_emit_interval_ms,
        connection_timeout_ms: state.hub.config().connection_timeout_ms,
    })
}
