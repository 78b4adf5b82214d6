//! Node heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::FleetControl;

use crate::auth::AuthNode;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Heartbeat acknowledgement.
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// Refresh the caller's `last_seen_at`.
///
/// # Errors
///
/// Returns an error if the credential could not be updated.
pub async fn heartbeat<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    state
        .control
        .process_heartbeat(&node.node_id, &node.token_hash)
        .await?;

    Ok(Json(HeartbeatResponse { status: "ok" }))
}
