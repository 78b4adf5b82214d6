//! Health check endpoint.
//!
//! This module provides the public health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::FleetControl;

use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Live connections per transport.
    pub connections: ConnectionCounts,
}

/// Number of connected nodes per transport.
#[derive(Debug, Serialize)]
pub struct ConnectionCounts {
    /// Nodes on the gRPC stream.
    pub stream: usize,
    /// Nodes on the WebSocket.
    pub websocket: usize,
}

/// Health check handler.
///
/// Returns the current service status. This endpoint is public and
/// does not require authentication.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "connections": { "stream": 3, "websocket": 1 }
/// }
/// ```
pub async fn health<C, V>(State(state): State<Arc<GatewayState<C, V>>>) -> impl IntoResponse
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionCounts {
            stream: state.transports.stream.len(),
            websocket: state.transports.websocket.len(),
        },
    };

    (StatusCode::OK, Json(response))
}
