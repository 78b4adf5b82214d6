//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::FleetControl;

use crate::handlers::{commands, health, heartbeat, jobs, metrics, ws};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check with connection counts
///
/// ## Node (node token)
/// - `POST /v1/heartbeats/heartbeat` - Refresh `last_seen_at`
/// - `POST /v1/node-commands` - Register a command
/// - `GET /v1/node-commands` - List own commands
/// - `DELETE /v1/node-commands/:command_id` - Delete an own command
/// - `POST /v1/node-metrics/metrics` - Submit a metrics sample
/// - `GET /v1/ws` - WebSocket agent connection
///
/// ## Operator (operator key)
/// - `POST /v1/jobs` - Create and dispatch a job
/// - `GET /v1/jobs/:job_id` - Get a job
/// - `GET /v1/jobs/node/:node_id` - List a node's jobs
/// - `GET /v1/node-commands/node/:node_id` - List a node's commands
/// - `GET /v1/node-metrics/node/:node_id` - List a node's recent metrics
pub fn create_router<C, V>(state: GatewayState<C, V>) -> Router
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    // The upgrade route stays outside the timeout layer; a live socket
    // outlasts any request deadline.
    let sockets = Router::new().route("/v1/ws", get(ws::websocket_handler::<C, V>));

    Router::new()
        // Health (public)
        .route("/health", get(health::health::<C, V>))
        // Node-facing
        .route(
            "/v1/heartbeats/heartbeat",
            post(heartbeat::heartbeat::<C, V>),
        )
        .route(
            "/v1/node-commands",
            post(commands::register_command::<C, V>).get(commands::list_own_commands::<C, V>),
        )
        .route(
            "/v1/node-commands/:command_id",
            delete(commands::delete_command::<C, V>),
        )
        .route(
            "/v1/node-metrics/metrics",
            post(metrics::submit_metrics::<C, V>),
        )
        // Operator
        .route("/v1/jobs", post(jobs::create_job::<C, V>))
        .route("/v1/jobs/:job_id", get(jobs::get_job::<C, V>))
        .route("/v1/jobs/node/:node_id", get(jobs::list_node_jobs::<C, V>))
        .route(
            "/v1/node-commands/node/:node_id",
            get(commands::list_node_commands::<C, V>),
        )
        .route(
            "/v1/node-metrics/node/:node_id",
            get(metrics::list_node_metrics::<C, V>),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .merge(sockets)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_any_origin() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn cors_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header value\n".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }
}
