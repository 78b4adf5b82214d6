//! HTTP, WebSocket and gRPC gateway for aura-fleet.
//!
//! This crate is the outer surface of the fleet control plane. It handles:
//!
//! - Node token authentication on every entry point
//! - The WebSocket agent transport (`GET /v1/ws`)
//! - The gRPC agent transport (`NodeAgentService.Attach`)
//! - REST endpoints for operators and for node self-service
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │   Node agents (WS)       │      │   Node agents (gRPC)     │
//! └────────────┬─────────────┘      └────────────┬─────────────┘
//!              │                                 │
//!              ▼                                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    aura-fleet-gateway                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Auth      │ │   Router    │ │  Transports         │    │
//! │  │  Extractor  │ │  + Handlers │ │  (two registries)   │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────────┐              ┌──────────┐
//!        │ Fleet control│              │  Auth    │
//!        │ + dispatch   │              │ (tokens) │
//!        └──────────────┘              └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aura_fleet_auth::StoreTokenValidator;
//! use aura_fleet_control::FleetControlService;
//! use aura_fleet_gateway::{create_router, GatewayConfig, GatewayState, Transports};
//! use aura_fleet_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/aura-fleet")?);
//! let transports = Transports::new();
//! let control = Arc::new(FleetControlService::new(Arc::clone(&store), transports.dispatcher()));
//! let validator = Arc::new(StoreTokenValidator::new(store));
//!
//! let state = GatewayState::new(control, validator, transports, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod inbound;
pub mod protocol;
pub mod routes;
pub mod state;

/// Generated `nodeagent` protobuf types and service stubs.
#[allow(missing_docs, clippy::pedantic, clippy::all)]
pub mod proto {
    tonic::include_proto!("nodeagent");
}

pub use config::GatewayConfig;
pub use error::ApiError;
pub use grpc::NodeAgentGrpc;
pub use routes::create_router;
pub use state::{GatewayState, Transports};

// Re-export key types for convenience
pub use auth::{AuthNode, OperatorAuth};
