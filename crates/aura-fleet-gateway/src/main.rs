//! Aura Fleet Gateway - node agent control plane
//!
//! This is the main entry point for the gateway service. One process serves
//! the HTTP/WebSocket API and the gRPC agent stream over a shared store and
//! shared connection registries.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a mock token validator that
//! accepts `aura-node_<node-uuid>` without a stored credential.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use aura_fleet_auth::MockTokenValidator;
#[cfg(not(feature = "dev-mode"))]
use aura_fleet_auth::StoreTokenValidator;
use aura_fleet_control::FleetControlService;
use aura_fleet_gateway::{create_router, GatewayConfig, GatewayState, NodeAgentGrpc, Transports};
use aura_fleet_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aura_fleet=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Aura Fleet Gateway");

    // Load configuration from environment
    let config = GatewayConfig::from_env();
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/aura-fleet".into());
    let grpc_addr: SocketAddr = config.grpc_listen_addr.parse()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        grpc_listen_addr = %grpc_addr,
        data_dir = %data_dir,
        operator_routes = config.operator_token.is_some(),
        "Gateway configuration loaded"
    );
    if config.operator_token.is_none() {
        tracing::warn!("No OPERATOR_TOKEN set - operator routes will reject every call");
    }

    // Initialize RocksDB store
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);

    // The dispatcher and the transports share the same registries.
    let transports = Transports::new();
    let control = Arc::new(FleetControlService::new(
        Arc::clone(&store),
        transports.dispatcher(),
    ));
    tracing::info!("Fleet control initialized");

    #[cfg(feature = "dev-mode")]
    let validator = {
        tracing::warn!("DEV MODE ENABLED - using mock token validator");
        tracing::warn!("Use tokens in format: aura-node_<node-uuid>");
        Arc::new(MockTokenValidator)
    };

    #[cfg(not(feature = "dev-mode"))]
    let validator = Arc::new(StoreTokenValidator::new(Arc::clone(&store)));

    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(control, validator, transports, config);

    let grpc = NodeAgentGrpc::new(&state).into_server();
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;

    tracing::info!(grpc_listen_addr = %grpc_addr, "Starting gRPC server");
    let grpc_server = tonic::transport::Server::builder()
        .add_service(grpc)
        .serve(grpc_addr);

    tokio::select! {
        result = async { axum::serve(listener, app).await } => result?,
        result = grpc_server => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
