//! Gateway application state.
//!
//! This module defines the shared state that is available to all request
//! handlers and to the gRPC service.

use std::sync::Arc;

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::{
    ConnectionRegistry, Dispatcher, FleetControl, MultiDispatcher, RegistryDispatcher,
    TransportKind,
};

use crate::config::GatewayConfig;
use crate::grpc::StreamJobEncoder;
use crate::proto;
use crate::protocol::WsJobEncoder;

/// The live connection registries of both agent transports.
#[derive(Clone)]
pub struct Transports {
    /// Connections accepted on `GET /v1/ws`; messages are JSON envelopes.
    pub websocket: Arc<ConnectionRegistry<String>>,
    /// Connections accepted on the gRPC `Attach` stream.
    pub stream: Arc<ConnectionRegistry<proto::ServerMessage>>,
}

impl Transports {
    /// Create empty registries for both transports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            websocket: Arc::new(ConnectionRegistry::new(TransportKind::WebSocket)),
            stream: Arc::new(ConnectionRegistry::new(TransportKind::Stream)),
        }
    }

    /// Build the dispatch chain over these registries.
    ///
    /// The gRPC stream is tried first and the WebSocket second.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::new(
            MultiDispatcher::default()
                .with(Arc::new(RegistryDispatcher::new(
                    Arc::clone(&self.stream),
                    StreamJobEncoder,
                )))
                .with(Arc::new(RegistryDispatcher::new(
                    Arc::clone(&self.websocket),
                    WsJobEncoder,
                ))),
        )
    }
}

impl Default for Transports {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state for the gateway.
pub struct GatewayState<C, V>
where
    C: FleetControl,
    V: TokenValidator,
{
    /// The control plane for jobs and commands.
    pub control: Arc<C>,
    /// The node token validator.
    pub validator: Arc<V>,
    /// Live connections per transport.
    pub transports: Transports,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C, V> GatewayState<C, V>
where
    C: FleetControl,
    V: TokenValidator,
{
    /// Create a new gateway state.
    ///
    /// `transports` must be the same registries the control service's
    /// dispatcher was built from.
    #[must_use]
    pub fn new(
        control: Arc<C>,
        validator: Arc<V>,
        transports: Transports,
        config: GatewayConfig,
    ) -> Self {
        Self {
            control,
            validator,
            transports,
            config,
        }
    }
}

impl<C, V> Clone for GatewayState<C, V>
where
    C: FleetControl,
    V: TokenValidator,
{
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            validator: Arc::clone(&self.validator),
            transports: self.transports.clone(),
            config: self.config.clone(),
        }
    }
}
