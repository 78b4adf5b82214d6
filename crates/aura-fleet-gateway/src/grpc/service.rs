//! `NodeAgentService` implementation.

use std::pin::{pin, Pin};
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status, Streaming};

use aura_fleet_auth::{AuthError, AuthenticatedNode, TokenValidator};
use aura_fleet_control::{ConnectionEntry, ConnectionRegistry, FleetControl, NodeId, TransportKind};

use super::{command_kind_from_proto, job_status_from_proto};
use crate::error::auth_status;
use crate::inbound::{apply_job_result, apply_register_command, RawCommand, RawJobResult};
use crate::proto::node_agent_service_server::{NodeAgentService, NodeAgentServiceServer};
use crate::proto::{
    node_message, server_message, ConnectedPayload, NodeMessage, PongPayload,
    RegisterCommandRequest, RegisterCommandsResponse, ServerMessage,
};
use crate::state::GatewayState;

type StreamEntry = ConnectionEntry<ServerMessage>;
type ServerStream = Pin<Box<dyn Stream<Item = Result<ServerMessage, Status>> + Send>>;

/// gRPC service for node agents.
pub struct NodeAgentGrpc<C, V> {
    control: Arc<C>,
    validator: Arc<V>,
    registry: Arc<ConnectionRegistry<ServerMessage>>,
    queue_capacity: usize,
}

impl<C, V> NodeAgentGrpc<C, V>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    /// Build the service over the gateway's shared state.
    #[must_use]
    pub fn new(state: &GatewayState<C, V>) -> Self {
        Self {
            control: Arc::clone(&state.control),
            validator: Arc::clone(&state.validator),
            registry: Arc::clone(&state.transports.stream),
            queue_capacity: state.config.stream.queue_capacity,
        }
    }

    /// Wrap the service for `tonic::transport::Server::add_service`.
    #[must_use]
    pub fn into_server(self) -> NodeAgentServiceServer<Self> {
        NodeAgentServiceServer::new(self)
    }

    async fn authenticate(&self, metadata: &MetadataMap) -> Result<AuthenticatedNode, Status> {
        let raw = metadata
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| auth_status(&AuthError::MissingToken))?;

        self.validator
            .validate(raw)
            .await
            .map_err(|e| auth_status(&e))
    }

    /// Register an authenticated node's stream and start reading its reports.
    ///
    /// Returns the receiving half of the connection's queue, already holding
    /// the `connected` greeting.
    pub(crate) fn open_session<S>(
        &self,
        node: AuthenticatedNode,
        inbound: S,
    ) -> Result<mpsc::Receiver<ServerMessage>, Status>
    where
        S: Stream<Item = Result<NodeMessage, Status>> + Send + 'static,
    {
        let node_id = node.node_id;
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let entry = Arc::new(ConnectionEntry::new(node_id, TransportKind::Stream, tx));

        // The queue is empty, so the greeting always fits and goes out first.
        entry
            .try_send(connected_message(&entry))
            .map_err(|e| Status::internal(e.to_string()))?;

        if let Some(previous) = self.registry.register(node_id, Arc::clone(&entry)) {
            tracing::info!(
                node_id = %node_id,
                connection_id = %entry.connection_id(),
                replaced = %previous.connection_id(),
                "Stream connection replaced an older one"
            );
        }
        tracing::info!(
            node_id = %node_id,
            connection_id = %entry.connection_id(),
            transport = %TransportKind::Stream,
            "Node connected"
        );

        tokio::spawn(run_session(
            Arc::clone(&self.control),
            Arc::clone(&self.registry),
            entry,
            node.token_hash,
            inbound,
        ));
        Ok(rx)
    }
}

#[tonic::async_trait]
impl<C, V> NodeAgentService for NodeAgentGrpc<C, V>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    type AttachStream = ServerStream;

    async fn attach(
        &self,
        request: Request<Streaming<NodeMessage>>,
    ) -> Result<Response<Self::AttachStream>, Status> {
        let node = self.authenticate(request.metadata()).await?;
        let rx = self.open_session(node, request.into_inner())?;

        let outbound = ReceiverStream::new(rx).map(Ok::<_, Status>);
        Ok(Response::new(Box::pin(outbound) as Self::AttachStream))
    }

    async fn register_commands(
        &self,
        request: Request<Streaming<RegisterCommandRequest>>,
    ) -> Result<Response<RegisterCommandsResponse>, Status> {
        let node = self.authenticate(request.metadata()).await?;
        let registered =
            register_catalog(self.control.as_ref(), &node.node_id, request.into_inner()).await;

        tracing::info!(node_id = %node.node_id, registered, "Command catalog pushed");

        Ok(Response::new(RegisterCommandsResponse { registered }))
    }
}

fn connected_message(entry: &StreamEntry) -> ServerMessage {
    ServerMessage {
        payload: Some(server_message::Payload::Connected(ConnectedPayload {
            node_id: entry.node_id().to_string(),
            connection_id: entry.connection_id().to_string(),
        })),
    }
}

fn pong_message() -> ServerMessage {
    ServerMessage {
        payload: Some(server_message::Payload::Pong(PongPayload {
            timestamp_ms: Utc::now().timestamp_millis(),
        })),
    }
}

/// Read one connection's inbound stream until it ends, then unregister it.
pub(crate) async fn run_session<C, S>(
    control: Arc<C>,
    registry: Arc<ConnectionRegistry<ServerMessage>>,
    entry: Arc<StreamEntry>,
    token_hash: String,
    inbound: S,
) where
    C: FleetControl + ?Sized,
    S: Stream<Item = Result<NodeMessage, Status>>,
{
    let node_id = entry.node_id();
    let mut inbound = pin!(inbound);

    while let Some(item) = inbound.next().await {
        match item {
            Ok(message) => handle_message(control.as_ref(), &entry, &token_hash, message).await,
            Err(status) => {
                tracing::debug!(node_id = %node_id, status = %status, "Stream read failed");
                break;
            }
        }
    }

    registry.unregister(&node_id, &entry);
    tracing::info!(
        node_id = %node_id,
        connection_id = %entry.connection_id(),
        transport = %TransportKind::Stream,
        "Node disconnected"
    );
}

async fn handle_message<C: FleetControl + ?Sized>(
    control: &C,
    entry: &StreamEntry,
    token_hash: &str,
    message: NodeMessage,
) {
    let node_id = entry.node_id();
    let transport = TransportKind::Stream;

    match message.payload {
        Some(node_message::Payload::JobResult(result)) => {
            let report = RawJobResult {
                status: job_status_from_proto(result.status),
                job_id: result.job_id,
                output: result.output,
                error: result.error,
            };
            apply_job_result(control, transport, &node_id, report).await;
        }
        Some(node_message::Payload::Heartbeat(_)) => {
            tracing::debug!(node_id = %node_id, "Stream heartbeat");
            if let Err(e) = control.process_heartbeat(&node_id, token_hash).await {
                tracing::error!(node_id = %node_id, error = %e, "Failed to record heartbeat");
            }
            if let Err(e) = entry.try_send(pong_message()) {
                tracing::debug!(node_id = %node_id, error = %e, "Could not queue pong");
            }
        }
        Some(node_message::Payload::RegisterCommand(request)) => {
            if let Some(command) = raw_command(&node_id, request) {
                apply_register_command(control, transport, &node_id, command).await;
            }
        }
        None => {
            tracing::warn!(node_id = %node_id, "Ignoring stream message without payload");
        }
    }
}

fn raw_command(node_id: &NodeId, request: RegisterCommandRequest) -> Option<RawCommand> {
    let Some(kind) = command_kind_from_proto(request.r#type) else {
        tracing::warn!(
            node_id = %node_id,
            command = %request.name,
            kind = request.r#type,
            "Dropping command with unknown type"
        );
        return None;
    };

    Some(RawCommand {
        name: request.name,
        description: request.description,
        kind: Some(kind),
        script_path: Some(request.script_path),
    })
}

/// Upsert every item of a pushed catalog and count the accepted ones.
///
/// Rejected items are skipped. A stream error ends the push early; whatever
/// was accepted before it stays stored.
pub(crate) async fn register_catalog<C, S>(control: &C, node_id: &NodeId, items: S) -> u32
where
    C: FleetControl + ?Sized,
    S: Stream<Item = Result<RegisterCommandRequest, Status>>,
{
    let mut items = pin!(items);
    let mut registered: u32 = 0;

    while let Some(item) = items.next().await {
        let request = match item {
            Ok(request) => request,
            Err(status) => {
                tracing::warn!(node_id = %node_id, status = %status, "Catalog push interrupted");
                break;
            }
        };

        let Some(command) = raw_command(node_id, request) else {
            continue;
        };
        if apply_register_command(control, TransportKind::Stream, node_id, command)
            .await
            .is_some()
        {
            registered = registered.saturating_add(1);
        }
    }

    registered
}
