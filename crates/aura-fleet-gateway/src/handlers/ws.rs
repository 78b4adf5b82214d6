//! WebSocket agent transport.
//!
//! A node upgrades `GET /v1/ws` with its bearer token. The connection is
//! registered in the WebSocket registry, after which a writer task drains the
//! connection's queue onto the socket while this task reads node reports.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::{
    CommandKind, ConnectionEntry, ConnectionRegistry, FleetControl, JobStatus, NodeId,
    TransportKind,
};

use crate::auth::AuthNode;
use crate::config::WsConfig;
use crate::inbound::{apply_job_result, apply_register_command, RawCommand, RawJobResult};
use crate::protocol::{
    decode_frame, ConnectedPayload, Envelope, JobResultPayload, MessageType,
    RegisterCommandPayload,
};
use crate::state::GatewayState;

type WsEntry = ConnectionEntry<String>;

/// WebSocket upgrade handler.
///
/// Authentication happens once, before the upgrade; a rejected token never
/// reaches the registry.
pub async fn websocket_handler<C, V>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
) -> Response
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    tracing::info!(node_id = %node.node_id, "WebSocket connection initiated");

    let control = Arc::clone(&state.control);
    let registry = Arc::clone(&state.transports.websocket);
    let config = state.config.websocket.clone();

    ws.on_upgrade(move |socket| handle_socket(socket, control, registry, config, node.node_id))
}

/// Run one connection from registration to teardown.
async fn handle_socket<C: FleetControl + ?Sized>(
    socket: WebSocket,
    control: Arc<C>,
    registry: Arc<ConnectionRegistry<String>>,
    config: WsConfig,
    node_id: NodeId,
) {
    let (entry, rx) = register_connection(&registry, node_id, &config);
    let connection_id = entry.connection_id();

    let (mut sink, stream) = socket.split();

    let connected = Envelope::with_payload(
        MessageType::Connected,
        &ConnectedPayload {
            node_id: node_id.to_string(),
            connection_id: connection_id.to_string(),
        },
    )
    .and_then(|envelope| envelope.to_json());

    let greeted = match connected {
        Ok(text) => write_frame(&mut sink, Message::Text(text), config.write_timeout()).await,
        Err(e) => {
            tracing::error!(node_id = %node_id, error = %e, "Failed to encode connected message");
            false
        }
    };

    if greeted {
        tracing::info!(
            node_id = %node_id,
            connection_id = %connection_id,
            transport = %TransportKind::WebSocket,
            "Node connected"
        );

        let writer = tokio::spawn(write_loop(sink, rx, config.clone(), node_id));
        read_loop(stream, control.as_ref(), &entry, config.idle_timeout()).await;
        writer.abort();
    }

    registry.unregister(&node_id, &entry);
    tracing::info!(
        node_id = %node_id,
        connection_id = %connection_id,
        transport = %TransportKind::WebSocket,
        "Node disconnected"
    );
}

/// Create a connection's bounded queue and install it in the registry.
fn register_connection(
    registry: &ConnectionRegistry<String>,
    node_id: NodeId,
    config: &WsConfig,
) -> (Arc<WsEntry>, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let entry = Arc::new(ConnectionEntry::new(node_id, TransportKind::WebSocket, tx));

    if let Some(previous) = registry.register(node_id, Arc::clone(&entry)) {
        tracing::info!(
            node_id = %node_id,
            connection_id = %entry.connection_id(),
            replaced = %previous.connection_id(),
            "WebSocket connection replaced an older one"
        );
    }
    (entry, rx)
}

/// Write one frame under the write deadline. Returns false on failure.
async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    deadline: Duration,
) -> bool {
    match timeout(deadline, sink.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            false
        }
        Err(_) => {
            tracing::debug!("WebSocket write deadline exceeded");
            false
        }
    }
}

/// Join everything currently queued behind `first` into one frame.
fn coalesce(first: String, rx: &mut mpsc::Receiver<String>) -> String {
    let mut frame = first;
    while let Ok(next) = rx.try_recv() {
        frame.push('\n');
        frame.push_str(&next);
    }
    frame
}

/// Drain the connection's queue onto the socket and keep it pinged.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    config: WsConfig,
    node_id: NodeId,
) {
    let period = config.ping_interval();
    let mut ping = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            queued = rx.recv() => {
                let Some(first) = queued else {
                    // Every sender is gone; say goodbye.
                    let _ = write_frame(&mut sink, Message::Close(None), config.write_timeout()).await;
                    return;
                };
                let frame = coalesce(first, &mut rx);
                if !write_frame(&mut sink, Message::Text(frame), config.write_timeout()).await {
                    tracing::debug!(node_id = %node_id, "Writer stopped");
                    return;
                }
            }
            _ = ping.tick() => {
                if !write_frame(&mut sink, Message::Ping(Vec::new()), config.write_timeout()).await {
                    tracing::debug!(node_id = %node_id, "Ping failed, writer stopped");
                    return;
                }
            }
        }
    }
}

/// Read node frames until the peer closes, a read fails, or the idle
/// deadline passes. Every frame renews the deadline.
async fn read_loop<C: FleetControl + ?Sized>(
    mut stream: SplitStream<WebSocket>,
    control: &C,
    entry: &WsEntry,
    idle: Duration,
) {
    let node_id = entry.node_id();
    loop {
        let message = match timeout(idle, stream.next()).await {
            Err(_) => {
                tracing::info!(node_id = %node_id, "WebSocket idle deadline expired");
                return;
            }
            Ok(None) => return,
            Ok(Some(Err(e))) => {
                tracing::debug!(node_id = %node_id, error = %e, "WebSocket read failed");
                return;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                for envelope in decode_frame(&text) {
                    match envelope {
                        Ok(envelope) => handle_envelope(control, entry, envelope).await,
                        Err(e) => {
                            tracing::warn!(
                                node_id = %node_id,
                                error = %e,
                                "Dropping undecodable envelope"
                            );
                        }
                    }
                }
            }
            Message::Close(_) => {
                tracing::debug!(node_id = %node_id, "Node closed the WebSocket");
                return;
            }
            Message::Binary(_) => {
                tracing::warn!(node_id = %node_id, "Ignoring binary WebSocket frame");
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Handle one inbound envelope.
async fn handle_envelope<C: FleetControl + ?Sized>(control: &C, entry: &WsEntry, envelope: Envelope) {
    let node_id = entry.node_id();
    let transport = TransportKind::WebSocket;

    match envelope.kind {
        MessageType::Ping => {
            let pong = Envelope::new(MessageType::Pong, None).to_json();
            match pong {
                Ok(text) => {
                    if let Err(e) = entry.try_send(text) {
                        tracing::debug!(node_id = %node_id, error = %e, "Could not queue pong");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode pong"),
            }
        }
        MessageType::Pong => {}
        MessageType::JobResult => match envelope.decode_payload::<JobResultPayload>() {
            Ok(payload) => {
                let report = RawJobResult {
                    status: payload.status.parse::<JobStatus>().ok(),
                    job_id: payload.job_id,
                    output: payload.output,
                    error: payload.error,
                };
                apply_job_result(control, transport, &node_id, report).await;
            }
            Err(e) => {
                tracing::warn!(node_id = %node_id, error = %e, "Dropping malformed job result");
            }
        },
        MessageType::RegisterCommand => {
            match envelope.decode_payload::<RegisterCommandPayload>() {
                Ok(payload) => {
                    let Some(kind) = CommandKind::parse_or_default(&payload.kind) else {
                        tracing::warn!(
                            node_id = %node_id,
                            command = %payload.name,
                            kind = %payload.kind,
                            "Dropping command with unknown type"
                        );
                        return;
                    };
                    let command = RawCommand {
                        name: payload.name,
                        description: payload.description,
                        kind: Some(kind),
                        script_path: payload.script_path,
                    };
                    apply_register_command(control, transport, &node_id, command).await;
                }
                Err(e) => {
                    tracing::warn!(
                        node_id = %node_id,
                        error = %e,
                        "Dropping malformed command registration"
                    );
                }
            }
        }
        MessageType::Connected | MessageType::ExecuteJob | MessageType::Unknown => {
            tracing::warn!(
                node_id = %node_id,
                kind = ?envelope.kind,
                "Ignoring unexpected message type"
            );
        }
    }
}
