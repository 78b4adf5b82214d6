//! End-to-end tests for the gRPC agent transport.

mod common;

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tonic::transport::Channel;
use tonic::{Code, Request, Streaming};

use aura_fleet_control::{FleetControl, JobStatus, NodeId};
use aura_fleet_gateway::proto::node_agent_service_client::NodeAgentServiceClient;
use aura_fleet_gateway::proto::{
    node_message, server_message, HeartbeatPayload, JobResultPayload, NodeMessage,
    RegisterCommandRequest, ServerMessage,
};
use aura_fleet_store::CredentialStore;
use common::{eventually, TestGateway};

struct StreamAgent {
    _client: NodeAgentServiceClient<Channel>,
    outbound: mpsc::Sender<NodeMessage>,
    inbound: Streaming<ServerMessage>,
}

impl StreamAgent {
    async fn next(&mut self) -> server_message::Payload {
        tokio::time::timeout(Duration::from_secs(5), self.inbound.message())
            .await
            .expect("timed out waiting for a message")
            .expect("stream failed")
            .expect("stream ended")
            .payload
            .expect("message without payload")
    }

    async fn send(&self, payload: node_message::Payload) {
        self.outbound
            .send(NodeMessage {
                payload: Some(payload),
            })
            .await
            .unwrap();
    }
}

async fn client(gateway: &TestGateway) -> NodeAgentServiceClient<Channel> {
    NodeAgentServiceClient::connect(format!("http://{}", gateway.grpc_addr))
        .await
        .unwrap()
}

fn authorized<T>(message: T, token: &str) -> Request<T> {
    let mut request = Request::new(message);
    request
        .metadata_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    request
}

async fn attach(gateway: &TestGateway, token: &str) -> Result<StreamAgent, tonic::Status> {
    let (outbound, rx) = mpsc::channel(16);
    let mut client = client(gateway).await;
    let response = client
        .attach(authorized(ReceiverStream::new(rx), token))
        .await?;
    Ok(StreamAgent {
        _client: client,
        outbound,
        inbound: response.into_inner(),
    })
}

async fn attached_agent(gateway: &TestGateway, node_id: NodeId) -> (StreamAgent, String) {
    let token = gateway.issue_token(node_id);
    let mut agent = attach(gateway, &token).await.unwrap();
    match agent.next().await {
        server_message::Payload::Connected(connected) => {
            assert_eq!(connected.node_id, node_id.to_string());
        }
        other => panic!("expected connected, got {other:?}"),
    }
    (agent, token)
}

#[tokio::test]
async fn rejects_missing_and_unknown_tokens() {
    let gateway = TestGateway::start().await;

    let (_tx, rx) = mpsc::channel::<NodeMessage>(1);
    let status = client(&gateway)
        .await
        .attach(Request::new(ReceiverStream::new(rx)))
        .await
        .err()
        .unwrap();
    assert_eq!(status.code(), Code::Unauthenticated);

    let status = attach(&gateway, "aura-node_unknown").await.err().unwrap();
    assert_eq!(status.code(), Code::Unauthenticated);
    assert!(gateway.transports.stream.is_empty());
}

#[tokio::test]
async fn job_round_trip() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let (mut agent, _token) = attached_agent(&gateway, node_id).await;
    assert!(gateway.transports.stream.contains(&node_id));

    let job = gateway
        .control
        .create_and_dispatch(&node_id, "restart", None)
        .await
        .unwrap();

    let server_message::Payload::ExecuteJob(execute) = agent.next().await else {
        panic!("expected execute_job");
    };
    assert_eq!(execute.job_id, job.id.to_string());
    assert_eq!(execute.command_name, "restart");

    agent
        .send(node_message::Payload::JobResult(JobResultPayload {
            job_id: job.id.to_string(),
            status: i32::from(aura_fleet_gateway::grpc::ProtoJobStatus::Completed),
            output: "ok".into(),
            error: String::new(),
        }))
        .await;

    let control = &gateway.control;
    let job_id = job.id;
    assert!(
        eventually(|| async move {
            control.get_job(&job_id).await.unwrap().status == JobStatus::Completed
        })
        .await
    );
    let stored = control.get_job(&job_id).await.unwrap();
    assert_eq!(stored.output, "ok");
    assert!(stored.finished_at.is_some());
    // `running` was never reported.
    assert!(stored.started_at.is_none());
}

#[tokio::test]
async fn heartbeat_gets_pong_and_touches_credential() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let (mut agent, token) = attached_agent(&gateway, node_id).await;

    agent
        .send(node_message::Payload::Heartbeat(HeartbeatPayload {
            node_id: node_id.to_string(),
        }))
        .await;

    assert!(matches!(agent.next().await, server_message::Payload::Pong(_)));
    let credential = gateway
        .store
        .find_credential_by_hash(&aura_fleet_auth::hash_token(&token))
        .unwrap()
        .unwrap();
    assert!(credential.last_seen_at.is_some());
}

#[tokio::test]
async fn closing_the_stream_unregisters() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let (agent, _token) = attached_agent(&gateway, node_id).await;

    drop(agent);

    let transports = &gateway.transports;
    assert!(eventually(|| async move { !transports.stream.contains(&node_id) }).await);
}

#[tokio::test]
async fn register_commands_counts_accepted() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);

    let items = vec![
        RegisterCommandRequest {
            name: "restart".into(),
            description: "restart the agent".into(),
            r#type: 0,
            script_path: String::new(),
        },
        RegisterCommandRequest {
            name: "   ".into(),
            description: String::new(),
            r#type: 0,
            script_path: String::new(),
        },
        RegisterCommandRequest {
            name: "backup".into(),
            description: String::new(),
            r#type: 1,
            script_path: "/opt/scripts/backup.sh".into(),
        },
    ];

    let response = client(&gateway)
        .await
        .register_commands(authorized(tokio_stream::iter(items), &token))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.registered, 2);

    let commands = gateway.control.list_commands(&node_id).await.unwrap();
    let names: Vec<_> = commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["backup", "restart"]);
}

#[tokio::test]
async fn stream_is_preferred_over_websocket() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let (mut agent, token) = attached_agent(&gateway, node_id).await;

    let mut request = format!("ws://{}/v1/ws", gateway.http_addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    let (mut socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    let transports = &gateway.transports;
    assert!(eventually(|| async move { transports.websocket.contains(&node_id) }).await);

    let job = gateway
        .control
        .create_and_dispatch(&node_id, "restart", None)
        .await
        .unwrap();
    let server_message::Payload::ExecuteJob(execute) = agent.next().await else {
        panic!("expected execute_job on the stream");
    };
    assert_eq!(execute.job_id, job.id.to_string());

    // Stream goes away: the next job falls back to the WebSocket.
    drop(agent);
    assert!(eventually(|| async move { !transports.stream.contains(&node_id) }).await);

    let fallback = gateway
        .control
        .create_and_dispatch(&node_id, "backup", None)
        .await
        .unwrap();
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = socket.next().await {
            if let tokio_tungstenite::tungstenite::Message::Text(text) = message {
                if text.contains(&fallback.id.to_string()) {
                    return true;
                }
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(found);
}
