//! Shared harness: a gateway on ephemeral ports over a temporary store.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

use aura_fleet_auth::{generate_token, StoreTokenValidator};
use aura_fleet_control::{FleetControlService, NodeId};
use aura_fleet_gateway::{create_router, GatewayConfig, GatewayState, NodeAgentGrpc, Transports};
use aura_fleet_store::{CredentialStore, NodeCredential, RocksStore};

pub const OPERATOR_TOKEN: &str = "operator-secret";

pub type Control = FleetControlService<RocksStore>;

pub struct TestGateway {
    pub http_addr: SocketAddr,
    pub grpc_addr: SocketAddr,
    pub router: Router,
    pub store: Arc<RocksStore>,
    pub control: Arc<Control>,
    pub transports: Transports,
    _dir: TempDir,
}

impl TestGateway {
    pub async fn start() -> Self {
        Self::start_with(GatewayConfig::default()).await
    }

    pub async fn start_with(mut config: GatewayConfig) -> Self {
        config.operator_token = Some(OPERATOR_TOKEN.to_string());

        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let transports = Transports::new();
        let control = Arc::new(FleetControlService::new(
            Arc::clone(&store),
            transports.dispatcher(),
        ));
        let validator = Arc::new(StoreTokenValidator::new(Arc::clone(&store)));

        let state = GatewayState::new(
            Arc::clone(&control),
            validator,
            transports.clone(),
            config,
        );
        let grpc = NodeAgentGrpc::new(&state).into_server();
        let router = create_router(state);

        let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http_addr = http_listener.local_addr().unwrap();
        let app = router.clone();
        tokio::spawn(async move {
            axum::serve(http_listener, app).await.unwrap();
        });

        let grpc_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let grpc_addr = grpc_listener.local_addr().unwrap();
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(grpc)
                .serve_with_incoming(TcpListenerStream::new(grpc_listener))
                .await
                .unwrap();
        });

        Self {
            http_addr,
            grpc_addr,
            router,
            store,
            control,
            transports,
            _dir: dir,
        }
    }

    /// Store a fresh credential for `node_id` and return the plain token.
    pub fn issue_token(&self, node_id: NodeId) -> String {
        let (plain, hash) = generate_token();
        self.store
            .put_credential(&NodeCredential::new(hash, node_id))
            .unwrap();
        plain
    }
}

/// Poll `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
