//! HTTP API tests driven through the router with `tower::ServiceExt`.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use aura_fleet_control::{FleetControl, JobStatus, NodeId};
use aura_fleet_store::CredentialStore;
use common::{TestGateway, OPERATOR_TOKEN};

async fn call(
    gateway: &TestGateway,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = gateway.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_connection_counts() {
    let gateway = TestGateway::start().await;
    let (status, body) = call(&gateway, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"]["stream"], 0);
    assert_eq!(body["connections"]["websocket"], 0);
}

#[tokio::test]
async fn operator_routes_require_the_key() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let uri = format!("/v1/jobs/node/{node_id}");

    let (status, body) = call(&gateway, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = call(&gateway, Method::GET, &uri, Some("wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A node token is not an operator key.
    let token = gateway.issue_token(node_id);
    let (status, _) = call(&gateway, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&gateway, Method::GET, &uri, Some(OPERATOR_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"], json!([]));
}

#[tokio::test]
async fn operator_routes_closed_without_configured_key() {
    let gateway = TestGateway::start().await;
    let mut config = aura_fleet_gateway::GatewayConfig::default();
    config.operator_token = None;
    let state = aura_fleet_gateway::GatewayState::new(
        std::sync::Arc::clone(&gateway.control),
        std::sync::Arc::new(aura_fleet_auth::StoreTokenValidator::new(
            std::sync::Arc::clone(&gateway.store),
        )),
        gateway.transports.clone(),
        config,
    );
    let router = aura_fleet_gateway::create_router(state);

    let request = Request::builder()
        .uri(format!("/v1/jobs/node/{}", NodeId::generate()))
        .header(header::AUTHORIZATION, "Bearer ")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_job_for_offline_node_stays_pending() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();

    let (status, body) = call(
        &gateway,
        Method::POST,
        "/v1/jobs",
        Some(OPERATOR_TOKEN),
        Some(json!({"node_id": node_id.to_string(), "command_name": "restart"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["command_type"], "default");
    assert_eq!(body["node_id"], node_id.to_string());

    let job_id = body["id"].as_str().unwrap().to_string();
    let (status, fetched) = call(
        &gateway,
        Method::GET,
        &format!("/v1/jobs/{job_id}"),
        Some(OPERATOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], job_id);
    assert!(fetched.get("started_at").is_none());
}

#[tokio::test]
async fn create_job_validation() {
    let gateway = TestGateway::start().await;

    let cases = [
        json!({"node_id": "not-a-uuid", "command_name": "restart"}),
        json!({"node_id": NodeId::generate().to_string(), "command_name": "  "}),
        json!({"node_id": NodeId::generate().to_string(), "command_name": "x", "command_type": "shell"}),
        json!({"node_id": "00000000-0000-0000-0000-000000000000", "command_name": "restart"}),
    ];
    for body in cases {
        let (status, response) = call(
            &gateway,
            Method::POST,
            "/v1/jobs",
            Some(OPERATOR_TOKEN),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let gateway = TestGateway::start().await;
    let uri = format!("/v1/jobs/{}", aura_fleet_control::JobId::generate());
    let (status, body) = call(&gateway, Method::GET, &uri, Some(OPERATOR_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = call(
        &gateway,
        Method::GET,
        "/v1/jobs/garbage",
        Some(OPERATOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_jobs_newest_first() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let first = gateway
        .control
        .create_and_dispatch(&node_id, "first", None)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = gateway
        .control
        .create_and_dispatch(&node_id, "second", None)
        .await
        .unwrap();
    gateway
        .control
        .report_job_result(&first.id, JobStatus::Completed, "ok".into(), String::new())
        .await
        .unwrap();

    let (status, body) = call(
        &gateway,
        Method::GET,
        &format!("/v1/jobs/node/{node_id}"),
        Some(OPERATOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], second.id.to_string());
    assert_eq!(jobs[1]["id"], first.id.to_string());
    assert_eq!(jobs[1]["status"], "completed");
}

#[tokio::test]
async fn heartbeat_touches_credential() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);

    let (status, _) = call(
        &gateway,
        Method::POST,
        "/v1/heartbeats/heartbeat",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &gateway,
        Method::POST,
        "/v1/heartbeats/heartbeat",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let credential = gateway
        .store
        .find_credential_by_hash(&aura_fleet_auth::hash_token(&token))
        .unwrap()
        .unwrap();
    assert!(credential.last_seen_at.is_some());
}

#[tokio::test]
async fn node_command_self_service() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);

    let (status, created) = call(
        &gateway,
        Method::POST,
        "/v1/node-commands",
        Some(&token),
        Some(json!({"name": "backup", "description": "nightly", "type": "custom",
                    "script_path": "/opt/scripts/backup.sh"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "custom");
    assert_eq!(created["node_id"], node_id.to_string());

    // Re-registering the same name updates in place.
    let (status, updated) = call(
        &gateway,
        Method::POST,
        "/v1/node-commands",
        Some(&token),
        Some(json!({"name": "backup", "description": "hourly", "type": "custom"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["description"], "hourly");

    let (status, own) = call(&gateway, Method::GET, "/v1/node-commands", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["commands"].as_array().unwrap().len(), 1);

    let (status, listed) = call(
        &gateway,
        Method::GET,
        &format!("/v1/node-commands/node/{node_id}"),
        Some(OPERATOR_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["commands"][0]["name"], "backup");

    let id = created["id"].as_str().unwrap();
    let (status, _) = call(
        &gateway,
        Method::DELETE,
        &format!("/v1/node-commands/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &gateway,
        Method::DELETE,
        &format!("/v1/node-commands/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cannot_delete_another_nodes_command() {
    let gateway = TestGateway::start().await;
    let owner = NodeId::generate();
    let other = NodeId::generate();
    let owner_token = gateway.issue_token(owner);
    let other_token = gateway.issue_token(other);

    let (_, created) = call(
        &gateway,
        Method::POST,
        "/v1/node-commands",
        Some(&owner_token),
        Some(json!({"name": "restart"})),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = call(
        &gateway,
        Method::DELETE,
        &format!("/v1/node-commands/{id}"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(gateway.control.list_commands(&owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);
    gateway
        .store
        .revoke_credential(&aura_fleet_auth::hash_token(&token), chrono::Utc::now())
        .unwrap();

    let (status, _) = call(
        &gateway,
        Method::POST,
        "/v1/heartbeats/heartbeat",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&gateway, Method::GET, "/v1/node-commands", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn node_submits_metrics() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);
    let before = chrono::Utc::now();

    let (status, body) = call(
        &gateway,
        Method::POST,
        "/v1/node-metrics/metrics",
        Some(&token),
        Some(json!({
            "node_id": NodeId::generate().to_string(),
            "cpu_usage_percent": 42.5,
            "memory_total_bytes": 8_589_934_592_i64,
            "memory_used_bytes": 4_294_967_296_i64,
            "memory_usage_percent": 50.0,
            "disk_usage_percent": 12.0,
            "collected_at": "2001-01-01T00:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"status": "ok"}));

    // Attributed to the token's node and stamped on arrival.
    let stored = gateway.control.list_metrics(&node_id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].node_id, node_id);
    assert!((stored[0].cpu_usage_percent - 42.5).abs() < f64::EPSILON);
    assert_eq!(stored[0].memory_total_bytes, 8_589_934_592);
    assert_eq!(stored[0].disk_total_bytes, 0);
    assert!(stored[0].collected_at >= before);

    let uri = format!("/v1/node-metrics/node/{node_id}");
    let (status, body) = call(&gateway, Method::GET, &uri, Some(OPERATOR_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"].as_array().unwrap().len(), 1);
    assert_eq!(body["metrics"][0]["node_id"], node_id.to_string());

    let (status, _) = call(&gateway, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_token_cannot_submit_metrics() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);
    gateway
        .store
        .revoke_credential(&aura_fleet_auth::hash_token(&token), chrono::Utc::now())
        .unwrap();

    let (status, _) = call(
        &gateway,
        Method::POST,
        "/v1/node-metrics/metrics",
        Some(&token),
        Some(json!({"cpu_usage_percent": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(gateway
        .control
        .list_metrics(&node_id, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_metrics_body_is_bad_request() {
    let gateway = TestGateway::start().await;
    let node_id = NodeId::generate();
    let token = gateway.issue_token(node_id);

    for raw in ["{not json", r#"{"cpu_usage_percent": "high"}"#] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/node-metrics/metrics")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .unwrap();
        let response = gateway.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {raw}");
    }

    assert!(gateway
        .control
        .list_metrics(&node_id, 10)
        .await
        .unwrap()
        .is_empty());
}
