//! Node metrics endpoints.
//!
//! Nodes submit resource usage samples with their own token. The sample is
//! attributed to the token's node and stamped on arrival; a `node_id` or
//! `collected_at` in the body is ignored.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::{FleetControl, MetricSample, NodeMetric};

use super::parse_node_id;
use crate::auth::{AuthNode, OperatorAuth};
use crate::error::ApiError;
use crate::state::GatewayState;

/// Samples returned when the caller gives no limit.
const DEFAULT_LIST_LIMIT: usize = 100;

/// Upper bound on samples returned by one list call.
const MAX_LIST_LIMIT: usize = 1000;

/// Submission acknowledgement.
#[derive(Debug, Serialize)]
pub struct SubmitMetricsResponse {
    /// Always `"ok"`.
    pub status: &'static str,
}

/// Query parameters for listing samples.
#[derive(Debug, Default, Deserialize)]
pub struct ListMetricsQuery {
    /// Maximum number of samples, newest first.
    pub limit: Option<usize>,
}

impl ListMetricsQuery {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Response for a sample list.
#[derive(Debug, Serialize)]
pub struct ListMetricsResponse {
    /// Samples, newest first.
    pub metrics: Vec<NodeMetric>,
}

/// Store a metrics sample for the calling node.
///
/// # Errors
///
/// Returns `400` if the body is not a JSON sample, or an error if it could
/// not be stored.
pub async fn submit_metrics<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
    body: Result<Json<MetricSample>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let Json(sample) = body.map_err(|e| {
        tracing::debug!(node_id = %node.node_id, error = %e, "Rejected metrics body");
        ApiError::BadRequest("bad json".to_string())
    })?;

    state.control.record_metrics(&node.node_id, sample).await?;

    Ok((StatusCode::CREATED, Json(SubmitMetricsResponse { status: "ok" })))
}

/// List a node's recent samples.
///
/// # Errors
///
/// Returns an error if the node ID is invalid.
pub async fn list_node_metrics<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    _operator: OperatorAuth,
    Path(node_id): Path<String>,
    Query(query): Query<ListMetricsQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let node_id = parse_node_id(&node_id)?;
    let metrics = state.control.list_metrics(&node_id, query.limit()).await?;

    Ok(Json(ListMetricsResponse { metrics }))
}
