//! Operator job endpoints.
//!
//! Creating a job stores it and hands it to whichever transport the node is
//! connected over. A node that is offline simply leaves the job `pending`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::{CommandKind, FleetControl, Job, JobStatus};

use super::{parse_job_id, parse_node_id};
use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to create a job.
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Target node.
    pub node_id: String,
    /// Command to run.
    pub command_name: String,
    /// `default` or `custom`; empty or absent means `default`.
    #[serde(default)]
    pub command_type: Option<String>,
}

/// Response for a single job.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    /// Job ID.
    pub id: String,
    /// Target node.
    pub node_id: String,
    /// Command name.
    pub command_name: String,
    /// Command kind.
    pub command_type: CommandKind,
    /// Current status.
    pub status: JobStatus,
    /// Output reported by the node.
    pub output: String,
    /// Error text reported by the node.
    pub error: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// First `running` report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// First terminal report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            node_id: job.node_id.to_string(),
            command_name: job.command_name,
            command_type: job.command_type,
            status: job.status,
            output: job.output,
            error: job.error,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// Response for a job list.
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    /// Jobs, newest first.
    pub jobs: Vec<JobResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a job and dispatch it to the node.
///
/// # Errors
///
/// Returns an error if the node ID, command name, or command type is invalid,
/// or if the job could not be stored.
pub async fn create_job<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    _operator: OperatorAuth,
    Json(body): Json<CreateJobBody>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let node_id = parse_node_id(&body.node_id)?;
    let command_type = match body.command_type.as_deref() {
        None => None,
        Some(raw) => Some(
            CommandKind::parse_or_default(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid command type: {raw}")))?,
        ),
    };

    let job = state
        .control
        .create_and_dispatch(&node_id, &body.command_name, command_type)
        .await?;

    tracing::info!(
        job_id = %job.id,
        node_id = %node_id,
        command = %job.command_name,
        "Job created"
    );

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

/// Get a job by ID.
///
/// # Errors
///
/// Returns an error if the ID is malformed or the job doesn't exist.
pub async fn get_job<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    _operator: OperatorAuth,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let job_id = parse_job_id(&job_id)?;
    let job = state.control.get_job(&job_id).await?;
    Ok(Json(JobResponse::from(job)))
}

/// List a node's jobs, newest first.
///
/// # Errors
///
/// Returns an error if the node ID is malformed or the lookup fails.
pub async fn list_node_jobs<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    _operator: OperatorAuth,
    Path(node_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let node_id = parse_node_id(&node_id)?;
    let jobs = state.control.list_jobs(&node_id).await?;

    Ok(Json(ListJobsResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
    }))
}
