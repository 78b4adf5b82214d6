//! Node command catalog endpoints.
//!
//! Nodes manage their own catalog with their node token; operators can list
//! any node's catalog with the operator key.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aura_fleet_auth::TokenValidator;
use aura_fleet_control::{CommandKind, FleetControl, NodeCommand, RegisterCommand};

use super::{parse_command_id, parse_node_id};
use crate::auth::{AuthNode, OperatorAuth};
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to register a command for the calling node.
#[derive(Debug, Deserialize)]
pub struct RegisterCommandBody {
    /// Command name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// `default` or `custom`; empty or absent means `default`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Script location on the node.
    #[serde(default)]
    pub script_path: Option<String>,
}

/// Response for a single command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Command ID.
    pub id: String,
    /// Owning node.
    pub node_id: String,
    /// Command name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Command kind.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Script location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
    /// First registration.
    pub created_at: DateTime<Utc>,
}

impl From<NodeCommand> for CommandResponse {
    fn from(command: NodeCommand) -> Self {
        Self {
            id: command.id.to_string(),
            node_id: command.node_id.to_string(),
            name: command.name,
            description: command.description,
            kind: command.kind,
            script_path: command.script_path,
            created_at: command.created_at,
        }
    }
}

/// Response for a command list.
#[derive(Debug, Serialize)]
pub struct ListCommandsResponse {
    /// Commands ordered by name.
    pub commands: Vec<CommandResponse>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register or update a command for the calling node.
///
/// # Errors
///
/// Returns an error if the name or type is invalid or the upsert fails.
pub async fn register_command<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
    Json(body): Json<RegisterCommandBody>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let kind = match body.kind.as_deref() {
        None => None,
        Some(raw) => Some(
            CommandKind::parse_or_default(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid command type: {raw}")))?,
        ),
    };

    let command = state
        .control
        .register_command(RegisterCommand {
            node_id: node.node_id,
            name: body.name,
            description: body.description,
            kind,
            script_path: body.script_path,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CommandResponse::from(command))))
}

/// List the calling node's commands.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub async fn list_own_commands<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let commands = state.control.list_commands(&node.node_id).await?;
    Ok(Json(ListCommandsResponse {
        commands: commands.into_iter().map(CommandResponse::from).collect(),
    }))
}

/// Delete one of the calling node's commands.
///
/// A command owned by another node is reported as not found.
///
/// # Errors
///
/// Returns an error if the ID is malformed or the command is not the
/// caller's.
pub async fn delete_command<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    node: AuthNode,
    Path(command_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let command_id = parse_command_id(&command_id)?;
    state
        .control
        .delete_command(&node.node_id, &command_id)
        .await?;

    tracing::info!(node_id = %node.node_id, command_id = %command_id, "Command deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// List any node's commands.
///
/// # Errors
///
/// Returns an error if the node ID is malformed or the lookup fails.
pub async fn list_node_commands<C, V>(
    State(state): State<Arc<GatewayState<C, V>>>,
    _operator: OperatorAuth,
    Path(node_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    let node_id = parse_node_id(&node_id)?;
    let commands = state.control.list_commands(&node_id).await?;
    Ok(Json(ListCommandsResponse {
        commands: commands.into_iter().map(CommandResponse::from).collect(),
    }))
}
