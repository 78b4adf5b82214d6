//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod commands;
pub mod health;
pub mod heartbeat;
pub mod jobs;
pub mod metrics;
pub mod ws;

use aura_fleet_control::{CommandId, JobId, NodeId};

use crate::error::ApiError;

/// Parse a node ID from a path segment or body field.
pub(crate) fn parse_node_id(s: &str) -> Result<NodeId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid node ID: {s}")))
}

/// Parse a job ID from a path segment.
pub(crate) fn parse_job_id(s: &str) -> Result<JobId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid job ID: {s}")))
}

/// Parse a command ID from a path segment.
pub(crate) fn parse_command_id(s: &str) -> Result<CommandId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid command ID: {s}")))
}
