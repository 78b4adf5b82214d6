//! Error types for the control plane.
//!
//! This module defines the errors of the job and command services and the
//! separate, absorbed class of dispatch failures.

use aura_fleet_core::{CommandId, JobId, NodeId};
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in control plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested job was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The requested command was not found.
    #[error("command not found: {0}")]
    CommandNotFound(CommandId),

    /// A required field is missing or malformed.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] aura_fleet_store::StoreError),
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::JobNotFound(_) | Self::CommandNotFound(_) => 404,
            Self::InvalidData(_) => 400,
            Self::Store(_) => 500,
        }
    }
}

/// Why a job could not be handed to a live connection.
///
/// Dispatch failures are logged by the job-creation path and never surfaced
/// to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The node has no live connection on this transport.
    #[error("node {0} is not connected")]
    NotConnected(NodeId),

    /// The node's outbound queue is full.
    #[error("outbound queue for node {0} is full")]
    Unavailable(NodeId),

    /// The execute message could not be encoded.
    #[error("failed to encode execute message: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ControlError::JobNotFound(JobId::generate()).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::CommandNotFound(CommandId::generate()).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::InvalidData("name".into()).http_status_code(),
            400
        );
        assert_eq!(
            ControlError::Store(aura_fleet_store::StoreError::Database("io".into()))
                .http_status_code(),
            500
        );
    }
}
