//! gRPC agent transport.
//!
//! Nodes open one long-lived `Attach` stream. Execute instructions are
//! queued on the connection's registry entry and the queue itself is the
//! response stream, so tonic's response drain is the forwarding task.

mod service;

pub use service::NodeAgentGrpc;

use aura_fleet_control::{CommandKind, DispatchError, ExecuteJob, JobEncoder, JobStatus};

use crate::proto;
use crate::proto::server_message::Payload;

/// Generated status enum, named apart from the domain `JobStatus`.
pub use crate::proto::JobStatus as ProtoJobStatus;

/// Map a command kind onto the wire enum.
#[must_use]
pub const fn command_kind_to_proto(kind: CommandKind) -> proto::CommandType {
    match kind {
        CommandKind::Default => proto::CommandType::Default,
        CommandKind::Custom => proto::CommandType::Custom,
    }
}

/// Map a wire command type onto the domain kind.
///
/// Returns `None` for values this server does not know.
#[must_use]
pub fn command_kind_from_proto(value: i32) -> Option<CommandKind> {
    match proto::CommandType::try_from(value).ok()? {
        proto::CommandType::Default => Some(CommandKind::Default),
        proto::CommandType::Custom => Some(CommandKind::Custom),
    }
}

/// Map a wire job status onto the domain status.
///
/// `UNSPECIFIED` and unknown values yield `None`; such reports are dropped
/// rather than guessed at.
#[must_use]
pub fn job_status_from_proto(value: i32) -> Option<JobStatus> {
    match ProtoJobStatus::try_from(value).ok()? {
        ProtoJobStatus::Unspecified => None,
        ProtoJobStatus::Pending => Some(JobStatus::Pending),
        ProtoJobStatus::Running => Some(JobStatus::Running),
        ProtoJobStatus::Completed => Some(JobStatus::Completed),
        ProtoJobStatus::Failed => Some(JobStatus::Failed),
    }
}

/// Encodes execute instructions as stream messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamJobEncoder;

impl JobEncoder for StreamJobEncoder {
    type Message = proto::ServerMessage;

    fn encode(&self, job: &ExecuteJob) -> Result<proto::ServerMessage, DispatchError> {
        Ok(proto::ServerMessage {
            payload: Some(Payload::ExecuteJob(proto::ExecuteJobPayload {
                job_id: job.job_id.to_string(),
                command_name: job.command_name.clone(),
                command_type: i32::from(command_kind_to_proto(job.command_type)),
            })),
        })
    }
}
