//! Node reports shared by both agent transports.
//!
//! The WebSocket and gRPC sessions decode their own wire formats and then
//! hand the fields to these helpers. Bad input from a node never ends the
//! session: decode failures are logged as warnings and storage failures as
//! errors.

use aura_fleet_control::{
    CommandKind, ControlError, FleetControl, Job, JobId, JobStatus, NodeCommand, NodeId,
    RegisterCommand, TransportKind,
};

/// A job result as received from a node, before parsing.
#[derive(Debug, Clone)]
pub struct RawJobResult {
    /// Job ID as sent.
    pub job_id: String,
    /// Reported status, or `None` if the transport could not express one.
    pub status: Option<JobStatus>,
    /// Output text.
    pub output: String,
    /// Error text.
    pub error: String,
}

/// A command advertisement as received from a node.
#[derive(Debug, Clone)]
pub struct RawCommand {
    /// Command name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Parsed kind; `None` means the default kind.
    pub kind: Option<CommandKind>,
    /// Script location, empty when absent.
    pub script_path: Option<String>,
}

/// Apply a job result reported over `transport`.
///
/// Returns the updated job, or `None` if the report was dropped.
pub async fn apply_job_result<C: FleetControl + ?Sized>(
    control: &C,
    transport: TransportKind,
    node_id: &NodeId,
    report: RawJobResult,
) -> Option<Job> {
    let Ok(job_id) = report.job_id.parse::<JobId>() else {
        tracing::warn!(
            transport = %transport,
            node_id = %node_id,
            job_id = %report.job_id,
            "Dropping job result with malformed job id"
        );
        return None;
    };

    let Some(status) = report.status else {
        tracing::warn!(
            transport = %transport,
            node_id = %node_id,
            job_id = %job_id,
            "Dropping job result without a usable status"
        );
        return None;
    };

    match control.get_job(&job_id).await {
        Ok(job) if job.node_id != *node_id => {
            tracing::warn!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                owner = %job.node_id,
                "Dropping job result for a job owned by another node"
            );
            return None;
        }
        Ok(_) => {}
        Err(ControlError::JobNotFound(_)) => {
            tracing::warn!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                "Job result for unknown job"
            );
            return None;
        }
        Err(e) => {
            tracing::error!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                error = %e,
                "Failed to load job for result"
            );
            return None;
        }
    }

    match control
        .report_job_result(&job_id, status, report.output, report.error)
        .await
    {
        Ok(job) => {
            tracing::debug!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                status = %job.status,
                "Job result applied"
            );
            Some(job)
        }
        Err(ControlError::JobNotFound(_)) => {
            tracing::warn!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                "Job result for unknown job"
            );
            None
        }
        Err(e) => {
            tracing::error!(
                transport = %transport,
                node_id = %node_id,
                job_id = %job_id,
                error = %e,
                "Failed to apply job result"
            );
            None
        }
    }
}

/// Register a command advertised over `transport`.
///
/// Returns the stored command, or `None` if it was rejected.
pub async fn apply_register_command<C: FleetControl + ?Sized>(
    control: &C,
    transport: TransportKind,
    node_id: &NodeId,
    command: RawCommand,
) -> Option<NodeCommand> {
    let request = RegisterCommand {
        node_id: *node_id,
        name: command.name,
        description: command.description,
        kind: command.kind,
        script_path: command.script_path,
    };
    let name = request.name.clone();

    match control.register_command(request).await {
        Ok(stored) => {
            tracing::debug!(
                transport = %transport,
                node_id = %node_id,
                command = %stored.name,
                command_id = %stored.id,
                "Command registered"
            );
            Some(stored)
        }
        Err(ControlError::InvalidData(reason)) => {
            tracing::warn!(
                transport = %transport,
                node_id = %node_id,
                command = %name,
                reason = %reason,
                "Rejected command registration"
            );
            None
        }
        Err(e) => {
            tracing::error!(
                transport = %transport,
                node_id = %node_id,
                command = %name,
                error = %e,
                "Failed to register command"
            );
            None
        }
    }
}
