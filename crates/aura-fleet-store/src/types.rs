//! Domain types stored in the database.
//!
//! These types represent the persisted state of jobs, node commands, node
//! credentials and node metrics.

use std::fmt;
use std::str::FromStr;

use aura_fleet_core::{CommandId, JobId, MetricId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Distinguishes built-in agent commands from custom scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// A command built into the agent.
    #[default]
    Default,
    /// A shell script discovered by the agent under its scripts folder.
    Custom,
}

impl CommandKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Custom => "custom",
        }
    }

    /// Parse a wire value, treating an empty string as `Default`.
    ///
    /// Returns `None` for anything other than `""`, `"default"` or `"custom"`.
    #[must_use]
    pub fn parse_or_default(value: &str) -> Option<Self> {
        match value {
            "" | "default" => Some(Self::Default),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet reported as started by the node.
    Pending,
    /// The node reported that execution began.
    Running,
    /// The node reported successful completion.
    Completed,
    /// The node reported a failure.
    Failed,
}

impl JobStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown job status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// A job record stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for the job.
    pub id: JobId,
    /// Node the job is routed to.
    pub node_id: NodeId,
    /// Name of the command to execute.
    pub command_name: String,
    /// Kind of the command to execute.
    pub command_type: CommandKind,
    /// Current status.
    pub status: JobStatus,
    /// Output reported by the node.
    pub output: String,
    /// Error text reported by the node.
    pub error: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the node first reported `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// When the node first reported a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a new pending job.
    #[must_use]
    pub fn pending(node_id: NodeId, command_name: String, command_type: CommandKind) -> Self {
        Self {
            id: JobId::generate(),
            node_id,
            command_name,
            command_type,
            status: JobStatus::Pending,
            output: String::new(),
            error: String::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply a result report to the record.
    ///
    /// Any status is accepted regardless of the current one. `Running` stamps
    /// `started_at` and a terminal status stamps `finished_at`, each only if
    /// it is still unset. The node and command fields are never touched.
    pub fn record_result(
        &mut self,
        status: JobStatus,
        output: String,
        error: String,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.output = output;
        self.error = error;
        match status {
            JobStatus::Running => {
                self.started_at.get_or_insert(at);
            }
            JobStatus::Completed | JobStatus::Failed => {
                self.finished_at.get_or_insert(at);
            }
            JobStatus::Pending => {}
        }
    }
}

/// A command a node has advertised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCommand {
    /// Unique identifier for the command.
    pub id: CommandId,
    /// Node that advertised the command.
    pub node_id: NodeId,
    /// Command name, unique per node.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Built-in or custom script.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Script location on the node, only set for custom commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
    /// Creation timestamp of the first registration.
    pub created_at: DateTime<Utc>,
}

/// Resource usage measured by a node agent.
///
/// Every field defaults to zero when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSample {
    /// CPU usage in percent.
    pub cpu_usage_percent: f64,
    /// Total memory in bytes.
    pub memory_total_bytes: i64,
    /// Used memory in bytes.
    pub memory_used_bytes: i64,
    /// Available memory in bytes.
    pub memory_available_bytes: i64,
    /// Memory usage in percent.
    pub memory_usage_percent: f64,
    /// Total disk space in bytes.
    pub disk_total_bytes: i64,
    /// Used disk space in bytes.
    pub disk_used_bytes: i64,
    /// Available disk space in bytes.
    pub disk_available_bytes: i64,
    /// Disk usage in percent.
    pub disk_usage_percent: f64,
}

/// A stored metrics sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetric {
    /// Unique identifier for the sample.
    pub id: MetricId,
    /// Node the sample was reported by.
    pub node_id: NodeId,
    /// CPU usage in percent.
    pub cpu_usage_percent: f64,
    /// Total memory in bytes.
    pub memory_total_bytes: i64,
    /// Used memory in bytes.
    pub memory_used_bytes: i64,
    /// Available memory in bytes.
    pub memory_available_bytes: i64,
    /// Memory usage in percent.
    pub memory_usage_percent: f64,
    /// Total disk space in bytes.
    pub disk_total_bytes: i64,
    /// Used disk space in bytes.
    pub disk_used_bytes: i64,
    /// Available disk space in bytes.
    pub disk_available_bytes: i64,
    /// Disk usage in percent.
    pub disk_usage_percent: f64,
    /// When the gateway received the sample.
    pub collected_at: DateTime<Utc>,
    /// Creation timestamp of the record.
    pub created_at: DateTime<Utc>,
}

impl NodeMetric {
    /// Build a record for a sample received at `collected_at`.
    #[must_use]
    pub fn new(node_id: NodeId, sample: MetricSample, collected_at: DateTime<Utc>) -> Self {
        Self {
            id: MetricId::generate(),
            node_id,
            cpu_usage_percent: sample.cpu_usage_percent,
            memory_total_bytes: sample.memory_total_bytes,
            memory_used_bytes: sample.memory_used_bytes,
            memory_available_bytes: sample.memory_available_bytes,
            memory_usage_percent: sample.memory_usage_percent,
            disk_total_bytes: sample.disk_total_bytes,
            disk_used_bytes: sample.disk_used_bytes,
            disk_available_bytes: sample.disk_available_bytes,
            disk_usage_percent: sample.disk_usage_percent,
            collected_at,
            created_at: Utc::now(),
        }
    }
}

/// A hashed node bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCredential {
    /// Hex-encoded hash of the plain token.
    pub token_hash: String,
    /// Node the token is bound to.
    pub node_id: NodeId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the node authenticated a heartbeat with this token.
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Set once the token has been revoked.
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl NodeCredential {
    /// Create an active credential for a node.
    #[must_use]
    pub fn new(token_hash: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            token_hash: token_hash.into(),
            node_id,
            created_at: Utc::now(),
            last_seen_at: None,
            revoked_at: None,
        }
    }

    /// Returns true if the credential has been revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}
