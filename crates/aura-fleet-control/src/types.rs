//! Request types for control plane operations.

use aura_fleet_core::{JobId, NodeId};
use aura_fleet_store::CommandKind;
use serde::{Deserialize, Serialize};

/// A command advertised by a node, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommand {
    /// Node advertising the command.
    pub node_id: NodeId,
    /// Command name, unique per node.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Kind of command. Defaults to `default` when absent.
    #[serde(default, rename = "type")]
    pub kind: Option<CommandKind>,
    /// Script location on the node.
    #[serde(default)]
    pub script_path: Option<String>,
}

impl RegisterCommand {
    /// Create a request for a built-in command with no description.
    #[must_use]
    pub fn new(node_id: NodeId, name: impl Into<String>) -> Self {
        Self {
            node_id,
            name: name.into(),
            description: String::new(),
            kind: None,
            script_path: None,
        }
    }
}

/// The execute instruction handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteJob {
    /// The job to execute.
    pub job_id: JobId,
    /// Name of the command to run.
    pub command_name: String,
    /// Kind of the command to run.
    pub command_type: CommandKind,
}
