//! Node command catalog.
//!
//! Both transports and the HTTP surface register commands through
//! [`CommandService::register`], so a command looks the same whichever path
//! advertised it.

use std::sync::Arc;

use aura_fleet_core::{CommandId, NodeId};
use aura_fleet_store::{CommandStore, NodeCommand, StoreError};
use chrono::Utc;

use crate::error::{ControlError, Result};
use crate::types::RegisterCommand;

/// Command catalog operations over a [`CommandStore`].
pub struct CommandService<S> {
    store: Arc<S>,
}

impl<S> Clone for CommandService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CommandStore> CommandService<S> {
    /// Create a command service over the given store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert or update a command keyed by `(node_id, name)`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidData` if the node ID is nil or the name is
    /// blank.
    pub fn register(&self, request: RegisterCommand) -> Result<NodeCommand> {
        if request.node_id.as_uuid().is_nil() {
            return Err(ControlError::InvalidData("node_id is required".into()));
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ControlError::InvalidData("name is required".into()));
        }

        let command = NodeCommand {
            id: CommandId::generate(),
            node_id: request.node_id,
            name: name.to_string(),
            description: request.description,
            kind: request.kind.unwrap_or_default(),
            script_path: request.script_path.filter(|p| !p.is_empty()),
            created_at: Utc::now(),
        };

        let stored = self.store.upsert_command(&command)?;

        tracing::debug!(
            node_id = %stored.node_id,
            command_id = %stored.id,
            name = %stored.name,
            kind = %stored.kind,
            "Registered node command"
        );

        Ok(stored)
    }

    /// List a node's commands ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_by_node(&self, node_id: &NodeId) -> Result<Vec<NodeCommand>> {
        Ok(self.store.list_commands_by_node(node_id)?)
    }

    /// Get a command by ID.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::CommandNotFound` if the command doesn't exist.
    pub fn get_by_id(&self, command_id: &CommandId) -> Result<NodeCommand> {
        self.store
            .get_command(command_id)?
            .ok_or(ControlError::CommandNotFound(*command_id))
    }

    /// Delete a command by ID.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::CommandNotFound` if the command doesn't exist.
    pub fn delete(&self, command_id: &CommandId) -> Result<()> {
        self.store.delete_command(command_id).map_err(|e| match e {
            StoreError::NotFound => ControlError::CommandNotFound(*command_id),
            other => ControlError::Store(other),
        })?;

        tracing::info!(command_id = %command_id, "Deleted node command");
        Ok(())
    }

    /// Delete a command only if it belongs to `node_id`.
    ///
    /// A command owned by another node is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::CommandNotFound` if the command doesn't exist or
    /// belongs to another node.
    pub fn delete_owned(&self, node_id: &NodeId, command_id: &CommandId) -> Result<()> {
        let command = self.get_by_id(command_id)?;
        if command.node_id != *node_id {
            return Err(ControlError::CommandNotFound(*command_id));
        }
        self.delete(command_id)
    }
}
