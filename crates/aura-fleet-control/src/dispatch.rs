//! Transport-agnostic job dispatch.
//!
//! Each transport exposes a [`Dispatcher`]. [`MultiDispatcher`] composes them
//! into an ordered fallback chain: the first transport with a live connection
//! for the node takes the job.

use std::sync::Arc;

use aura_fleet_core::{JobId, NodeId};
use aura_fleet_store::CommandKind;

use crate::error::DispatchError;
use crate::registry::ConnectionRegistry;
use crate::types::ExecuteJob;

/// Hands an execute instruction to a node without blocking.
pub trait Dispatcher: Send + Sync {
    /// Name used when logging dispatch outcomes.
    fn name(&self) -> &str;

    /// Queue a job for execution on the node.
    ///
    /// This makes at most one attempt and never waits for queue space.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NotConnected` if the node has no live
    /// connection, `DispatchError::Unavailable` if its queue is full, and
    /// `DispatchError::Encode` if the message could not be built.
    fn dispatch_job(
        &self,
        node_id: &NodeId,
        job_id: &JobId,
        command_name: &str,
        command_type: CommandKind,
    ) -> Result<(), DispatchError>;
}

/// Builds a transport's wire message for an execute instruction.
pub trait JobEncoder: Send + Sync {
    /// The message type the transport's writer consumes.
    type Message: Send + 'static;

    /// Encode the instruction.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Encode` if serialization fails.
    fn encode(&self, job: &ExecuteJob) -> Result<Self::Message, DispatchError>;
}

/// A [`Dispatcher`] that delivers through a [`ConnectionRegistry`].
pub struct RegistryDispatcher<E: JobEncoder> {
    registry: Arc<ConnectionRegistry<E::Message>>,
    encoder: E,
}

impl<E: JobEncoder> RegistryDispatcher<E> {
    /// Create a dispatcher over a transport's registry.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry<E::Message>>, encoder: E) -> Self {
        Self { registry, encoder }
    }
}

impl<E: JobEncoder> Dispatcher for RegistryDispatcher<E> {
    fn name(&self) -> &str {
        self.registry.transport().as_str()
    }

    fn dispatch_job(
        &self,
        node_id: &NodeId,
        job_id: &JobId,
        command_name: &str,
        command_type: CommandKind,
    ) -> Result<(), DispatchError> {
        let entry = self
            .registry
            .lookup(node_id)
            .ok_or(DispatchError::NotConnected(*node_id))?;

        let message = self.encoder.encode(&ExecuteJob {
            job_id: *job_id,
            command_name: command_name.to_string(),
            command_type,
        })?;

        entry.try_send(message)?;

        tracing::debug!(
            node_id = %node_id,
            job_id = %job_id,
            transport = %entry.transport(),
            connection_id = %entry.connection_id(),
            "Queued job for node"
        );
        Ok(())
    }
}

/// Ordered fallback over several dispatchers.
///
/// Returns on the first success. If every dispatcher fails, the last error is
/// returned; an empty list reports `NotConnected`.
#[derive(Default)]
pub struct MultiDispatcher {
    dispatchers: Vec<Arc<dyn Dispatcher>>,
}

impl MultiDispatcher {
    /// Create a dispatcher that tries `dispatchers` in order.
    #[must_use]
    pub fn new(dispatchers: Vec<Arc<dyn Dispatcher>>) -> Self {
        Self { dispatchers }
    }

    /// Append a dispatcher to the end of the chain.
    #[must_use]
    pub fn with(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    /// Number of dispatchers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    /// Returns true if the chain has no dispatchers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

impl Dispatcher for MultiDispatcher {
    fn name(&self) -> &str {
        "multi"
    }

    fn dispatch_job(
        &self,
        node_id: &NodeId,
        job_id: &JobId,
        command_name: &str,
        command_type: CommandKind,
    ) -> Result<(), DispatchError> {
        let mut last_error = DispatchError::NotConnected(*node_id);
        for dispatcher in &self.dispatchers {
            match dispatcher.dispatch_job(node_id, job_id, command_name, command_type) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(
                        node_id = %node_id,
                        job_id = %job_id,
                        transport = dispatcher.name(),
                        error = %e,
                        "Dispatch attempt failed"
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
