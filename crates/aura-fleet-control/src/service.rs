//! Fleet control service implementation.
//!
//! This module provides the `FleetControl` trait and `FleetControlService`
//! implementation that the transports and the HTTP surface call into.

use std::sync::Arc;

use async_trait::async_trait;
use aura_fleet_core::{CommandId, JobId, NodeId};
use aura_fleet_store::{
    CommandKind, Job, JobStatus, MetricSample, NodeCommand, NodeMetric, Store, StoreError,
};
use chrono::Utc;

use crate::commands::CommandService;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::jobs::JobService;
use crate::types::RegisterCommand;

/// Trait defining the fleet control operations.
#[async_trait]
pub trait FleetControl: Send + Sync {
    // =========================================================================
    // Jobs
    // =========================================================================

    /// Create a pending job and try to hand it to a live connection.
    ///
    /// A dispatch failure is logged and never returned: the job is always
    /// returned once it is stored, and stays `pending` if no transport took it.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidData` for a nil node or blank command
    /// name, or a store error if the job could not be persisted.
    async fn create_and_dispatch(
        &self,
        node_id: &NodeId,
        command_name: &str,
        command_type: Option<CommandKind>,
    ) -> Result<Job>;

    /// Get a job by ID.
    async fn get_job(&self, job_id: &JobId) -> Result<Job>;

    /// List a node's jobs, newest first.
    async fn list_jobs(&self, node_id: &NodeId) -> Result<Vec<Job>>;

    /// Apply a result report received from a node.
    async fn report_job_result(
        &self,
        job_id: &JobId,
        status: JobStatus,
        output: String,
        error: String,
    ) -> Result<Job>;

    // =========================================================================
    // Commands
    // =========================================================================

    /// Insert or update a node-advertised command.
    async fn register_command(&self, request: RegisterCommand) -> Result<NodeCommand>;

    /// List a node's commands ordered by name.
    async fn list_commands(&self, node_id: &NodeId) -> Result<Vec<NodeCommand>>;

    /// Get a command by ID.
    async fn get_command(&self, command_id: &CommandId) -> Result<NodeCommand>;

    /// Delete one of the node's own commands.
    async fn delete_command(&self, node_id: &NodeId, command_id: &CommandId) -> Result<()>;

    // =========================================================================
    // Metrics
    // =========================================================================

    /// Store a sample reported by a node, stamped with the current time.
    async fn record_metrics(&self, node_id: &NodeId, sample: MetricSample) -> Result<NodeMetric>;

    /// List a node's most recent samples, newest first.
    async fn list_metrics(&self, node_id: &NodeId, limit: usize) -> Result<Vec<NodeMetric>>;

    // =========================================================================
    // Operational
    // =========================================================================

    /// Record a heartbeat by refreshing the credential's `last_seen_at`.
    async fn process_heartbeat(&self, node_id: &NodeId, token_hash: &str) -> Result<()>;
}

/// The main fleet control service implementation.
pub struct FleetControlService<S: Store> {
    store: Arc<S>,
    jobs: JobService<S>,
    commands: CommandService<S>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl<S: Store> FleetControlService<S> {
    /// Create a new fleet control service.
    #[must_use]
    pub fn new(store: Arc<S>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            jobs: JobService::new(Arc::clone(&store)),
            commands: CommandService::new(Arc::clone(&store)),
            store,
            dispatcher,
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The job state machine.
    #[must_use]
    pub const fn jobs(&self) -> &JobService<S> {
        &self.jobs
    }

    /// The command catalog.
    #[must_use]
    pub const fn commands(&self) -> &CommandService<S> {
        &self.commands
    }
}

#[async_trait]
impl<S: Store + 'static> FleetControl for FleetControlService<S> {
    async fn create_and_dispatch(
        &self,
        node_id: &NodeId,
        command_name: &str,
        command_type: Option<CommandKind>,
    ) -> Result<Job> {
        let job = self.jobs.create(node_id, command_name, command_type)?;

        let dispatched =
            self.dispatcher
                .dispatch_job(node_id, &job.id, &job.command_name, job.command_type);
        if let Err(e) = dispatched {
            tracing::warn!(
                job_id = %job.id,
                node_id = %node_id,
                error = %e,
                "Job created but not dispatched"
            );
        }

        Ok(job)
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Job> {
        self.jobs.get_by_id(job_id)
    }

    async fn list_jobs(&self, node_id: &NodeId) -> Result<Vec<Job>> {
        self.jobs.list_by_node(node_id)
    }

    async fn report_job_result(
        &self,
        job_id: &JobId,
        status: JobStatus,
        output: String,
        error: String,
    ) -> Result<Job> {
        self.jobs.update_result(job_id, status, output, error)
    }

    async fn register_command(&self, request: RegisterCommand) -> Result<NodeCommand> {
        self.commands.register(request)
    }

    async fn list_commands(&self, node_id: &NodeId) -> Result<Vec<NodeCommand>> {
        self.commands.list_by_node(node_id)
    }

    async fn get_command(&self, command_id: &CommandId) -> Result<NodeCommand> {
        self.commands.get_by_id(command_id)
    }

    async fn delete_command(&self, node_id: &NodeId, command_id: &CommandId) -> Result<()> {
        self.commands.delete_owned(node_id, command_id)
    }

    async fn record_metrics(&self, node_id: &NodeId, sample: MetricSample) -> Result<NodeMetric> {
        let metric = NodeMetric::new(*node_id, sample, Utc::now());
        self.store.insert_metric(&metric)?;

        tracing::debug!(node_id = %node_id, metric_id = %metric.id, "Stored node metrics");

        Ok(metric)
    }

    async fn list_metrics(&self, node_id: &NodeId, limit: usize) -> Result<Vec<NodeMetric>> {
        Ok(self.store.list_metrics_by_node(node_id, limit)?)
    }

    async fn process_heartbeat(&self, node_id: &NodeId, token_hash: &str) -> Result<()> {
        match self.store.touch_credential(token_hash, Utc::now()) {
            Ok(()) => {
                tracing::debug!(node_id = %node_id, "Processed heartbeat");
                Ok(())
            }
            // Sessions accepted without a stored credential have nothing to refresh.
            Err(StoreError::NotFound) => {
                tracing::debug!(node_id = %node_id, "Heartbeat without a stored credential");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
