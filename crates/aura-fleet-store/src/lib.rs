//! `RocksDB` storage layer for aura-fleet.
//!
//! This crate provides persistent storage for node credentials, jobs, node
//! commands and node metrics. The control plane only talks to the store traits
//! defined here; [`RocksStore`] is the implementation the gateway binary ships with.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `credentials`: Node credentials, keyed by token hash
//! - `jobs`: Primary job records, keyed by `job_id`
//! - `jobs_by_node`: Index for listing a node's jobs in creation order
//! - `commands`: Primary command records, keyed by `command_id`
//! - `commands_by_node`: Unique `(node_id, name)` index pointing at the command
//! - `node_metrics`: Metrics samples, keyed by node and collection time
//!
//! # Example
//!
//! ```no_run
//! use aura_fleet_core::NodeId;
//! use aura_fleet_store::{JobStore, RocksStore};
//!
//! let store = RocksStore::open("/tmp/aura-fleet-db").unwrap();
//! let jobs = store.list_jobs_by_node(&NodeId::generate()).unwrap();
//! assert!(jobs.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    CommandKind, Job, JobStatus, MetricSample, NodeCommand, NodeCredential, NodeMetric,
    UnknownJobStatus,
};

use aura_fleet_core::{CommandId, JobId, NodeId};
use chrono::{DateTime, Utc};

/// Persistence contract for node credentials.
pub trait CredentialStore: Send + Sync {
    /// Insert or replace a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_credential(&self, credential: &NodeCredential) -> Result<()>;

    /// Look up a credential by its token hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_credential_by_hash(&self, token_hash: &str) -> Result<Option<NodeCredential>>;

    /// Mark a credential as revoked.
    ///
    /// Revoking an already revoked credential keeps the original timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no credential has this hash.
    fn revoke_credential(&self, token_hash: &str, at: DateTime<Utc>) -> Result<()>;

    /// Record that the credential was just used.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no credential has this hash.
    fn touch_credential(&self, token_hash: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Persistence contract for jobs.
pub trait JobStore: Send + Sync {
    /// Insert a new job record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert_job(&self, job: &Job) -> Result<()>;

    /// Get a job by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_job(&self, job_id: &JobId) -> Result<Option<Job>>;

    /// List a node's jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_jobs_by_node(&self, node_id: &NodeId) -> Result<Vec<Job>>;

    /// Apply a result report to a job and return the updated record.
    ///
    /// The store stamps `started_at`/`finished_at` as described by
    /// [`Job::record_result`]. The read-modify-write is atomic with respect to
    /// other updates on the same store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job doesn't exist; nothing is
    /// written in that case.
    fn update_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        output: String,
        error: String,
        at: DateTime<Utc>,
    ) -> Result<Job>;
}

/// Persistence contract for node commands.
pub trait CommandStore: Send + Sync {
    /// Insert or update a command keyed by `(node_id, name)`.
    ///
    /// On conflict the description, kind, and script path are overwritten;
    /// the stored ID and creation time are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn upsert_command(&self, command: &NodeCommand) -> Result<NodeCommand>;

    /// List a node's commands ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_commands_by_node(&self, node_id: &NodeId) -> Result<Vec<NodeCommand>>;

    /// Get a command by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_command(&self, command_id: &CommandId) -> Result<Option<NodeCommand>>;

    /// Delete a command by ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the command doesn't exist.
    fn delete_command(&self, command_id: &CommandId) -> Result<()>;
}

/// Persistence contract for node metrics samples.
pub trait MetricsStore: Send + Sync {
    /// Append a sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert_metric(&self, metric: &NodeMetric) -> Result<()>;

    /// List a node's most recent samples, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_metrics_by_node(&self, node_id: &NodeId, limit: usize) -> Result<Vec<NodeMetric>>;
}

/// Everything the gateway needs from one backing store.
pub trait Store: CredentialStore + JobStore + CommandStore + MetricsStore {}

impl<T: CredentialStore + JobStore + CommandStore + MetricsStore> Store for T {}
