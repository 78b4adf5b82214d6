//! Job state machine.
//!
//! Jobs are created `pending` by the dispatch path and then mutated only by
//! result reports from the node. Transitions are deliberately permissive: a
//! report is applied whatever the current status is, only the timestamps are
//! guarded so that each is stamped at most once.

use std::sync::Arc;

use aura_fleet_core::{JobId, NodeId};
use aura_fleet_store::{CommandKind, Job, JobStatus, JobStore, StoreError};
use chrono::Utc;

use crate::error::{ControlError, Result};

/// Job lifecycle operations over a [`JobStore`].
pub struct JobService<S> {
    store: Arc<S>,
}

impl<S> Clone for JobService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: JobStore> JobService<S> {
    /// Create a job service over the given store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create and persist a pending job.
    ///
    /// A missing kind defaults to `default`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidData` if the node ID is nil or the command
    /// name is blank.
    pub fn create(
        &self,
        node_id: &NodeId,
        command_name: &str,
        command_type: Option<CommandKind>,
    ) -> Result<Job> {
        if node_id.as_uuid().is_nil() {
            return Err(ControlError::InvalidData("node_id is required".into()));
        }
        let command_name = command_name.trim();
        if command_name.is_empty() {
            return Err(ControlError::InvalidData("command_name is required".into()));
        }

        let job = Job::pending(
            *node_id,
            command_name.to_string(),
            command_type.unwrap_or_default(),
        );
        self.store.insert_job(&job)?;

        tracing::info!(
            job_id = %job.id,
            node_id = %node_id,
            command_name = %job.command_name,
            command_type = %job.command_type,
            "Created job"
        );

        Ok(job)
    }

    /// Get a job by ID.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::JobNotFound` if the job doesn't exist.
    pub fn get_by_id(&self, job_id: &JobId) -> Result<Job> {
        self.store
            .get_job(job_id)?
            .ok_or(ControlError::JobNotFound(*job_id))
    }

    /// List a node's jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_by_node(&self, node_id: &NodeId) -> Result<Vec<Job>> {
        Ok(self.store.list_jobs_by_node(node_id)?)
    }

    /// Apply a result report from the node.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::JobNotFound` if the job doesn't exist; nothing is
    /// written in that case.
    pub fn update_result(
        &self,
        job_id: &JobId,
        status: JobStatus,
        output: String,
        error: String,
    ) -> Result<Job> {
        let job = self
            .store
            .update_job_status(job_id, status, output, error, Utc::now())
            .map_err(|e| match e {
                StoreError::NotFound => ControlError::JobNotFound(*job_id),
                other => ControlError::Store(other),
            })?;

        tracing::debug!(
            job_id = %job_id,
            node_id = %job.node_id,
            status = %status,
            "Recorded job result"
        );

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_fleet_store::RocksStore;
    use tempfile::TempDir;

    fn setup() -> (JobService<RocksStore>, TempDir, NodeId) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (JobService::new(store), dir, NodeId::generate())
    }

    #[test]
    fn create_forces_pending_and_default_kind() {
        let (service, _dir, node_id) = setup();

        let job = service.create(&node_id, "restart", None).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.command_type, CommandKind::Default);
        assert_eq!(job.node_id, node_id);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());

        let stored = service.get_by_id(&job.id).unwrap();
        assert_eq!(stored, job);
    }

    #[test]
    fn create_rejects_missing_fields() {
        let (service, _dir, node_id) = setup();

        assert!(matches!(
            service.create(&node_id, "  ", None),
            Err(ControlError::InvalidData(_))
        ));
        let nil: NodeId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        assert!(matches!(
            service.create(&nil, "restart", None),
            Err(ControlError::InvalidData(_))
        ));
    }

    #[test]
    fn running_then_completed() {
        let (service, _dir, node_id) = setup();
        let job = service
            .create(&node_id, "backup", Some(CommandKind::Custom))
            .unwrap();

        let running = service
            .update_result(&job.id, JobStatus::Running, String::new(), String::new())
            .unwrap();
        let started_at = running.started_at.unwrap();
        assert!(running.finished_at.is_none());

        let done = service
            .update_result(&job.id, JobStatus::Completed, "ok".into(), String::new())
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.output, "ok");
        assert_eq!(done.started_at, Some(started_at));
        assert!(done.finished_at.is_some());
        assert_eq!(done.command_type, CommandKind::Custom);
    }

    #[test]
    fn repeated_running_keeps_first_start() {
        let (service, _dir, node_id) = setup();
        let job = service.create(&node_id, "backup", None).unwrap();

        let first = service
            .update_result(&job.id, JobStatus::Running, String::new(), String::new())
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = service
            .update_result(&job.id, JobStatus::Running, "progress".into(), String::new())
            .unwrap();

        assert_eq!(first.started_at, second.started_at);
        assert_eq!(second.output, "progress");
    }

    #[test]
    fn transitions_are_permissive() {
        // A completed job can be reported running again; the update is applied.
        let (service, _dir, node_id) = setup();
        let job = service.create(&node_id, "backup", None).unwrap();

        let done = service
            .update_result(&job.id, JobStatus::Failed, String::new(), "boom".into())
            .unwrap();
        let reopened = service
            .update_result(&job.id, JobStatus::Running, String::new(), String::new())
            .unwrap();

        assert_eq!(reopened.status, JobStatus::Running);
        assert_eq!(reopened.finished_at, done.finished_at);
        assert!(reopened.started_at.is_some());
    }

    #[test]
    fn unknown_job_is_not_found() {
        let (service, _dir, _node_id) = setup();
        let job_id = JobId::generate();

        let result =
            service.update_result(&job_id, JobStatus::Completed, String::new(), String::new());
        assert!(matches!(result, Err(ControlError::JobNotFound(id)) if id == job_id));
        assert!(matches!(
            service.get_by_id(&job_id),
            Err(ControlError::JobNotFound(_))
        ));
    }

    #[test]
    fn list_by_node_newest_first() {
        let (service, _dir, node_id) = setup();
        let first = service.create(&node_id, "a", None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = service.create(&node_id, "b", None).unwrap();
        service.create(&NodeId::generate(), "c", None).unwrap();

        let ids: Vec<_> = service
            .list_by_node(&node_id)
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
