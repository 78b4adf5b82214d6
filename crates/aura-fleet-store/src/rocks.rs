//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the store traits.

use std::path::Path;
use std::sync::Arc;

use aura_fleet_core::{CommandId, JobId, NodeId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{Job, JobStatus, NodeCommand, NodeCredential, NodeMetric};
use crate::{CommandStore, CredentialStore, JobStore, MetricsStore};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write operations (status updates, upserts).
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let data = Self::serialize(value)?;
        self.db.put_cf(&cf, key, data).map_err(StoreError::from)
    }

    /// Collect all keys and values in a column family that start with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf(cf_name)?;
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn update_credential<F>(&self, token_hash: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut NodeCredential),
    {
        let _guard = self.write_lock.lock();
        let key = keys::credential_key(token_hash);
        let mut credential: NodeCredential = self
            .get_value(cf::CREDENTIALS, &key)?
            .ok_or(StoreError::NotFound)?;
        update(&mut credential);
        self.put_value(cf::CREDENTIALS, &key, &credential)
    }
}

impl CredentialStore for RocksStore {
    fn put_credential(&self, credential: &NodeCredential) -> Result<()> {
        let key = keys::credential_key(&credential.token_hash);
        self.put_value(cf::CREDENTIALS, &key, credential)
    }

    fn find_credential_by_hash(&self, token_hash: &str) -> Result<Option<NodeCredential>> {
        self.get_value(cf::CREDENTIALS, &keys::credential_key(token_hash))
    }

    fn revoke_credential(&self, token_hash: &str, at: DateTime<Utc>) -> Result<()> {
        self.update_credential(token_hash, |credential| {
            credential.revoked_at.get_or_insert(at);
        })
    }

    fn touch_credential(&self, token_hash: &str, at: DateTime<Utc>) -> Result<()> {
        self.update_credential(token_hash, |credential| {
            credential.last_seen_at = Some(at);
        })
    }
}

impl JobStore for RocksStore {
    fn insert_job(&self, job: &Job) -> Result<()> {
        let cf_jobs = self.cf(cf::JOBS)?;
        let cf_by_node = self.cf(cf::JOBS_BY_NODE)?;

        let job_key = keys::job_key(&job.id);
        let node_job_key = keys::node_job_key(&job.node_id, job.created_at, &job.id);
        let value = Self::serialize(job)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_jobs, &job_key, &value);
        batch.put_cf(&cf_by_node, &node_job_key, b"");

        self.db.write(batch)?;

        Ok(())
    }

    fn get_job(&self, job_id: &JobId) -> Result<Option<Job>> {
        self.get_value(cf::JOBS, &keys::job_key(job_id))
    }

    fn list_jobs_by_node(&self, node_id: &NodeId) -> Result<Vec<Job>> {
        let prefix = keys::node_prefix(node_id);

        let mut jobs = Vec::new();
        for (key, _) in self.scan_prefix(cf::JOBS_BY_NODE, &prefix)? {
            let job_id = keys::extract_job_id_from_node_job_key(&key);
            if let Some(job) = self.get_job(&job_id)? {
                jobs.push(job);
            }
        }

        // The index is ordered oldest first.
        jobs.reverse();
        Ok(jobs)
    }

    fn update_job_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        output: String,
        error: String,
        at: DateTime<Utc>,
    ) -> Result<Job> {
        let _guard = self.write_lock.lock();

        let key = keys::job_key(job_id);
        let mut job: Job = self.get_value(cf::JOBS, &key)?.ok_or(StoreError::NotFound)?;
        job.record_result(status, output, error, at);
        self.put_value(cf::JOBS, &key, &job)?;

        Ok(job)
    }
}

impl CommandStore for RocksStore {
    fn upsert_command(&self, command: &NodeCommand) -> Result<NodeCommand> {
        let _guard = self.write_lock.lock();

        let cf_commands = self.cf(cf::COMMANDS)?;
        let cf_by_node = self.cf(cf::COMMANDS_BY_NODE)?;
        let index_key = keys::node_command_key(&command.node_id, &command.name);

        let existing = self
            .db
            .get_cf(&cf_by_node, &index_key)?
            .and_then(|value| keys::decode_command_id(&value))
            .map(|id| self.get_command(&id))
            .transpose()?
            .flatten();

        let stored = match existing {
            Some(mut current) => {
                current.description.clone_from(&command.description);
                current.kind = command.kind;
                current.script_path.clone_from(&command.script_path);
                current
            }
            None => command.clone(),
        };

        let command_key = keys::command_key(&stored.id);
        let value = Self::serialize(&stored)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_commands, &command_key, &value);
        batch.put_cf(&cf_by_node, &index_key, &command_key);

        self.db.write(batch)?;

        Ok(stored)
    }

    fn list_commands_by_node(&self, node_id: &NodeId) -> Result<Vec<NodeCommand>> {
        let prefix = keys::node_prefix(node_id);

        let mut commands = Vec::new();
        for (_, value) in self.scan_prefix(cf::COMMANDS_BY_NODE, &prefix)? {
            let Some(command_id) = keys::decode_command_id(&value) else {
                tracing::warn!(node_id = %node_id, "Skipping malformed command index entry");
                continue;
            };
            if let Some(command) = self.get_command(&command_id)? {
                commands.push(command);
            }
        }

        Ok(commands)
    }

    fn get_command(&self, command_id: &CommandId) -> Result<Option<NodeCommand>> {
        self.get_value(cf::COMMANDS, &keys::command_key(command_id))
    }

    fn delete_command(&self, command_id: &CommandId) -> Result<()> {
        let _guard = self.write_lock.lock();

        let cf_commands = self.cf(cf::COMMANDS)?;
        let cf_by_node = self.cf(cf::COMMANDS_BY_NODE)?;

        let command = self.get_command(command_id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_commands, keys::command_key(command_id));
        batch.delete_cf(
            &cf_by_node,
            keys::node_command_key(&command.node_id, &command.name),
        );

        self.db.write(batch)?;

        Ok(())
    }
}

impl MetricsStore for RocksStore {
    fn insert_metric(&self, metric: &NodeMetric) -> Result<()> {
        let key = keys::node_metric_key(&metric.node_id, metric.collected_at, &metric.id);
        self.put_value(cf::NODE_METRICS, &key, metric)
    }

    fn list_metrics_by_node(&self, node_id: &NodeId, limit: usize) -> Result<Vec<NodeMetric>> {
        let cf = self.cf(cf::NODE_METRICS)?;
        let prefix = keys::node_prefix(node_id);

        // Every metric key is the prefix plus 24 bytes, so this bound sorts
        // after all of the node's keys and before the next node's.
        let mut upper = prefix.clone();
        upper.extend_from_slice(&[0xFF; 24]);
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(upper.as_slice(), rocksdb::Direction::Reverse),
        );

        let mut metrics = Vec::new();
        for item in iter {
            if metrics.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            metrics.push(Self::deserialize(&value)?);
        }
        Ok(metrics)
    }
}
