//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions to encode and decode keys for various indexes.
//! All keys are designed to support efficient prefix scans.

use aura_fleet_core::{CommandId, JobId, MetricId, NodeId};
use chrono::{DateTime, Utc};

/// Encode a credential key (the token hash bytes).
#[must_use]
pub fn credential_key(token_hash: &str) -> Vec<u8> {
    token_hash.as_bytes().to_vec()
}

/// Encode a job key (just the job ID bytes).
#[must_use]
pub fn job_key(job_id: &JobId) -> Vec<u8> {
    job_id.as_bytes().to_vec()
}

/// Encode a node-job index key: `node_id || created_at_millis (BE) || job_id`.
///
/// Big-endian milliseconds make a forward prefix scan return jobs oldest first.
#[must_use]
pub fn node_job_key(node_id: &NodeId, created_at: DateTime<Utc>, job_id: &JobId) -> Vec<u8> {
    // Pre-epoch timestamps clamp to zero; they never occur for freshly created jobs.
    let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(node_id.as_bytes());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(job_id.as_bytes());
    key
}

/// Encode a node-metric key: `node_id || collected_at_millis (BE) || metric_id`.
#[must_use]
pub fn node_metric_key(
    node_id: &NodeId,
    collected_at: DateTime<Utc>,
    metric_id: &MetricId,
) -> Vec<u8> {
    let millis = u64::try_from(collected_at.timestamp_millis()).unwrap_or(0);
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(node_id.as_bytes());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(metric_id.as_bytes());
    key
}

/// Encode a node prefix for scanning all jobs, commands or metrics of a node.
#[must_use]
pub fn node_prefix(node_id: &NodeId) -> Vec<u8> {
    node_id.as_bytes().to_vec()
}

/// Extract the job ID from a node-job key.
///
/// # Panics
///
/// Panics if the key is not at least 40 bytes.
#[must_use]
pub fn extract_job_id_from_node_job_key(key: &[u8]) -> JobId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[24..40]);
    JobId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// Encode a command key (just the command ID bytes).
#[must_use]
pub fn command_key(command_id: &CommandId) -> Vec<u8> {
    command_id.as_bytes().to_vec()
}

/// Encode a node-command index key: `node_id || name`.
///
/// Node IDs are fixed width, so the name needs no separator and a prefix scan
/// returns a node's commands sorted by name.
#[must_use]
pub fn node_command_key(node_id: &NodeId, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + name.len());
    key.extend_from_slice(node_id.as_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// Decode a command ID stored as an index value.
///
/// Returns `None` if the value is not 16 bytes.
#[must_use]
pub fn decode_command_id(value: &[u8]) -> Option<CommandId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(CommandId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn node_job_key_roundtrip() {
        let node_id = NodeId::generate();
        let job_id = JobId::generate();

        let key = node_job_key(&node_id, Utc::now(), &job_id);
        assert_eq!(key.len(), 40);
        assert!(key.starts_with(&node_prefix(&node_id)));
        assert_eq!(extract_job_id_from_node_job_key(&key), job_id);
    }

    #[test]
    fn node_job_keys_sort_by_creation() {
        let node_id = NodeId::generate();
        let now = Utc::now();
        let older = node_job_key(&node_id, now, &JobId::generate());
        let newer = node_job_key(&node_id, now + Duration::seconds(1), &JobId::generate());
        assert!(older < newer);
    }

    #[test]
    fn node_metric_keys_sort_by_collection() {
        let node_id = NodeId::generate();
        let now = Utc::now();
        let older = node_metric_key(&node_id, now, &MetricId::generate());
        let newer = node_metric_key(&node_id, now + Duration::milliseconds(5), &MetricId::generate());
        assert_eq!(older.len(), 40);
        assert!(older.starts_with(&node_prefix(&node_id)));
        assert!(older < newer);
    }

    #[test]
    fn node_command_keys_sort_by_name() {
        let node_id = NodeId::generate();
        let a = node_command_key(&node_id, "backup");
        let b = node_command_key(&node_id, "restart");
        assert!(a < b);
        assert!(a.starts_with(&node_prefix(&node_id)));
    }

    #[test]
    fn command_id_value_roundtrip() {
        let id = CommandId::generate();
        assert_eq!(decode_command_id(&command_key(&id)), Some(id));
        assert_eq!(decode_command_id(b"short"), None);
    }
}
