//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Node credentials, keyed by the hex token hash.
    pub const CREDENTIALS: &str = "credentials";

    /// Primary job records, keyed by `job_id`.
    pub const JOBS: &str = "jobs";

    /// Index: jobs by node, keyed by `node_id || created_at || job_id`.
    pub const JOBS_BY_NODE: &str = "jobs_by_node";

    /// Primary command records, keyed by `command_id`.
    pub const COMMANDS: &str = "commands";

    /// Unique index: commands by node, keyed by `node_id || name`, value is the `command_id`.
    pub const COMMANDS_BY_NODE: &str = "commands_by_node";

    /// Node metrics samples, keyed by `node_id || collected_at || metric_id`.
    pub const NODE_METRICS: &str = "node_metrics";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::CREDENTIALS,
        cf::JOBS,
        cf::JOBS_BY_NODE,
        cf::COMMANDS,
        cf::COMMANDS_BY_NODE,
        cf::NODE_METRICS,
    ]
}
