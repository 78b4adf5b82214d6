//! Core types and utilities for aura-fleet.
//!
//! This crate provides the foundational types used throughout the fleet control plane:
//!
//! - **Identifiers**: Strongly-typed IDs for nodes, jobs, commands, and live connections
//! - **Transport kinds**: The names of the two agent transports
//!
//! # Example
//!
//! ```
//! use aura_fleet_core::{JobId, NodeId};
//!
//! let node_id: NodeId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//! let job_id = JobId::generate();
//! assert_ne!(job_id.to_string(), node_id.to_string());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;
pub mod transport;

pub use ids::{CommandId, ConnectionId, IdError, JobId, MetricId, NodeId};
pub use transport::TransportKind;
