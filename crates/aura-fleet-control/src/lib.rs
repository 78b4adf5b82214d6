//! Job dispatch and connection registry for aura-fleet.
//!
//! This crate holds the transport-independent core of the fleet control
//! plane: the job state machine, the node command catalog, the per-transport
//! live connection registry, and the dispatch chain that routes a new job to
//! whichever transport the node is currently connected over.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Gateway (HTTP / WebSocket / gRPC)              │
//! └─────────────────────────────────────────────────────────────┘
//!            │ inbound results, commands       ▲ execute_job
//!            ▼                                 │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FleetControlService                      │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Job       │ │  Command    │ │   MultiDispatcher   │    │
//! │  │   State     │ │  Catalog    │ │ stream → websocket  │    │
//! │  └─────────────┘ └─────────────┘ └──────────┬──────────┘    │
//! └─────────────────────────────────────────────┼───────────────┘
//!               │                               │ try_send
//!               ▼                               ▼
//!        ┌──────────┐                 ┌────────────────────┐
//!        │  Store   │                 │ ConnectionRegistry │
//!        │ (RocksDB)│                 │   (per transport)  │
//!        └──────────┘                 └────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use aura_fleet_control::{FleetControl, FleetControlService, MultiDispatcher};
//! use aura_fleet_core::NodeId;
//! use aura_fleet_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/aura-fleet")?);
//! let control = FleetControlService::new(store, Arc::new(MultiDispatcher::default()));
//!
//! let job = control
//!     .create_and_dispatch(&NodeId::generate(), "restart", None)
//!     .await?;
//! println!("Created job: {}", job.id);
//! # Ok(())
//! # }
//! ```
//!
//! # Job Lifecycle
//!
//! Jobs start `pending` and move only on result reports from the node:
//!
//! - `running` stamps `started_at` the first time it is reported
//! - `completed` or `failed` stamps `finished_at` the first time
//! - any status may follow any other; the record is not a strict machine
//!
//! A job created while its node is offline stays `pending`; it is not
//! replayed when the node reconnects.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod commands;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod registry;
pub mod service;
pub mod types;

pub use commands::CommandService;
pub use dispatch::{Dispatcher, JobEncoder, MultiDispatcher, RegistryDispatcher};
pub use error::{ControlError, DispatchError, Result};
pub use jobs::JobService;
pub use registry::{ConnectionEntry, ConnectionRegistry};
pub use service::{FleetControl, FleetControlService};
pub use types::{ExecuteJob, RegisterCommand};

// Re-export commonly used types from dependencies for convenience
pub use aura_fleet_core::{CommandId, ConnectionId, JobId, NodeId, TransportKind};
pub use aura_fleet_store::{CommandKind, Job, JobStatus, MetricSample, NodeCommand, NodeMetric};
