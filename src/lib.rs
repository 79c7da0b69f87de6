//! Replicated Records Library
//!
//! The write path and repair layer of a partitioned, replicated record store. A write
//! travels to every replica as a task; the coordinator tallies the answers against a
//! quorum and either repairs divergent replicas or undoes the write where it applied.
//!
//! ## Architecture Modules
//!
//! - **`task`**: Replicated record tasks (create, update, delete, resurrect, fix) and the
//!   factory registry that builds them from a factory id and a seed.
//! - **`quorum`**: Quorum types, required-ack policy and the response tally.
//! - **`replication`**: Node runtime, repair planning and the replication coordinator.
//! - **`transport`**: HTTP endpoints and client for node-to-node task delivery.
//! - **`cluster`**: Which task factory each node runs.
//! - **`storage`** / **`graph`**: The record store and graph model collaborators, with
//!   in-memory implementations.
//! - **`record`**: Record identities, bodies and snapshots.
//! - **`config`**: Node configuration.

pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod quorum;
pub mod record;
pub mod replication;
pub mod storage;
pub mod task;
pub mod transport;
