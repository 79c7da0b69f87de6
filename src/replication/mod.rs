//! Replication and Repair
//!
//! Glue between replicated tasks, the quorum policy and the transport.
//!
//! - **`runtime`**: `NodeRuntime`, the receiving side. Decodes an envelope through the
//!   local task factory and executes it against the local database.
//! - **`repair`**: `RepairPlanner`, which asks the original task for fix and undo tasks.
//! - **`coordinator`**: `ReplicationCoordinator`, which fans a task out, tallies the
//!   answers and dispatches repair.

pub mod coordinator;
pub mod repair;
pub mod runtime;

pub use coordinator::{RepairResponse, ReplicaTransport, ReplicationCoordinator, ReplicationReport};
pub use repair::{FixAction, RepairPlan, RepairPlanner, UndoAction};
pub use runtime::NodeRuntime;
