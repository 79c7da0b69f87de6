//! Replicated Task Module
//!
//! The unit of replication: captures what to do to one record, executes it against the
//! local database and, when replicas disagree, produces the compensating task.
//!
//! ## Lifecycle
//! `Created -> SnapshotCaptured -> Executed(outcome) -> CompensationGenerated(Fix | Undo)`.
//! The snapshot captured before a mutation is the only undo material; there is no
//! separate log.
//!
//! ## Submodules
//! - **`replicated`**: `ReplicatedTask`, the closed set of kinds and the shared execution path.
//! - **`create` / `update` / `delete` / `resurrect` / `fix`**: kind-specific behaviour.
//! - **`registry`**: factory id -> constructor, per protocol version.
//! - **`protocol`**: the envelope a task travels in.

pub mod create;
pub mod delete;
pub mod fix;
pub mod protocol;
pub mod registry;
pub mod replicated;
pub mod resurrect;
pub mod snapshot;
pub mod types;
pub mod update;

pub use protocol::TaskEnvelope;
pub use registry::{CURRENT_PROTOCOL, TaskFactory};
pub use replicated::{ReplicatedTask, TaskKind};
pub use types::*;

#[cfg(test)]
mod tests;
