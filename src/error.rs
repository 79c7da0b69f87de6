//! Error types for task execution and repair.
//!
//! Expected conditions (record already absent, nothing to undo) are not errors and
//! never show up here; they are ordinary return values.

use crate::record::RecordId;
use crate::task::types::FactoryId;
use thiserror::Error;

/// Result type alias for task and repair operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Failures raised by a storage or graph collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The record does not exist. Callers that tolerate absence never see this.
    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("record {0} already exists")]
    AlreadyExists(RecordId),

    /// Expected-version check failed.
    #[error("concurrent modification of record {id}: expected v.{expected}, found v.{actual}")]
    ConcurrentModification {
        id: RecordId,
        expected: i32,
        actual: i32,
    },

    #[error("record {0} is locked by another owner")]
    Locked(RecordId),

    /// I/O, corruption or an offline store.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by task construction, execution and compensation.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The resolving node does not know this task kind. Recoverable: route the
    /// repair elsewhere or report degraded capability.
    #[error("unknown task kind {factory_id} (protocol v{protocol_version})")]
    UnknownTaskKind {
        factory_id: FactoryId,
        protocol_version: u32,
    },

    #[error("unknown cluster node '{0}'")]
    UnknownNode(String),

    /// A constructor received a seed missing data its kind needs.
    #[error("cannot build {task} task: {reason}")]
    InvalidSeed { task: &'static str, reason: String },

    #[error("{task} task on {record} cannot execute after compensation was generated")]
    InvalidState { task: &'static str, record: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("task codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The blocking worker running a local execution panicked or was cancelled.
    #[error("task worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ReplicationError {
    pub fn is_unknown_task_kind(&self) -> bool {
        matches!(self, Self::UnknownTaskKind { .. })
    }
}
