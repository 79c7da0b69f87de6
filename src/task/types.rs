use crate::error::{ReplicationError, Result};
use crate::graph::GraphModel;
use crate::record::{RecordBody, RecordRef, RequestId, Snapshot};
use crate::storage::{LockToken, RecordStore};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable small integer identifying a task kind across node versions.
pub type FactoryId = u16;

/// What a delivery did on the executing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Created(RecordRef),
    Updated(RecordRef),
    Deleted,
    /// The record was not there. A success: an earlier delivery may have removed it.
    AlreadyAbsent,
}

impl TaskOutcome {
    /// State the replica converged to, used to compare answers across nodes.
    pub fn response_key(&self) -> ResponseKey {
        match self {
            TaskOutcome::Created(record) | TaskOutcome::Updated(record) => {
                ResponseKey::Present(*record)
            }
            TaskOutcome::Deleted | TaskOutcome::AlreadyAbsent => ResponseKey::Absent,
        }
    }

    /// Whether this delivery changed the replica (and so may need undoing).
    pub fn applied_effect(&self) -> bool {
        !matches!(self, TaskOutcome::AlreadyAbsent)
    }
}

/// Equivalence class of replica responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKey {
    Present(RecordRef),
    Absent,
    Failed,
}

/// One node's answer to a delivered task, as collected by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaResponse {
    Outcome(TaskOutcome),
    Failed(String),
}

impl ReplicaResponse {
    pub fn key(&self) -> ResponseKey {
        match self {
            ReplicaResponse::Outcome(outcome) => outcome.response_key(),
            ReplicaResponse::Failed(_) => ResponseKey::Failed,
        }
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        match self {
            ReplicaResponse::Outcome(outcome) => Some(outcome),
            ReplicaResponse::Failed(_) => None,
        }
    }
}

impl From<Result<TaskOutcome>> for ReplicaResponse {
    fn from(result: Result<TaskOutcome>) -> Self {
        match result {
            Ok(outcome) => ReplicaResponse::Outcome(outcome),
            Err(e) => ReplicaResponse::Failed(e.to_string()),
        }
    }
}

/// Lifecycle of one task instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Created,
    /// Pre-state was captured but the mutation did not complete.
    SnapshotCaptured,
    Executed(TaskOutcome),
    CompensationGenerated(Compensation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    Fix,
    Undo,
}

/// Per-delivery context handed to a task by the transport layer.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub request_id: RequestId,
    /// Owner used for every record lock taken during this delivery.
    pub lock_owner: LockToken,
}

impl ExecutionContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            lock_owner: LockToken::new(),
        }
    }

    pub fn with_owner(request_id: RequestId, lock_owner: LockToken) -> Self {
        Self {
            request_id,
            lock_owner,
        }
    }
}

/// Local database handle: the storage and graph collaborators of one node.
#[derive(Clone)]
pub struct Database {
    pub name: String,
    pub store: Arc<dyn RecordStore>,
    pub graph: Arc<dyn GraphModel>,
}

impl Database {
    pub fn new(name: &str, store: Arc<dyn RecordStore>, graph: Arc<dyn GraphModel>) -> Self {
        Self {
            name: name.to_string(),
            store,
            graph,
        }
    }
}

/// Constructor input shared by every task kind, and the payload of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSeed {
    pub record: RecordRef,
    pub body: Option<RecordBody>,
    pub lock_records: bool,
}

impl TaskSeed {
    pub fn record(record: RecordRef) -> Self {
        Self {
            record,
            body: None,
            lock_records: true,
        }
    }

    pub fn with_body(record: RecordRef, body: RecordBody) -> Self {
        Self {
            record,
            body: Some(body),
            lock_records: true,
        }
    }

    pub fn snapshot(snapshot: Snapshot) -> Self {
        Self::with_body(snapshot.record, snapshot.body)
    }

    /// For compensation that runs while the repair machinery already holds locks.
    pub fn without_locks(mut self) -> Self {
        self.lock_records = false;
        self
    }

    pub(crate) fn require_body(&mut self, task: &'static str) -> Result<RecordBody> {
        self.body.take().ok_or_else(|| ReplicationError::InvalidSeed {
            task,
            reason: format!("no record body for {}", self.record),
        })
    }
}

/// Arguments of a fix request: which node diverged and what the majority answered.
#[derive(Debug, Clone, Copy)]
pub struct FixContext<'a> {
    pub request_id: &'a RequestId,
    pub bad_response: &'a ReplicaResponse,
    pub good_response: &'a ReplicaResponse,
    pub target_node: &'a str,
}
