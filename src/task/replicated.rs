//! The replicated task: one closed set of kinds behind a single type.
//!
//! `ReplicatedTask` carries what every kind shares (target record, lock policy,
//! lifecycle state) and delegates the kind-specific part to a [`RecordTask`].
//! The factory id is only a tag for cross-version construction; dispatch is a match.

use super::create::CreateRecordTask;
use super::delete::DeleteRecordTask;
use super::fix::{FixDeleteRecordTask, FixUpdateRecordTask};
use super::protocol::TaskEnvelope;
use super::resurrect::ResurrectRecordTask;
use super::types::*;
use super::update::UpdateRecordTask;
use crate::cluster::ClusterManager;
use crate::error::{ReplicationError, Result, StorageError};
use crate::quorum::QuorumType;
use crate::record::{RecordBody, RecordId, RecordRef, RequestId, Snapshot};
use crate::storage::{LockToken, RecordStore};

use std::fmt;

/// Kind-specific behaviour of a replicated task.
pub(crate) trait RecordTask: fmt::Debug + Send + Sync {
    fn factory_id(&self) -> FactoryId;

    fn name(&self) -> &'static str;

    fn quorum_type(&self) -> QuorumType {
        QuorumType::Write
    }

    fn is_idempotent(&self) -> bool {
        false
    }

    /// Whether the target must exist before the mutation runs.
    fn check_record_exists(&self) -> bool {
        true
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome>;

    fn fix_task(
        &self,
        _record: &RecordRef,
        _fix: &FixContext<'_>,
        _cluster: &dyn ClusterManager,
    ) -> Result<Option<ReplicatedTask>> {
        Ok(None)
    }

    fn undo_task(
        &self,
        _record: &RecordRef,
        _cluster: &dyn ClusterManager,
        _servers: &[String],
    ) -> Result<Option<ReplicatedTask>> {
        Ok(None)
    }

    /// Pre-state captured by this instance, if any.
    fn snapshot(&self) -> Option<&Snapshot> {
        None
    }

    /// Body shipped with the task, if the kind has one.
    fn body(&self) -> Option<&RecordBody> {
        None
    }
}

#[derive(Debug, Clone)]
pub enum TaskKind {
    Create(CreateRecordTask),
    Update(UpdateRecordTask),
    Delete(DeleteRecordTask),
    Resurrect(ResurrectRecordTask),
    FixUpdate(FixUpdateRecordTask),
    FixDelete(FixDeleteRecordTask),
}

impl TaskKind {
    fn as_task(&self) -> &dyn RecordTask {
        match self {
            TaskKind::Create(task) => task,
            TaskKind::Update(task) => task,
            TaskKind::Delete(task) => task,
            TaskKind::Resurrect(task) => task,
            TaskKind::FixUpdate(task) => task,
            TaskKind::FixDelete(task) => task,
        }
    }

    fn as_task_mut(&mut self) -> &mut dyn RecordTask {
        match self {
            TaskKind::Create(task) => task,
            TaskKind::Update(task) => task,
            TaskKind::Delete(task) => task,
            TaskKind::Resurrect(task) => task,
            TaskKind::FixUpdate(task) => task,
            TaskKind::FixDelete(task) => task,
        }
    }
}

/// Releases a record lock when the delivery finishes, on every path.
struct RecordLockGuard<'a> {
    store: &'a dyn RecordStore,
    id: RecordId,
    owner: LockToken,
}

impl<'a> RecordLockGuard<'a> {
    fn acquire(
        store: &'a dyn RecordStore,
        id: RecordId,
        owner: LockToken,
    ) -> std::result::Result<Self, StorageError> {
        store.lock_record(id, owner)?;
        Ok(Self { store, id, owner })
    }
}

impl Drop for RecordLockGuard<'_> {
    fn drop(&mut self) {
        self.store.unlock_record(self.id, self.owner);
    }
}

/// The unit of replication.
#[derive(Debug, Clone)]
pub struct ReplicatedTask {
    record: RecordRef,
    kind: TaskKind,
    lock_records: bool,
    state: TaskState,
}

impl ReplicatedTask {
    fn from_kind(record: RecordRef, kind: TaskKind) -> Self {
        Self {
            record,
            kind,
            lock_records: true,
            state: TaskState::Created,
        }
    }

    pub fn create(record: RecordRef, body: RecordBody) -> Self {
        Self::from_kind(record, TaskKind::Create(CreateRecordTask::new(body)))
    }

    pub fn update(record: RecordRef, body: RecordBody) -> Self {
        Self::from_kind(record, TaskKind::Update(UpdateRecordTask::new(body)))
    }

    pub fn delete(record: RecordRef) -> Self {
        Self::from_kind(record, TaskKind::Delete(DeleteRecordTask::new()))
    }

    pub fn resurrect(snapshot: Snapshot) -> Self {
        Self::from_kind(
            snapshot.record,
            TaskKind::Resurrect(ResurrectRecordTask::new(snapshot.body)),
        )
    }

    pub fn fix_update(record: RecordRef, body: RecordBody) -> Self {
        Self::from_kind(record, TaskKind::FixUpdate(FixUpdateRecordTask::new(body)))
    }

    pub fn fix_delete(record: RecordRef) -> Self {
        Self::from_kind(record, TaskKind::FixDelete(FixDeleteRecordTask::new()))
    }

    /// Builds a built-in kind from its factory id and seed.
    pub fn from_seed(factory_id: FactoryId, mut seed: TaskSeed) -> Result<Self> {
        let record = seed.record;
        let task = match factory_id {
            CreateRecordTask::FACTORY_ID => {
                Self::create(record, seed.require_body(CreateRecordTask::NAME)?)
            }
            UpdateRecordTask::FACTORY_ID => {
                Self::update(record, seed.require_body(UpdateRecordTask::NAME)?)
            }
            DeleteRecordTask::FACTORY_ID => Self::delete(record),
            ResurrectRecordTask::FACTORY_ID => {
                let body = seed.require_body(ResurrectRecordTask::NAME)?;
                Self::resurrect(Snapshot::new(record, body))
            }
            FixUpdateRecordTask::FACTORY_ID => {
                Self::fix_update(record, seed.require_body(FixUpdateRecordTask::NAME)?)
            }
            FixDeleteRecordTask::FACTORY_ID => Self::fix_delete(record),
            other => {
                return Err(ReplicationError::UnknownTaskKind {
                    factory_id: other,
                    protocol_version: 0,
                });
            }
        };
        Ok(task.with_lock_records(seed.lock_records))
    }

    pub fn with_lock_records(mut self, lock_records: bool) -> Self {
        self.lock_records = lock_records;
        self
    }

    pub fn record(&self) -> RecordRef {
        self.record
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn factory_id(&self) -> FactoryId {
        self.kind.as_task().factory_id()
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_task().name()
    }

    pub fn quorum_type(&self) -> QuorumType {
        self.kind.as_task().quorum_type()
    }

    pub fn is_idempotent(&self) -> bool {
        self.kind.as_task().is_idempotent()
    }

    pub fn check_record_exists(&self) -> bool {
        self.kind.as_task().check_record_exists()
    }

    pub fn lock_records(&self) -> bool {
        self.lock_records
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// The captured pre-execution state, the only material an undo is built from.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.kind.as_task().snapshot()
    }

    pub fn seed(&self) -> TaskSeed {
        TaskSeed {
            record: self.record,
            body: self.kind.as_task().body().cloned(),
            lock_records: self.lock_records,
        }
    }

    pub fn to_envelope(&self, request_id: &RequestId) -> Result<TaskEnvelope> {
        TaskEnvelope::encode(self, request_id)
    }

    /// Applies the task to the local database.
    ///
    /// Storage failures propagate unchanged; nothing is retried here.
    pub fn execute(
        &mut self,
        ctx: &ExecutionContext,
        cluster: &dyn ClusterManager,
        db: &Database,
    ) -> Result<TaskOutcome> {
        if let TaskState::CompensationGenerated(_) = self.state {
            return Err(ReplicationError::InvalidState {
                task: self.name(),
                record: self.record.to_string(),
            });
        }

        tracing::debug!(
            node = cluster.local_node_name(),
            "Executing {} on {}/{} (reqId={})",
            self.name(),
            db.name,
            self.record,
            ctx.request_id
        );

        let _lock = if self.lock_records {
            Some(RecordLockGuard::acquire(
                db.store.as_ref(),
                self.record.id,
                ctx.lock_owner,
            )?)
        } else {
            None
        };

        let task = self.kind.as_task_mut();
        if task.check_record_exists() && !db.store.exists(self.record.id)? {
            return Err(StorageError::NotFound(self.record.id).into());
        }

        match task.execute_record_task(&self.record, db) {
            Ok(outcome) => {
                self.state = TaskState::Executed(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                if task.snapshot().is_some() {
                    self.state = TaskState::SnapshotCaptured;
                }
                tracing::debug!(
                    "{} on {} failed (reqId={}): {}",
                    task.name(),
                    self.record,
                    ctx.request_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Builds the task that brings `fix.target_node` in line with the majority.
    pub fn fix_task(
        &mut self,
        fix: &FixContext<'_>,
        cluster: &dyn ClusterManager,
    ) -> Result<Option<ReplicatedTask>> {
        let fix_task = self.kind.as_task().fix_task(&self.record, fix, cluster)?;

        if let Some(task) = &fix_task {
            tracing::debug!(
                "Generated fix {} for {} on node {} (reqId={})",
                task.name(),
                self.record,
                fix.target_node,
                fix.request_id
            );
            self.state = TaskState::CompensationGenerated(Compensation::Fix);
        }

        Ok(fix_task)
    }

    /// Builds the task that reverts this task's effect on `servers`.
    ///
    /// `None` when there is nothing to undo, e.g. the record was already absent.
    pub fn undo_task(
        &mut self,
        cluster: &dyn ClusterManager,
        request_id: &RequestId,
        servers: &[String],
    ) -> Result<Option<ReplicatedTask>> {
        let undo_task = self
            .kind
            .as_task()
            .undo_task(&self.record, cluster, servers)?;

        match &undo_task {
            Some(task) => {
                tracing::debug!(
                    "Generated undo {} for {} on {:?} (reqId={})",
                    task.name(),
                    self.record,
                    servers,
                    request_id
                );
                self.state = TaskState::CompensationGenerated(Compensation::Undo);
            }
            None => {
                tracing::debug!(
                    "No undo material for {} on {} (reqId={})",
                    self.name(),
                    self.record,
                    request_id
                );
            }
        }

        Ok(undo_task)
    }
}

impl fmt::Display for ReplicatedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.record)
    }
}
