//! Replicated delete.
//!
//! Tolerates an already-absent target, yet declares itself non-idempotent: a repeated
//! delivery can hit a record that was recreated in between, so retries must be
//! deduplicated upstream.

use super::fix::FixDeleteRecordTask;
use super::replicated::{RecordTask, ReplicatedTask};
use super::resurrect::ResurrectRecordTask;
use super::snapshot::UndoSlot;
use super::types::*;
use crate::cluster::ClusterManager;
use crate::error::{Result, StorageError};
use crate::record::{RecordKind, RecordRef, Snapshot};
use crate::storage::DeleteResult;

#[derive(Debug, Clone, Default)]
pub struct DeleteRecordTask {
    undo: UndoSlot,
}

impl DeleteRecordTask {
    pub const FACTORY_ID: FactoryId = 4;
    pub const NAME: &'static str = "record_delete";
    pub const SINCE_PROTOCOL: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }
}

/// Removes a loaded record, going through the graph layer for vertices and edges.
pub(crate) fn remove_record(db: &Database, snapshot: &Snapshot) -> Result<TaskOutcome> {
    let removal = match db.graph.classify(snapshot) {
        RecordKind::Edge => db.graph.remove_edge(snapshot)?,
        RecordKind::Vertex => db.graph.remove_vertex(snapshot)?,
        RecordKind::Plain => db.store.delete(snapshot.record)?,
    };

    Ok(match removal {
        DeleteResult::Deleted => TaskOutcome::Deleted,
        DeleteResult::NotFound => TaskOutcome::AlreadyAbsent,
    })
}

impl RecordTask for DeleteRecordTask {
    fn factory_id(&self) -> FactoryId {
        Self::FACTORY_ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    // Delete is never idempotent, see module docs.
    fn is_idempotent(&self) -> bool {
        false
    }

    // Already gone is an accepted outcome.
    fn check_record_exists(&self) -> bool {
        false
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome> {
        let Some(previous) = self.undo.capture(|| db.store.load(record.id))?.cloned() else {
            return Ok(TaskOutcome::AlreadyAbsent);
        };

        if !record.accepts(previous.record.version) {
            return Err(StorageError::ConcurrentModification {
                id: record.id,
                expected: record.version,
                actual: previous.record.version,
            }
            .into());
        }

        remove_record(db, &previous)
    }

    fn fix_task(
        &self,
        record: &RecordRef,
        fix: &FixContext<'_>,
        cluster: &dyn ClusterManager,
    ) -> Result<Option<ReplicatedTask>> {
        let task = cluster
            .task_factory(fix.target_node)?
            .create_task(FixDeleteRecordTask::FACTORY_ID, TaskSeed::record(*record))?;
        Ok(Some(task))
    }

    /// Resurrects the captured snapshot at its stored version. For an `ANY_VERSION`
    /// delete the undo therefore targets a concrete version, not the original ref.
    fn undo_task(
        &self,
        _record: &RecordRef,
        cluster: &dyn ClusterManager,
        servers: &[String],
    ) -> Result<Option<ReplicatedTask>> {
        let Some(snapshot) = self.undo.snapshot() else {
            return Ok(None);
        };

        let task = cluster.task_factory_for_nodes(servers)?.create_task(
            ResurrectRecordTask::FACTORY_ID,
            TaskSeed::snapshot(snapshot.clone()).without_locks(),
        )?;
        Ok(Some(task))
    }

    fn snapshot(&self) -> Option<&Snapshot> {
        self.undo.snapshot()
    }
}
