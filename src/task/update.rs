use super::fix::{FixUpdateRecordTask, converge_to};
use super::replicated::{RecordTask, ReplicatedTask};
use super::snapshot::UndoSlot;
use super::types::*;
use crate::cluster::ClusterManager;
use crate::error::{Result, StorageError};
use crate::record::{RecordBody, RecordRef, Snapshot};

/// Replaces the content of an existing record under an expected-version check.
#[derive(Debug, Clone)]
pub struct UpdateRecordTask {
    body: RecordBody,
    undo: UndoSlot,
}

impl UpdateRecordTask {
    pub const FACTORY_ID: FactoryId = 2;
    pub const NAME: &'static str = "record_update";
    pub const SINCE_PROTOCOL: u32 = 1;

    pub fn new(body: RecordBody) -> Self {
        Self {
            body,
            undo: UndoSlot::new(),
        }
    }
}

impl RecordTask for UpdateRecordTask {
    fn factory_id(&self) -> FactoryId {
        Self::FACTORY_ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome> {
        if self.undo.capture(|| db.store.load(record.id))?.is_none() {
            return Err(StorageError::NotFound(record.id).into());
        }

        let updated = db.store.update(*record, self.body.clone())?;
        Ok(TaskOutcome::Updated(updated))
    }

    fn fix_task(
        &self,
        record: &RecordRef,
        fix: &FixContext<'_>,
        cluster: &dyn ClusterManager,
    ) -> Result<Option<ReplicatedTask>> {
        converge_to(record, &self.body, fix, cluster)
    }

    fn undo_task(
        &self,
        _record: &RecordRef,
        cluster: &dyn ClusterManager,
        servers: &[String],
    ) -> Result<Option<ReplicatedTask>> {
        let Some(previous) = self.undo.snapshot() else {
            return Ok(None);
        };

        // Writing the previous body back at its previous version reverts the update.
        let task = cluster.task_factory_for_nodes(servers)?.create_task(
            FixUpdateRecordTask::FACTORY_ID,
            TaskSeed::snapshot(previous.clone()).without_locks(),
        )?;
        Ok(Some(task))
    }

    fn snapshot(&self) -> Option<&Snapshot> {
        self.undo.snapshot()
    }

    fn body(&self) -> Option<&RecordBody> {
        Some(&self.body)
    }
}
