use super::delete::DeleteRecordTask;
use super::fix::converge_to;
use super::replicated::{RecordTask, ReplicatedTask};
use super::types::*;
use crate::cluster::ClusterManager;
use crate::error::Result;
use crate::record::{RecordBody, RecordRef};

use std::sync::OnceLock;

/// Creates a record at an id chosen by the coordinator, so every replica agrees on it.
#[derive(Debug, Clone)]
pub struct CreateRecordTask {
    body: RecordBody,
    created: OnceLock<RecordRef>,
}

impl CreateRecordTask {
    pub const FACTORY_ID: FactoryId = 1;
    pub const NAME: &'static str = "record_create";
    pub const SINCE_PROTOCOL: u32 = 1;

    pub fn new(body: RecordBody) -> Self {
        Self {
            body,
            created: OnceLock::new(),
        }
    }
}

impl RecordTask for CreateRecordTask {
    fn factory_id(&self) -> FactoryId {
        Self::FACTORY_ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_record_exists(&self) -> bool {
        false
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome> {
        let created = db.store.create(record.id, self.body.clone())?;
        let _ = self.created.set(created);
        Ok(TaskOutcome::Created(created))
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
        let Some(created) = self.created.get() else {
            return Ok(None);
        };

        let task = cluster.task_factory_for_nodes(servers)?.create_task(
            DeleteRecordTask::FACTORY_ID,
            TaskSeed::record(*created).without_locks(),
        )?;
        Ok(Some(task))
    }

    fn body(&self) -> Option<&RecordBody> {
        Some(&self.body)
    }
}
