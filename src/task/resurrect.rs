use super::fix::converge_to;
use super::replicated::{RecordTask, ReplicatedTask};
use super::types::*;
use crate::cluster::ClusterManager;
use crate::error::{Result, StorageError};
use crate::record::{RecordBody, RecordRef, Snapshot};

/// Re-creates a deleted record from its captured snapshot, keeping its version.
#[derive(Debug, Clone)]
pub struct ResurrectRecordTask {
    body: RecordBody,
}

impl ResurrectRecordTask {
    pub const FACTORY_ID: FactoryId = 5;
    pub const NAME: &'static str = "record_resurrect";
    pub const SINCE_PROTOCOL: u32 = 1;

    pub fn new(body: RecordBody) -> Self {
        Self { body }
    }
}

impl RecordTask for ResurrectRecordTask {
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
        let snapshot = Snapshot::new(*record, self.body.clone());

        match db.store.restore(&snapshot) {
            Ok(restored) => Ok(TaskOutcome::Created(restored)),
            Err(StorageError::AlreadyExists(id)) => match db.store.load(id)? {
                // A previous delivery already put it back.
                Some(current) if current.body == snapshot.body => {
                    Ok(TaskOutcome::Created(current.record))
                }
                _ => Err(StorageError::AlreadyExists(id).into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    fn fix_task(
        &self,
        record: &RecordRef,
        fix: &FixContext<'_>,
        cluster: &dyn ClusterManager,
    ) -> Result<Option<ReplicatedTask>> {
        converge_to(record, &self.body, fix, cluster)
    }

    fn body(&self) -> Option<&RecordBody> {
        Some(&self.body)
    }
}
