//! Fix tasks: bring a divergent replica in line with the state the majority reached.
//!
//! Both kinds converge to a target state rather than replaying an operation, so
//! running them twice is harmless.

use super::delete::remove_record;
use super::replicated::{RecordTask, ReplicatedTask};
use super::types::*;
use crate::cluster::ClusterManager;
use crate::error::Result;
use crate::record::{RecordBody, RecordRef};

/// Resolves, on the target node, the fix that converges it to `good_response`.
pub(crate) fn converge_to(
    record: &RecordRef,
    body: &RecordBody,
    fix: &FixContext<'_>,
    cluster: &dyn ClusterManager,
) -> Result<Option<ReplicatedTask>> {
    let seed = match fix.good_response.key() {
        ResponseKey::Present(target) => TaskSeed::with_body(target, body.clone()),
        ResponseKey::Absent => TaskSeed::record(RecordRef::any_version(record.id)),
        ResponseKey::Failed => return Ok(None),
    };
    let factory_id = match seed.body {
        Some(_) => FixUpdateRecordTask::FACTORY_ID,
        None => FixDeleteRecordTask::FACTORY_ID,
    };

    let task = cluster
        .task_factory(fix.target_node)?
        .create_task(factory_id, seed)?;
    Ok(Some(task))
}

/// Writes the agreed body at exactly the agreed version, creating the record if needed.
#[derive(Debug, Clone)]
pub struct FixUpdateRecordTask {
    body: RecordBody,
}

impl FixUpdateRecordTask {
    pub const FACTORY_ID: FactoryId = 6;
    pub const NAME: &'static str = "fix_record_update";
    pub const SINCE_PROTOCOL: u32 = 2;

    pub fn new(body: RecordBody) -> Self {
        Self { body }
    }
}

impl RecordTask for FixUpdateRecordTask {
    fn factory_id(&self) -> FactoryId {
        Self::FACTORY_ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_idempotent(&self) -> bool {
        true
    }

    fn check_record_exists(&self) -> bool {
        false
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome> {
        db.store.put(*record, self.body.clone())?;
        Ok(TaskOutcome::Updated(*record))
    }

    fn body(&self) -> Option<&RecordBody> {
        Some(&self.body)
    }
}

/// Removes whatever incarnation occupies the record id.
#[derive(Debug, Clone, Default)]
pub struct FixDeleteRecordTask;

impl FixDeleteRecordTask {
    pub const FACTORY_ID: FactoryId = 7;
    pub const NAME: &'static str = "fix_record_delete";
    pub const SINCE_PROTOCOL: u32 = 2;

    pub fn new() -> Self {
        Self
    }
}

impl RecordTask for FixDeleteRecordTask {
    fn factory_id(&self) -> FactoryId {
        Self::FACTORY_ID
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_idempotent(&self) -> bool {
        true
    }

    fn check_record_exists(&self) -> bool {
        false
    }

    fn execute_record_task(&mut self, record: &RecordRef, db: &Database) -> Result<TaskOutcome> {
        match db.store.load(record.id)? {
            Some(current) => remove_record(db, &current),
            None => Ok(TaskOutcome::AlreadyAbsent),
        }
    }
}
