use crate::error::StorageError;
use crate::record::{RecordBody, RecordId, RecordRef, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ownership token for record locks.
///
/// Passed explicitly through the execution context, so lock ownership does not
/// depend on which thread happens to run a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LockToken(pub uuid::Uuid);

impl LockToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a removal. A missing record is a legitimate result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    NotFound,
}

/// The storage engine as seen by replicated tasks.
///
/// Every mutation that takes a [`RecordRef`] checks its expected version against
/// the stored one and fails with `ConcurrentModification` on mismatch.
pub trait RecordStore: Send + Sync {
    /// Loads the current state of a record, `None` when it does not exist.
    fn load(&self, id: RecordId) -> Result<Option<Snapshot>, StorageError>;

    fn exists(&self, id: RecordId) -> Result<bool, StorageError> {
        Ok(self.load(id)?.is_some())
    }

    /// Creates a record at `id` with version 1.
    fn create(&self, id: RecordId, body: RecordBody) -> Result<RecordRef, StorageError>;

    /// Replaces the content of an existing record and bumps its version.
    fn update(&self, record: RecordRef, body: RecordBody) -> Result<RecordRef, StorageError>;

    /// Writes a record at exactly `record.version`, creating it when absent.
    fn put(&self, record: RecordRef, body: RecordBody) -> Result<(), StorageError>;

    /// Re-creates a record from a snapshot, keeping the snapshot's version.
    fn restore(&self, snapshot: &Snapshot) -> Result<RecordRef, StorageError>;

    fn delete(&self, record: RecordRef) -> Result<DeleteResult, StorageError>;

    /// Acquires the record lock for `owner`. Re-entrant for the same owner: every
    /// successful call must be paired with one `unlock_record`.
    fn lock_record(&self, id: RecordId, owner: LockToken) -> Result<(), StorageError>;

    /// Releases one hold if `owner` holds the lock; the lock is freed with the last one.
    fn unlock_record(&self, id: RecordId, owner: LockToken);
}
