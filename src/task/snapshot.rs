use crate::error::StorageError;
use crate::record::Snapshot;

use std::sync::OnceLock;

/// Write-once holder for the pre-mutation state of a record.
///
/// A capture that found the record absent still counts, so later captures do not
/// reload. Whatever the first capture stores is kept for the life of the task.
#[derive(Debug, Clone, Default)]
pub struct UndoSlot {
    captured: OnceLock<Option<Snapshot>>,
}

impl UndoSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `load` on the first call only and returns the captured snapshot.
    pub fn capture<F>(&self, load: F) -> Result<Option<&Snapshot>, StorageError>
    where
        F: FnOnce() -> Result<Option<Snapshot>, StorageError>,
    {
        if let Some(previous) = self.captured.get() {
            return Ok(previous.as_ref());
        }

        let loaded = load()?;
        // A concurrent capture that won keeps its value.
        let _ = self.captured.set(loaded);
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.captured.get().and_then(Option::as_ref)
    }
}
