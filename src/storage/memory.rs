//! In-memory record store.
//!
//! Records are kept in a two-level map, `cluster -> position -> record`, so that one
//! partition can be dumped or dropped without touching the others.

use super::store::{DeleteResult, LockToken, RecordStore};
use crate::error::StorageError;
use crate::record::{RecordBody, RecordId, RecordRef, Snapshot};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
struct StoredRecord {
    version: i32,
    body: RecordBody,
}

/// A held record lock. `holds` counts re-entries by the same owner.
#[derive(Debug, Clone, Copy)]
struct HeldLock {
    owner: LockToken,
    holds: u32,
}

pub struct MemoryStore {
    local_data: Arc<DashMap<i32, DashMap<i64, StoredRecord>>>,
    locks: DashMap<RecordId, HeldLock>,
    next_positions: DashMap<i32, i64>,
    online: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Simulates the store becoming unreachable; every call then fails with `Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("store is offline".to_string()))
        }
    }

    /// Reserves the next free position in a cluster.
    pub fn allocate(&self, cluster: i32) -> RecordId {
        let mut next = self.next_positions.entry(cluster).or_insert(0);
        let position = *next;
        *next += 1;
        RecordId::new(cluster, position)
    }

    fn track_position(&self, id: RecordId) {
        let mut next = self.next_positions.entry(id.cluster).or_insert(0);
        if *next <= id.position {
            *next = id.position + 1;
        }
    }

    pub fn dump_cluster(&self, cluster: i32) -> Vec<Snapshot> {
        let mut entries = Vec::new();
        if let Some(cluster_map) = self.local_data.get(&cluster) {
            for entry in cluster_map.iter() {
                entries.push(Snapshot::new(
                    RecordRef::new(cluster, *entry.key(), entry.value().version),
                    entry.value().body.clone(),
                ));
            }
        }
        entries.sort_by_key(|snapshot| snapshot.record.id);
        entries
    }

    pub fn record_count(&self) -> usize {
        self.local_data.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn lock_holder(&self, id: RecordId) -> Option<LockToken> {
        self.locks.get(&id).map(|held| held.owner)
    }

    fn insert_new(&self, id: RecordId, stored: StoredRecord) -> Result<(), StorageError> {
        let cluster_map = self.local_data.entry(id.cluster).or_default();
        match cluster_map.entry(id.position) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(stored);
                Ok(())
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            local_data: Arc::new(DashMap::new()),
            locks: DashMap::new(),
            next_positions: DashMap::new(),
            online: AtomicBool::new(true),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, id: RecordId) -> Result<Option<Snapshot>, StorageError> {
        self.ensure_online()?;

        if let Some(cluster_map) = self.local_data.get(&id.cluster)
            && let Some(stored) = cluster_map.get(&id.position)
        {
            return Ok(Some(Snapshot::new(
                RecordRef {
                    id,
                    version: stored.version,
                },
                stored.body.clone(),
            )));
        }

        Ok(None)
    }

    fn create(&self, id: RecordId, body: RecordBody) -> Result<RecordRef, StorageError> {
        self.ensure_online()?;
        self.insert_new(id, StoredRecord { version: 1, body })?;
        self.track_position(id);
        tracing::trace!("Created record {}", id);
        Ok(RecordRef { id, version: 1 })
    }

    fn update(&self, record: RecordRef, body: RecordBody) -> Result<RecordRef, StorageError> {
        self.ensure_online()?;

        let cluster_map = self
            .local_data
            .get(&record.id.cluster)
            .ok_or(StorageError::NotFound(record.id))?;
        let mut stored = cluster_map
            .get_mut(&record.id.position)
            .ok_or(StorageError::NotFound(record.id))?;

        if !record.accepts(stored.version) {
            return Err(StorageError::ConcurrentModification {
                id: record.id,
                expected: record.version,
                actual: stored.version,
            });
        }

        stored.version += 1;
        stored.body = body;
        Ok(record.with_version(stored.version))
    }

    fn put(&self, record: RecordRef, body: RecordBody) -> Result<(), StorageError> {
        self.ensure_online()?;

        let cluster_map = self.local_data.entry(record.id.cluster).or_default();
        cluster_map.insert(
            record.id.position,
            StoredRecord {
                version: record.version.max(1),
                body,
            },
        );
        drop(cluster_map);
        self.track_position(record.id);
        Ok(())
    }

    fn restore(&self, snapshot: &Snapshot) -> Result<RecordRef, StorageError> {
        self.ensure_online()?;

        let id = snapshot.id();
        let version = snapshot.record.version.max(1);
        self.insert_new(
            id,
            StoredRecord {
                version,
                body: snapshot.body.clone(),
            },
        )?;
        self.track_position(id);
        Ok(RecordRef { id, version })
    }

    fn delete(&self, record: RecordRef) -> Result<DeleteResult, StorageError> {
        self.ensure_online()?;

        let Some(cluster_map) = self.local_data.get(&record.id.cluster) else {
            return Ok(DeleteResult::NotFound);
        };

        let removed = cluster_map.remove_if(&record.id.position, |_, stored| {
            record.accepts(stored.version)
        });
        if removed.is_some() {
            return Ok(DeleteResult::Deleted);
        }

        // Either absent or the version check refused the removal.
        match cluster_map.get(&record.id.position) {
            Some(stored) => Err(StorageError::ConcurrentModification {
                id: record.id,
                expected: record.version,
                actual: stored.version,
            }),
            None => Ok(DeleteResult::NotFound),
        }
    }

    fn lock_record(&self, id: RecordId, owner: LockToken) -> Result<(), StorageError> {
        self.ensure_online()?;

        match self.locks.entry(id) {
            Entry::Occupied(mut held) if held.get().owner == owner => {
                held.get_mut().holds += 1;
                Ok(())
            }
            Entry::Occupied(_) => Err(StorageError::Locked(id)),
            Entry::Vacant(slot) => {
                slot.insert(HeldLock { owner, holds: 1 });
                Ok(())
            }
        }
    }

    fn unlock_record(&self, id: RecordId, owner: LockToken) {
        if let Entry::Occupied(mut held) = self.locks.entry(id)
            && held.get().owner == owner
        {
            held.get_mut().holds -= 1;
            if held.get().holds == 0 {
                held.remove();
            }
        }
    }
}
