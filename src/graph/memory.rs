//! In-memory graph layer.
//!
//! Vertices and edges are ordinary records in a [`RecordStore`]; this type adds the
//! schema (which classes are vertex or edge classes) and the adjacency bookkeeping.

use super::model::GraphModel;
use crate::error::StorageError;
use crate::record::{RecordBody, RecordId, RecordKind, RecordRef, Snapshot};
use crate::storage::{DeleteResult, RecordStore};

use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Base classes every schema starts with.
pub const VERTEX_BASE_CLASS: &str = "V";
pub const EDGE_BASE_CLASS: &str = "E";

/// Endpoints of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEnds {
    pub out: RecordId,
    pub incoming: RecordId,
}

#[derive(Debug, Clone, Default)]
struct Adjacency {
    out: Vec<RecordId>,
    incoming: Vec<RecordId>,
}

pub struct MemoryGraph {
    store: Arc<dyn RecordStore>,
    classes: DashMap<String, RecordKind>,
    edges: DashMap<RecordId, EdgeEnds>,
    adjacency: DashMap<RecordId, Adjacency>,
    write_lock: Mutex<()>,
}

impl MemoryGraph {
    pub fn new(store: Arc<dyn RecordStore>) -> Arc<Self> {
        let classes = DashMap::new();
        classes.insert(VERTEX_BASE_CLASS.to_string(), RecordKind::Vertex);
        classes.insert(EDGE_BASE_CLASS.to_string(), RecordKind::Edge);

        Arc::new(Self {
            store,
            classes,
            edges: DashMap::new(),
            adjacency: DashMap::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Declares a schema class. Classes not declared here are plain documents.
    pub fn define_class(&self, name: &str, kind: RecordKind) {
        self.classes.insert(name.to_string(), kind);
    }

    pub fn class_kind(&self, name: &str) -> RecordKind {
        self.classes
            .get(name)
            .map(|kind| *kind)
            .unwrap_or(RecordKind::Plain)
    }

    fn unit_of_work(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("graph write lock poisoned".to_string()))
    }

    pub fn add_vertex(
        &self,
        id: RecordId,
        class_name: &str,
        content: Vec<u8>,
    ) -> Result<RecordRef, StorageError> {
        let _guard = self.unit_of_work()?;
        let created = self.store.create(id, RecordBody::new(class_name, content))?;
        self.adjacency.insert(id, Adjacency::default());
        Ok(created)
    }

    pub fn add_edge(
        &self,
        id: RecordId,
        class_name: &str,
        out: RecordId,
        incoming: RecordId,
        content: Vec<u8>,
    ) -> Result<RecordRef, StorageError> {
        let _guard = self.unit_of_work()?;
        for endpoint in [out, incoming] {
            if !self.adjacency.contains_key(&endpoint) {
                return Err(StorageError::NotFound(endpoint));
            }
        }

        let created = self.store.create(id, RecordBody::new(class_name, content))?;
        self.edges.insert(id, EdgeEnds { out, incoming });
        if let Some(mut adjacency) = self.adjacency.get_mut(&out) {
            adjacency.out.push(id);
        }
        if let Some(mut adjacency) = self.adjacency.get_mut(&incoming) {
            adjacency.incoming.push(id);
        }
        Ok(created)
    }

    pub fn edge_ends(&self, edge: RecordId) -> Option<EdgeEnds> {
        self.edges.get(&edge).map(|ends| *ends)
    }

    pub fn out_edges(&self, vertex: RecordId) -> Vec<RecordId> {
        self.adjacency
            .get(&vertex)
            .map(|adjacency| adjacency.out.clone())
            .unwrap_or_default()
    }

    pub fn in_edges(&self, vertex: RecordId) -> Vec<RecordId> {
        self.adjacency
            .get(&vertex)
            .map(|adjacency| adjacency.incoming.clone())
            .unwrap_or_default()
    }

    /// Deletes one edge, then unlinks it. Caller holds the unit-of-work guard.
    ///
    /// A refused delete leaves the adjacency untouched.
    fn detach_edge(&self, edge: RecordRef) -> Result<DeleteResult, StorageError> {
        let result = self.store.delete(edge)?;
        if let Some((_, ends)) = self.edges.remove(&edge.id) {
            if let Some(mut adjacency) = self.adjacency.get_mut(&ends.out) {
                adjacency.out.retain(|id| *id != edge.id);
            }
            if let Some(mut adjacency) = self.adjacency.get_mut(&ends.incoming) {
                adjacency.incoming.retain(|id| *id != edge.id);
            }
        }
        Ok(result)
    }

    /// Fails with `ConcurrentModification` when the stored version no longer matches.
    fn check_version(&self, record: RecordRef) -> Result<(), StorageError> {
        match self.store.load(record.id)? {
            Some(current) if !record.accepts(current.record.version) => {
                Err(StorageError::ConcurrentModification {
                    id: record.id,
                    expected: record.version,
                    actual: current.record.version,
                })
            }
            _ => Ok(()),
        }
    }
}

impl GraphModel for MemoryGraph {
    fn classify(&self, snapshot: &Snapshot) -> RecordKind {
        match &snapshot.body.class_name {
            Some(name) => self.class_kind(name),
            None => RecordKind::Plain,
        }
    }

    fn remove_edge(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError> {
        let _guard = self.unit_of_work()?;
        tracing::debug!("Removing edge {}", snapshot.record);
        self.detach_edge(snapshot.record)
    }

    fn remove_vertex(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError> {
        let _guard = self.unit_of_work()?;
        let id = snapshot.id();
        // Incident edges go first, so a stale vertex must be refused before any of them.
        self.check_version(snapshot.record)?;

        let incident: Vec<RecordId> = self
            .adjacency
            .get(&id)
            .map(|adjacency| {
                adjacency
                    .out
                    .iter()
                    .chain(adjacency.incoming.iter())
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            "Removing vertex {} with {} incident edge(s)",
            snapshot.record,
            incident.len()
        );

        for edge in incident {
            // Self-loops appear twice in the incident list.
            if self.edges.contains_key(&edge) {
                self.detach_edge(RecordRef::any_version(edge))?;
            }
        }

        let result = self.store.delete(snapshot.record)?;
        self.adjacency.remove(&id);
        Ok(result)
    }
}
