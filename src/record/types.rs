use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Version placeholder accepted by every stored version.
pub const ANY_VERSION: i32 = -1;

/// Partition-local identity of a stored record.
///
/// `cluster` selects the partition, `position` the slot inside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub cluster: i32,
    pub position: i64,
}

impl RecordId {
    pub fn new(cluster: i32, position: i64) -> Self {
        Self { cluster, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

/// A record identity together with the version an operation expects to find.
///
/// Immutable once a task has been built from it. Storage rejects a mutation whose
/// expected version does not match the stored one, unless it is [`ANY_VERSION`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub id: RecordId,
    pub version: i32,
}

impl RecordRef {
    pub fn new(cluster: i32, position: i64, version: i32) -> Self {
        Self {
            id: RecordId::new(cluster, position),
            version,
        }
    }

    /// A reference that does not constrain the stored version.
    pub fn any_version(id: RecordId) -> Self {
        Self {
            id,
            version: ANY_VERSION,
        }
    }

    /// Optimistic-concurrency check against the version currently stored.
    pub fn accepts(&self, actual: i32) -> bool {
        self.version == ANY_VERSION || self.version == actual
    }

    pub fn with_version(self, version: i32) -> Self {
        Self {
            id: self.id,
            version,
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v.{}", self.id, self.version)
    }
}

/// Schema classification of a record, as reported by the graph collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Plain,
    Vertex,
    Edge,
}

/// Stored form of a record: its schema class (if any) and serialized content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordBody {
    pub class_name: Option<String>,
    pub content: Vec<u8>,
}

impl RecordBody {
    pub fn new(class_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            content: content.into(),
        }
    }

    /// A schemaless record.
    pub fn raw(content: impl Into<Vec<u8>>) -> Self {
        Self {
            class_name: None,
            content: content.into(),
        }
    }
}

/// The state of a record at the moment it was loaded.
///
/// `record.version` is the version stored at load time, not the one a task expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub record: RecordRef,
    pub body: RecordBody,
}

impl Snapshot {
    pub fn new(record: RecordRef, body: RecordBody) -> Self {
        Self { record, body }
    }

    pub fn id(&self) -> RecordId {
        self.record.id
    }
}

/// Identifies one replicated operation across all of its deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestId {
    pub origin: String,
    pub sequence: u64,
}

impl RequestId {
    pub fn new(origin: impl Into<String>, sequence: u64) -> Self {
        Self {
            origin: origin.into(),
            sequence,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.origin, self.sequence)
    }
}

/// Hands out monotonically increasing request ids for the local node.
#[derive(Debug)]
pub struct RequestIdGenerator {
    origin: String,
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> RequestId {
        RequestId {
            origin: self.origin.clone(),
            sequence: self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}
