use crate::error::StorageError;
use crate::record::{RecordKind, Snapshot};
use crate::storage::DeleteResult;

/// The graph layer as seen by replicated tasks.
///
/// Removal goes through here for vertices and edges so adjacency lists stay
/// consistent. Each removal is one logical unit of work.
pub trait GraphModel: Send + Sync {
    /// Schema classification of a loaded record.
    fn classify(&self, snapshot: &Snapshot) -> RecordKind;

    /// Removes an edge and detaches it from both endpoints.
    fn remove_edge(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError>;

    /// Removes a vertex together with every incident edge.
    fn remove_vertex(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError>;
}
