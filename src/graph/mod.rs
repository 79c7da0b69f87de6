//! Graph-Model Collaborator
//!
//! Deleting a vertex or edge record with a raw delete would leave dangling adjacency
//! references. Tasks therefore ask this layer to `classify` a snapshot first and then
//! dispatch to `remove_edge` / `remove_vertex`, falling back to a raw delete only for
//! plain records.

pub mod memory;
pub mod model;

pub use memory::MemoryGraph;
pub use model::GraphModel;
