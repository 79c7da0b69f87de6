//! Storage Collaborator
//!
//! The storage engine is external to the replication layer; this module fixes its
//! boundary and ships an in-memory implementation used by the node binary and tests.
//!
//! ## Core Concepts
//! - **RecordStore**: load / create / update / put / restore / delete with expected-version checks.
//! - **Absence is not an error**: `load` returns `None` and `delete` returns `DeleteResult::NotFound`.
//! - **Locks**: owned by explicit `LockToken`s and re-entrant for the same token.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{DeleteResult, LockToken, RecordStore};
