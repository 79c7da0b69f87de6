//! Record Model
//!
//! Pure value types shared by every other module: record identity, the version a
//! task expects to find, the schema class + bytes of a stored record and the
//! snapshot captured before a mutation.
//!
//! ## Core Concepts
//! - **RecordRef**: partition-local identity plus expected version (optimistic concurrency key).
//! - **Snapshot**: the pre-mutation state of a record, the only material compensation is built from.
//! - **RequestId**: correlates deliveries of one operation in logs. Never used for deduplication here.

pub mod types;

pub use types::*;
