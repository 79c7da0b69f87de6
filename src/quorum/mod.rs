//! Quorum Policy
//!
//! Every task kind declares a [`QuorumType`]. The coordinator turns it into a number of
//! required acknowledgements with a [`QuorumPolicy`] and decides commit or rollback by
//! feeding replica responses into a [`ResponseTally`].
//!
//! Responses are compared by the state the replica ended in, not by the exact outcome:
//! a replica that found the record already deleted agrees with one that deleted it.

pub mod policy;
pub mod tally;

pub use policy::{QuorumPolicy, QuorumType, WriteQuorum};
pub use tally::{ResponseTally, TallyDecision};
