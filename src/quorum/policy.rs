use serde::{Deserialize, Serialize};

/// How many replica acknowledgements an operation needs before it counts as committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuorumType {
    None,
    Read,
    Write,
    All,
}

/// Acknowledgement rule for write-quorum operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteQuorum {
    Majority,
    Fixed(usize),
    All,
}

/// Turns a quorum type into a concrete ack count for a given replica set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    pub read_quorum: usize,
    pub write_quorum: WriteQuorum,
}

impl QuorumPolicy {
    pub fn new(read_quorum: usize, write_quorum: WriteQuorum) -> Self {
        Self {
            read_quorum,
            write_quorum,
        }
    }

    /// Acks required out of `replica_count` responses.
    pub fn required_acks(&self, quorum_type: QuorumType, replica_count: usize) -> usize {
        match quorum_type {
            QuorumType::None => 0,
            QuorumType::Read => self.read_quorum.min(replica_count),
            QuorumType::Write => match self.write_quorum {
                WriteQuorum::Majority => replica_count / 2 + 1,
                WriteQuorum::Fixed(acks) => acks.min(replica_count),
                WriteQuorum::All => replica_count,
            },
            QuorumType::All => replica_count,
        }
    }
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self {
            read_quorum: 1,
            write_quorum: WriteQuorum::Majority,
        }
    }
}
