use super::policy::QuorumType;
use crate::task::{ReplicaResponse, ResponseKey};

/// Outcome of tallying the replica responses of one replicated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyDecision {
    /// Enough replicas converged on the same state.
    Committed {
        winner: ReplicaResponse,
        agreeing: Vec<String>,
        /// Every node outside the winning group, with what it answered.
        divergent: Vec<(String, ReplicaResponse)>,
    },
    /// No group reached quorum. `applied` lists the nodes whose delivery changed
    /// their replica and therefore needs undoing.
    NotReached { applied: Vec<String>, acks: usize },
}

impl TallyDecision {
    pub fn is_committed(&self) -> bool {
        matches!(self, TallyDecision::Committed { .. })
    }
}

/// Groups replica responses by the state they converged to.
#[derive(Debug, Clone)]
pub struct ResponseTally {
    quorum_type: QuorumType,
    required: usize,
    responses: Vec<(String, ReplicaResponse)>,
}

impl ResponseTally {
    pub fn new(quorum_type: QuorumType, required: usize) -> Self {
        Self {
            quorum_type,
            required,
            responses: Vec::new(),
        }
    }

    pub fn record(&mut self, node: &str, response: ReplicaResponse) {
        self.responses.push((node.to_string(), response));
    }

    pub fn quorum_type(&self) -> QuorumType {
        self.quorum_type
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn responses(&self) -> &[(String, ReplicaResponse)] {
        &self.responses
    }

    /// Groups in first-seen order, as indexes into `responses`.
    fn groups(&self) -> Vec<(ResponseKey, Vec<usize>)> {
        let mut groups: Vec<(ResponseKey, Vec<usize>)> = Vec::new();
        for (index, (_, response)) in self.responses.iter().enumerate() {
            let key = response.key();
            match groups.iter_mut().find(|(group_key, _)| *group_key == key) {
                Some((_, members)) => members.push(index),
                None => groups.push((key, vec![index])),
            }
        }
        groups
    }

    pub fn decide(&self) -> TallyDecision {
        let groups = self.groups();

        let mut largest: Option<&Vec<usize>> = None;
        for (key, members) in &groups {
            if *key == ResponseKey::Failed {
                continue;
            }
            // Strictly larger, so ties keep the first group seen.
            if largest.is_none_or(|current| members.len() > current.len()) {
                largest = Some(members);
            }
        }

        match largest {
            Some(members) if members.len() >= self.required => {
                let winner = self.responses[members[0]].1.clone();
                let mut agreeing = Vec::with_capacity(members.len());
                let mut divergent = Vec::new();
                for (index, (node, response)) in self.responses.iter().enumerate() {
                    if members.contains(&index) {
                        agreeing.push(node.clone());
                    } else {
                        divergent.push((node.clone(), response.clone()));
                    }
                }
                TallyDecision::Committed {
                    winner,
                    agreeing,
                    divergent,
                }
            }
            _ => TallyDecision::NotReached {
                applied: self
                    .responses
                    .iter()
                    .filter(|(_, response)| {
                        response
                            .outcome()
                            .is_some_and(|outcome| outcome.applied_effect())
                    })
                    .map(|(node, _)| node.clone())
                    .collect(),
                acks: largest.map_or(0, Vec::len),
            },
        }
    }
}
