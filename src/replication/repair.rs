//! Repair planning.
//!
//! Turns a tally decision into compensating tasks: a fix per divergent node when the
//! operation committed, one undo for every node that applied it when it did not.

use crate::cluster::ClusterManager;
use crate::error::{ReplicationError, Result};
use crate::quorum::TallyDecision;
use crate::record::RequestId;
use crate::task::{FixContext, ReplicatedTask};

use std::sync::Arc;

/// Brings one divergent node in line with the committed state.
#[derive(Debug, Clone)]
pub struct FixAction {
    pub node: String,
    pub task: ReplicatedTask,
}

/// Reverts a failed operation on every node that applied it.
#[derive(Debug, Clone)]
pub struct UndoAction {
    pub nodes: Vec<String>,
    pub task: ReplicatedTask,
}

#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    pub fixes: Vec<FixAction>,
    /// `None` when there was nothing to undo.
    pub undo: Option<UndoAction>,
    /// Nodes that cannot build the compensating task kind and are left as they are.
    pub degraded: Vec<String>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty() && self.undo.is_none()
    }
}

pub struct RepairPlanner {
    cluster: Arc<dyn ClusterManager>,
}

impl RepairPlanner {
    pub fn new(cluster: Arc<dyn ClusterManager>) -> Self {
        Self { cluster }
    }

    pub fn plan(
        &self,
        task: &mut ReplicatedTask,
        request_id: &RequestId,
        decision: &TallyDecision,
    ) -> Result<RepairPlan> {
        let mut plan = RepairPlan::default();

        match decision {
            TallyDecision::Committed {
                winner, divergent, ..
            } => {
                for (node, response) in divergent {
                    let fix = FixContext {
                        request_id,
                        bad_response: response,
                        good_response: winner,
                        target_node: node,
                    };

                    match task.fix_task(&fix, self.cluster.as_ref()) {
                        Ok(Some(fix_task)) => plan.fixes.push(FixAction {
                            node: node.clone(),
                            task: fix_task,
                        }),
                        Ok(None) => {}
                        Err(e @ ReplicationError::UnknownTaskKind { .. }) => {
                            tracing::warn!(
                                "Node {} cannot be repaired for {} (reqId={}): {}",
                                node,
                                task,
                                request_id,
                                e
                            );
                            plan.degraded.push(node.clone());
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            TallyDecision::NotReached { applied, .. } if applied.is_empty() => {
                tracing::info!(
                    "Quorum not reached for {}, nothing applied (reqId={})",
                    task,
                    request_id
                );
            }
            TallyDecision::NotReached { applied, acks } => {
                tracing::info!(
                    "Quorum not reached for {} with {} ack(s), undoing on {:?} (reqId={})",
                    task,
                    acks,
                    applied,
                    request_id
                );

                match task.undo_task(self.cluster.as_ref(), request_id, applied) {
                    Ok(Some(undo_task)) => {
                        plan.undo = Some(UndoAction {
                            nodes: applied.clone(),
                            task: undo_task,
                        })
                    }
                    Ok(None) => {}
                    Err(e @ ReplicationError::UnknownTaskKind { .. }) => {
                        tracing::warn!(
                            "Undo of {} unavailable on {:?} (reqId={}): {}",
                            task,
                            applied,
                            request_id,
                            e
                        );
                        plan.degraded.extend(applied.iter().cloned());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(plan)
    }
}
