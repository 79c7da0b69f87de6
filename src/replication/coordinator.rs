//! Replication Coordinator
//!
//! Sends one task to a replica set, tallies the answers against the quorum policy and
//! dispatches whatever repair the tally calls for.
//!
//! ## Local execution
//! When the coordinating node is itself a replica it runs the original task instance
//! in-process instead of decoding a copy. The snapshot that instance captures is what
//! an undo is built from; remote replicas only report outcomes.
//!
//! Local work runs on the blocking pool, like the execute endpoint does, since
//! storage and graph calls block.

use super::repair::{RepairPlan, RepairPlanner};
use super::runtime::NodeRuntime;
use crate::error::{ReplicationError, Result};
use crate::quorum::{QuorumPolicy, ResponseTally, TallyDecision};
use crate::record::{RequestId, RequestIdGenerator};
use crate::task::{ReplicaResponse, ReplicatedTask, TaskEnvelope};

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// Delivers task envelopes to remote replicas.
#[async_trait]
pub trait ReplicaTransport: Send + Sync {
    /// Executes `envelope` on `node` and returns the node's answer.
    ///
    /// An `Err` means the node could not be reached; it is tallied as a failure.
    async fn execute(&self, node: &str, envelope: &TaskEnvelope)
    -> anyhow::Result<ReplicaResponse>;
}

/// Answer to one repair delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairResponse {
    pub node: String,
    pub task: &'static str,
    pub response: ReplicaResponse,
}

#[derive(Debug)]
pub struct ReplicationReport {
    pub request_id: RequestId,
    pub decision: TallyDecision,
    pub plan: RepairPlan,
    pub repair_responses: Vec<RepairResponse>,
}

impl ReplicationReport {
    pub fn is_committed(&self) -> bool {
        self.decision.is_committed()
    }
}

pub struct ReplicationCoordinator<T: ReplicaTransport> {
    local: Arc<NodeRuntime>,
    transport: Arc<T>,
    planner: RepairPlanner,
    policy: QuorumPolicy,
    requests: RequestIdGenerator,
}

impl<T: ReplicaTransport> ReplicationCoordinator<T> {
    pub fn new(local: Arc<NodeRuntime>, transport: Arc<T>, policy: QuorumPolicy) -> Self {
        let planner = RepairPlanner::new(local.cluster().clone());
        let requests = RequestIdGenerator::new(local.node_name());

        Self {
            local,
            transport,
            planner,
            policy,
            requests,
        }
    }

    pub fn local(&self) -> &Arc<NodeRuntime> {
        &self.local
    }

    pub fn policy(&self) -> QuorumPolicy {
        self.policy
    }

    async fn send(&self, node: &str, envelope: &TaskEnvelope) -> ReplicaResponse {
        if node == self.local.node_name() {
            let runtime = self.local.clone();
            let local_envelope = envelope.clone();
            return match tokio::task::spawn_blocking(move || runtime.deliver(&local_envelope)).await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        "Local delivery failed (reqId={}): {}",
                        envelope.request_id,
                        e
                    );
                    ReplicaResponse::Failed(e.to_string())
                }
            };
        }

        match self.transport.execute(node, envelope).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    "Failed to reach node {} (reqId={}): {}",
                    node,
                    envelope.request_id,
                    e
                );
                ReplicaResponse::Failed(format!("unreachable: {}", e))
            }
        }
    }

    /// Replicates `task` to `replicas`, then repairs divergence or rolls back.
    ///
    /// Repair tasks are dispatched once; their answers are reported, never retried.
    pub async fn replicate(
        &self,
        task: ReplicatedTask,
        replicas: &[String],
    ) -> Result<ReplicationReport> {
        let request_id = self.requests.next_id();
        let envelope = task.to_envelope(&request_id)?;
        let required = self
            .policy
            .required_acks(task.quorum_type(), replicas.len());
        let local_name = self.local.node_name().to_string();

        tracing::debug!(
            "Replicating {} to {:?}, {} ack(s) required (reqId={})",
            task,
            replicas,
            required,
            request_id
        );

        let envelope_ref = &envelope;
        let remote = join_all(
            replicas
                .iter()
                .filter(|node| **node != local_name)
                .map(|node| async move { self.send(node, envelope_ref).await }),
        );

        let local_run = async {
            if !replicas.contains(&local_name) {
                return Ok::<_, ReplicationError>((task, None));
            }
            let runtime = self.local.clone();
            let local_request = request_id.clone();
            let (task, response) = tokio::task::spawn_blocking(move || {
                let mut task = task;
                let response = runtime.execute_local(&mut task, &local_request);
                (task, response)
            })
            .await?;
            Ok((task, Some(response)))
        };

        let (remote_responses, local_run) = tokio::join!(remote, local_run);
        let (mut task, mut local_response) = local_run?;
        let mut remote_responses = remote_responses.into_iter();

        let mut tally = ResponseTally::new(task.quorum_type(), required);
        for node in replicas {
            let response = if *node == local_name {
                local_response.take()
            } else {
                remote_responses.next()
            };
            if let Some(response) = response {
                tally.record(node, response);
            }
        }

        let decision = tally.decide();
        let plan = self.planner.plan(&mut task, &request_id, &decision)?;

        tracing::info!(
            "{} {} (reqId={}): {} fix(es), undo={}, degraded={:?}",
            task,
            if decision.is_committed() {
                "committed"
            } else {
                "rolled back"
            },
            request_id,
            plan.fixes.len(),
            plan.undo.is_some(),
            plan.degraded
        );

        let repair_responses = self.dispatch(&plan, &request_id).await?;

        Ok(ReplicationReport {
            request_id,
            decision,
            plan,
            repair_responses,
        })
    }

    async fn dispatch(
        &self,
        plan: &RepairPlan,
        request_id: &RequestId,
    ) -> Result<Vec<RepairResponse>> {
        let mut deliveries: Vec<(String, &'static str, TaskEnvelope)> = Vec::new();
        for fix in &plan.fixes {
            deliveries.push((
                fix.node.clone(),
                fix.task.name(),
                fix.task.to_envelope(request_id)?,
            ));
        }
        if let Some(undo) = &plan.undo {
            let envelope = undo.task.to_envelope(request_id)?;
            for node in &undo.nodes {
                deliveries.push((node.clone(), undo.task.name(), envelope.clone()));
            }
        }

        let responses = join_all(deliveries.iter().map(|(node, task, envelope)| async move {
            RepairResponse {
                node: node.clone(),
                task: *task,
                response: self.send(node, envelope).await,
            }
        }))
        .await;

        for repair in &responses {
            if let ReplicaResponse::Failed(reason) = &repair.response {
                tracing::error!(
                    "Repair {} on node {} failed (reqId={}): {}",
                    repair.task,
                    repair.node,
                    request_id,
                    reason
                );
            }
        }

        Ok(responses)
    }
}
