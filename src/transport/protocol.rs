//! Network Protocol Definitions
//!
//! DTOs exchanged over HTTP between nodes, and the endpoints they travel on.

use crate::record::RequestId;
use crate::replication::ReplicationReport;
use crate::task::{FactoryId, ReplicaResponse, TaskEnvelope, TaskSeed};
use serde::{Deserialize, Serialize};

pub const ENDPOINT_EXECUTE_TASK: &str = "/internal/task";
pub const ENDPOINT_TASK_KINDS: &str = "/internal/task_kinds";
pub const ENDPOINT_REPLICATE: &str = "/replicate";

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteTaskRequest {
    pub envelope: TaskEnvelope,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteTaskResponse {
    pub node: String,
    pub response: ReplicaResponse,
}

/// Task kinds a node can build, so peers can pick compatible compensation.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskKindsResponse {
    pub node: String,
    pub protocol_version: u32,
    pub factory_ids: Vec<FactoryId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateRequest {
    pub factory_id: FactoryId,
    pub seed: TaskSeed,
    /// Empty means every known node.
    #[serde(default)]
    pub replicas: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepairResult {
    pub node: String,
    pub task: String,
    pub response: ReplicaResponse,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub request_id: Option<RequestId>,
    pub committed: bool,
    pub fixed_nodes: Vec<String>,
    pub undone_nodes: Vec<String>,
    pub degraded_nodes: Vec<String>,
    pub repairs: Vec<RepairResult>,
    pub error: Option<String>,
}

impl ReplicateResponse {
    pub fn error(message: String) -> Self {
        Self {
            error: Some(message),
            ..Default::default()
        }
    }
}

impl From<&ReplicationReport> for ReplicateResponse {
    fn from(report: &ReplicationReport) -> Self {
        Self {
            request_id: Some(report.request_id.clone()),
            committed: report.is_committed(),
            fixed_nodes: report
                .plan
                .fixes
                .iter()
                .map(|fix| fix.node.clone())
                .collect(),
            undone_nodes: report
                .plan
                .undo
                .as_ref()
                .map(|undo| undo.nodes.clone())
                .unwrap_or_default(),
            degraded_nodes: report.plan.degraded.clone(),
            repairs: report
                .repair_responses
                .iter()
                .map(|repair| RepairResult {
                    node: repair.node.clone(),
                    task: repair.task.to_string(),
                    response: repair.response.clone(),
                })
                .collect(),
            error: None,
        }
    }
}
