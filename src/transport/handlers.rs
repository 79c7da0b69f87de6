use super::protocol::*;
use crate::cluster::StaticCluster;
use crate::replication::{NodeRuntime, ReplicaTransport, ReplicationCoordinator};
use crate::task::ReplicaResponse;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

pub async fn handle_execute_task(
    Extension(runtime): Extension<Arc<NodeRuntime>>,
    Json(req): Json<ExecuteTaskRequest>,
) -> (StatusCode, Json<ExecuteTaskResponse>) {
    let node = runtime.node_name().to_string();
    tracing::debug!(
        "Received task kind {} (reqId={})",
        req.envelope.factory_id,
        req.envelope.request_id
    );

    // Storage and graph calls block; keep them off the async workers.
    let worker = runtime.clone();
    match tokio::task::spawn_blocking(move || worker.deliver(&req.envelope)).await {
        Ok(response) => (StatusCode::OK, Json(ExecuteTaskResponse { node, response })),
        Err(e) => {
            tracing::error!("Task execution panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecuteTaskResponse {
                    node,
                    response: ReplicaResponse::Failed(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_task_kinds(
    Extension(runtime): Extension<Arc<NodeRuntime>>,
) -> Json<TaskKindsResponse> {
    Json(TaskKindsResponse {
        node: runtime.node_name().to_string(),
        protocol_version: runtime.factory().protocol_version(),
        factory_ids: runtime.factory().factory_ids(),
    })
}

pub async fn handle_replicate<T>(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator<T>>>,
    Extension(cluster): Extension<Arc<StaticCluster>>,
    Json(req): Json<ReplicateRequest>,
) -> (StatusCode, Json<ReplicateResponse>)
where
    T: ReplicaTransport + 'static,
{
    let task = match coordinator
        .local()
        .factory()
        .create_task(req.factory_id, req.seed)
    {
        Ok(task) => task,
        Err(e) => {
            tracing::error!("Rejected replicate request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ReplicateResponse::error(e.to_string())),
            );
        }
    };

    let replicas = if req.replicas.is_empty() {
        cluster.nodes()
    } else {
        req.replicas
    };

    match coordinator.replicate(task, &replicas).await {
        Ok(report) => {
            let status = if report.is_committed() {
                StatusCode::OK
            } else {
                StatusCode::CONFLICT
            };
            (status, Json(ReplicateResponse::from(&report)))
        }
        Err(e) => {
            tracing::error!("Replication failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReplicateResponse::error(e.to_string())),
            )
        }
    }
}
