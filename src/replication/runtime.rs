use crate::cluster::ClusterManager;
use crate::record::RequestId;
use crate::task::{
    Database, ExecutionContext, ReplicaResponse, ReplicatedTask, TaskEnvelope, TaskFactory,
};

use std::sync::Arc;

/// Everything one node needs to execute tasks delivered to it.
pub struct NodeRuntime {
    cluster: Arc<dyn ClusterManager>,
    factory: Arc<TaskFactory>,
    database: Database,
}

impl NodeRuntime {
    pub fn new(
        cluster: Arc<dyn ClusterManager>,
        factory: Arc<TaskFactory>,
        database: Database,
    ) -> Arc<Self> {
        Arc::new(Self {
            cluster,
            factory,
            database,
        })
    }

    pub fn node_name(&self) -> &str {
        self.cluster.local_node_name()
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterManager> {
        &self.cluster
    }

    pub fn factory(&self) -> &Arc<TaskFactory> {
        &self.factory
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Decodes and executes one delivered task.
    ///
    /// Every delivery gets its own lock owner. Errors, including a task kind this node
    /// does not know, come back as `ReplicaResponse::Failed` for the coordinator to tally.
    pub fn deliver(&self, envelope: &TaskEnvelope) -> ReplicaResponse {
        let result = self.factory.decode(envelope).and_then(|mut task| {
            let ctx = ExecutionContext::new(envelope.request_id.clone());
            task.execute(&ctx, self.cluster.as_ref(), &self.database)
        });

        if let Err(e) = &result {
            tracing::warn!(
                node = self.node_name(),
                "Delivery of task kind {} failed (reqId={}): {}",
                envelope.factory_id,
                envelope.request_id,
                e
            );
        }

        result.into()
    }

    /// Executes the coordinator's own task instance on this node, so whatever it captures
    /// for undo stays available to repair planning.
    pub fn execute_local(
        &self,
        task: &mut ReplicatedTask,
        request_id: &RequestId,
    ) -> ReplicaResponse {
        let ctx = ExecutionContext::new(request_id.clone());
        let result = task.execute(&ctx, self.cluster.as_ref(), &self.database);

        if let Err(e) = &result {
            tracing::warn!(
                node = self.node_name(),
                "Local execution of {} failed (reqId={}): {}",
                task,
                request_id,
                e
            );
        }

        result.into()
    }
}
