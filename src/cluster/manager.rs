use crate::config::NodeConfig;
use crate::error::{ReplicationError, Result};
use crate::task::TaskFactory;

use dashmap::DashMap;
use std::sync::Arc;

/// The cluster manager as seen by replicated tasks.
///
/// Only used to resolve which task kinds a target node can build.
pub trait ClusterManager: Send + Sync {
    fn local_node_name(&self) -> &str;

    /// Factory of one node.
    fn task_factory(&self, node: &str) -> Result<Arc<TaskFactory>>;

    /// Factory every listed node understands: the one with the lowest protocol
    /// version. The local factory when `nodes` is empty.
    fn task_factory_for_nodes(&self, nodes: &[String]) -> Result<Arc<TaskFactory>>;
}

/// Cluster view with a fixed set of nodes and the protocol each one advertised.
pub struct StaticCluster {
    local_node: String,
    factories: DashMap<String, Arc<TaskFactory>>,
}

impl StaticCluster {
    pub fn new(local_node: &str, local_factory: Arc<TaskFactory>) -> Arc<Self> {
        let factories = DashMap::new();
        factories.insert(local_node.to_string(), local_factory);

        Arc::new(Self {
            local_node: local_node.to_string(),
            factories,
        })
    }

    /// Local node plus every configured peer at the protocol it is expected to speak.
    pub fn from_config(config: &NodeConfig, local_factory: Arc<TaskFactory>) -> Arc<Self> {
        let cluster = Self::new(&config.node_name, local_factory);
        for peer in &config.peers {
            cluster.advertise(&peer.name, TaskFactory::for_protocol(peer.protocol_version));
        }
        cluster
    }

    /// Records the factory a node advertised (on join or after an upgrade).
    pub fn advertise(&self, node: &str, factory: Arc<TaskFactory>) {
        tracing::info!(
            "Node {} advertises protocol v{} ({} task kinds)",
            node,
            factory.protocol_version(),
            factory.kind_count()
        );
        self.factories.insert(node.to_string(), factory);
    }

    pub fn forget(&self, node: &str) {
        if node != self.local_node {
            self.factories.remove(node);
        }
    }

    /// All known node names, sorted.
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self
            .factories
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        nodes.sort();
        nodes
    }
}

impl ClusterManager for StaticCluster {
    fn local_node_name(&self) -> &str {
        &self.local_node
    }

    fn task_factory(&self, node: &str) -> Result<Arc<TaskFactory>> {
        self.factories
            .get(node)
            .map(|factory| factory.clone())
            .ok_or_else(|| ReplicationError::UnknownNode(node.to_string()))
    }

    fn task_factory_for_nodes(&self, nodes: &[String]) -> Result<Arc<TaskFactory>> {
        if nodes.is_empty() {
            return self.task_factory(&self.local_node);
        }

        let mut lowest: Option<Arc<TaskFactory>> = None;
        for node in nodes {
            let factory = self.task_factory(node)?;
            let replace = lowest
                .as_ref()
                .is_none_or(|current| factory.protocol_version() < current.protocol_version());
            if replace {
                lowest = Some(factory);
            }
        }

        lowest.ok_or_else(|| ReplicationError::UnknownNode(String::new()))
    }
}
