//! Task Factory Registry
//!
//! Maps the small integer factory ids agreed across the cluster to task constructors.
//! Each node runs one registry for the protocol version it speaks, which is how a
//! mixed-version cluster finds out that a peer cannot build a given task kind.

use super::create::CreateRecordTask;
use super::delete::DeleteRecordTask;
use super::fix::{FixDeleteRecordTask, FixUpdateRecordTask};
use super::protocol::TaskEnvelope;
use super::replicated::ReplicatedTask;
use super::resurrect::ResurrectRecordTask;
use super::types::*;
use super::update::UpdateRecordTask;
use crate::error::{ReplicationError, Result};

use dashmap::DashMap;
use std::sync::Arc;

/// Newest protocol version this build understands.
pub const CURRENT_PROTOCOL: u32 = 2;

/// Built-in kinds as `(factory id, name, protocol version that introduced it)`.
const BUILTIN_KINDS: [(FactoryId, &str, u32); 6] = [
    (
        CreateRecordTask::FACTORY_ID,
        CreateRecordTask::NAME,
        CreateRecordTask::SINCE_PROTOCOL,
    ),
    (
        UpdateRecordTask::FACTORY_ID,
        UpdateRecordTask::NAME,
        UpdateRecordTask::SINCE_PROTOCOL,
    ),
    (
        DeleteRecordTask::FACTORY_ID,
        DeleteRecordTask::NAME,
        DeleteRecordTask::SINCE_PROTOCOL,
    ),
    (
        ResurrectRecordTask::FACTORY_ID,
        ResurrectRecordTask::NAME,
        ResurrectRecordTask::SINCE_PROTOCOL,
    ),
    (
        FixUpdateRecordTask::FACTORY_ID,
        FixUpdateRecordTask::NAME,
        FixUpdateRecordTask::SINCE_PROTOCOL,
    ),
    (
        FixDeleteRecordTask::FACTORY_ID,
        FixDeleteRecordTask::NAME,
        FixDeleteRecordTask::SINCE_PROTOCOL,
    ),
];

/// Thread-safe task constructor.
pub type TaskConstructorFn = Arc<dyn Fn(TaskSeed) -> Result<ReplicatedTask> + Send + Sync>;

struct RegisteredKind {
    name: String,
    constructor: TaskConstructorFn,
}

pub struct TaskFactory {
    protocol_version: u32,
    kinds: DashMap<FactoryId, RegisteredKind>,
}

impl TaskFactory {
    /// Creates an empty registry.
    pub fn new(protocol_version: u32) -> Arc<Self> {
        Arc::new(Self {
            protocol_version,
            kinds: DashMap::new(),
        })
    }

    /// Registry with every built-in kind a node on `protocol_version` knows about.
    pub fn for_protocol(protocol_version: u32) -> Arc<Self> {
        let factory = Self::new(protocol_version);
        for (factory_id, name, since) in BUILTIN_KINDS {
            if since <= protocol_version {
                factory.register(factory_id, name, move |seed| {
                    ReplicatedTask::from_seed(factory_id, seed)
                });
            }
        }
        factory
    }

    /// Registers (or replaces) the constructor for a factory id.
    pub fn register<F>(&self, factory_id: FactoryId, name: &str, constructor: F)
    where
        F: Fn(TaskSeed) -> Result<ReplicatedTask> + Send + Sync + 'static,
    {
        self.kinds.insert(
            factory_id,
            RegisteredKind {
                name: name.to_string(),
                constructor: Arc::new(constructor),
            },
        );

        tracing::info!(
            "Registered task kind {} ({}) for protocol v{}",
            factory_id,
            name,
            self.protocol_version
        );
    }

    /// Builds a task of the given kind.
    ///
    /// # Returns
    /// * `Err(UnknownTaskKind)` if this registry has no constructor for `factory_id`.
    ///   The registry is left untouched.
    pub fn create_task(&self, factory_id: FactoryId, seed: TaskSeed) -> Result<ReplicatedTask> {
        let constructor = match self.kinds.get(&factory_id) {
            Some(kind) => kind.constructor.clone(),
            None => {
                tracing::warn!(
                    "Unknown task kind {} on protocol v{}",
                    factory_id,
                    self.protocol_version
                );
                return Err(ReplicationError::UnknownTaskKind {
                    factory_id,
                    protocol_version: self.protocol_version,
                });
            }
        };

        constructor(seed)
    }

    /// Decodes a task received from the transport.
    pub fn decode(&self, envelope: &TaskEnvelope) -> Result<ReplicatedTask> {
        let seed = envelope.seed()?;
        self.create_task(envelope.factory_id, seed)
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn has_kind(&self, factory_id: FactoryId) -> bool {
        self.kinds.contains_key(&factory_id)
    }

    pub fn kind_name(&self, factory_id: FactoryId) -> Option<String> {
        self.kinds.get(&factory_id).map(|kind| kind.name.clone())
    }

    /// The kinds this node advertises, sorted.
    pub fn factory_ids(&self) -> Vec<FactoryId> {
        let mut ids: Vec<FactoryId> = self.kinds.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }
}
