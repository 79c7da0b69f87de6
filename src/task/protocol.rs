//! Task envelope.
//!
//! A task in transit is its factory id, the request it belongs to and its seed encoded
//! with bincode. The receiving node rebuilds it through its own [`TaskFactory`], so an
//! id it does not know surfaces as `UnknownTaskKind` instead of a decoding panic.
//!
//! [`TaskFactory`]: super::registry::TaskFactory

use super::replicated::ReplicatedTask;
use super::types::*;
use crate::error::Result;
use crate::record::RequestId;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub factory_id: FactoryId,
    pub request_id: RequestId,
    pub body: Vec<u8>,
}

impl TaskEnvelope {
    pub fn encode(task: &ReplicatedTask, request_id: &RequestId) -> Result<Self> {
        Ok(Self {
            factory_id: task.factory_id(),
            request_id: request_id.clone(),
            body: bincode::serialize(&task.seed())?,
        })
    }

    pub fn seed(&self) -> Result<TaskSeed> {
        Ok(bincode::deserialize(&self.body)?)
    }
}
