//! Future values: references to outputs that do not exist yet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GroundworkError, Result};
use crate::node::NodeId;
use crate::types::{OutputMap, OutputValue};

/// Default output selector when a declaration does not name one.
pub const DEFAULT_SELECTOR: &str = "result";

/// A reference to another node's not-yet-known output.
///
/// Resolution is pure and relies entirely on batch ordering: by the time a
/// consumer executes, every producer it references has Completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FutureValue {
    /// The node that will produce this value.
    pub producer: NodeId,

    /// Which of the producer's outputs to take.
    pub selector: String,
}

impl FutureValue {
    /// Reference the default output of `producer`.
    pub fn new(producer: NodeId) -> Self {
        Self {
            producer,
            selector: DEFAULT_SELECTOR.to_string(),
        }
    }

    /// Re-target this future at a named output of the same producer.
    pub fn select(&self, selector: impl Into<String>) -> Self {
        Self {
            producer: self.producer.clone(),
            selector: selector.into(),
        }
    }

    /// Resolve against the outputs of completed nodes.
    ///
    /// Fails with [`GroundworkError::Unresolved`] if the producer has not
    /// completed or does not expose the selected output.
    pub fn resolve(&self, completed: &HashMap<NodeId, OutputMap>) -> Result<OutputValue> {
        completed
            .get(&self.producer)
            .and_then(|outputs| outputs.get(&self.selector))
            .cloned()
            .ok_or_else(|| GroundworkError::Unresolved {
                node_id: self.producer.clone(),
                selector: self.selector.clone(),
            })
    }
}
