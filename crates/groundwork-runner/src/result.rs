//! Run results.

use std::collections::HashMap;

use groundwork_core::{
    FailureReason, Module, NodeId, OutputMap, OutputValue, Result,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal disposition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every planned node completed.
    Success,
    /// At least one node failed; later batches were not started.
    Failed,
    /// The run was cancelled before completing.
    Cancelled,
}

/// One node's failure, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node_id: NodeId,
    pub reason: FailureReason,
}

/// What a run produced: partial or complete outputs plus structured
/// failures. The caller decides whether to resume, abandon, or retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub outcome: RunOutcome,

    /// Outputs of every node that reached Completed, including nodes
    /// completed by an earlier attempt and skipped on resume.
    pub completed_outputs: HashMap<NodeId, OutputMap>,

    /// Per-node failure detail, declaration order.
    pub failures: Vec<NodeFailure>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Resolve the module's named exports against the completed outputs.
    ///
    /// Fails with `Unresolved` if an exported future's producer did not
    /// complete this run.
    pub fn module_outputs(&self, module: &Module) -> Result<HashMap<String, OutputValue>> {
        module
            .outputs()
            .iter()
            .map(|(name, future)| {
                future
                    .resolve(&self.completed_outputs)
                    .map(|value| (name.clone(), value))
            })
            .collect()
    }
}
