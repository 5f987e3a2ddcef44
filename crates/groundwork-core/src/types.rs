//! Common types used across the Groundwork engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single resolved output value produced by the backend.
pub type OutputValue = serde_json::Value;

/// All outputs of one completed node, keyed by output selector.
pub type OutputMap = HashMap<String, OutputValue>;

/// Lifecycle state of a node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Declared but not yet handed to the backend.
    Pending,
    /// Submitted to the backend; a handle has been assigned.
    Submitted,
    /// The backend has confirmed the operation.
    Confirmed,
    /// Outputs have been extracted and recorded.
    Completed,
    /// The node failed and will not make further progress this run.
    Failed,
}

impl NodeState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Completed | NodeState::Failed)
    }

    /// Returns true if the node is currently in flight against the backend.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, NodeState::Submitted | NodeState::Confirmed)
    }
}

/// Why a node ended up in the Failed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// The backend rejected the submission outright.
    Submission { message: String },
    /// The backend confirmed the operation as reverted.
    Reverted { reason: String },
    /// Confirmation did not arrive within the configured timeout.
    TimedOut { duration_ms: u64 },
    /// The run was cancelled before this node was submitted.
    Cancelled,
}

/// Identifier assigned by the backend once a submission is accepted
/// (e.g., a transaction hash or provisioning request id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendHandle(pub String);

impl BackendHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an identity slot (e.g., a signer) resolved from the run
/// configuration. Never a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    /// Index into [`RunConfig::accounts`](crate::config::RunConfig).
    pub index: usize,
}

impl AccountRef {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}
