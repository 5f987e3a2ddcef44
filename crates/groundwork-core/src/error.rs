//! Error types for the Groundwork engine.

use thiserror::Error;
use uuid::Uuid;

use crate::node::NodeId;

/// Main error type for Groundwork operations.
#[derive(Error, Debug, Clone)]
pub enum GroundworkError {
    /// Two nodes were declared with the same identity.
    #[error("Duplicate node id: {id}")]
    DuplicateNodeId { id: NodeId },

    /// A future argument references a node that was never declared.
    #[error("Node {consumer} references undeclared node {missing}")]
    DanglingReference { consumer: NodeId, missing: NodeId },

    /// The declared dependencies form a cycle.
    #[error("Dependency cycle detected: {}", format_cycle(.path))]
    CycleDetected { path: Vec<NodeId> },

    /// Batch planning failed; indicates an internal invariant violation.
    #[error("Planning failed: {message}")]
    PlanningFailed { message: String },

    /// A future was resolved before its producing node completed.
    #[error("Output '{selector}' of node {node_id} is not yet resolved")]
    Unresolved { node_id: NodeId, selector: String },

    /// The backend rejected a submission.
    #[error("Submission failed for node {node_id}: {message}")]
    Submission { node_id: NodeId, message: String },

    /// The backend confirmed the operation as reverted.
    #[error("Node {node_id} reverted: {reason}")]
    Reverted { node_id: NodeId, reason: String },

    /// Confirmation did not arrive within the configured timeout.
    #[error("Node {node_id} timed out after {duration_ms}ms")]
    Timeout { node_id: NodeId, duration_ms: u64 },

    /// An append was attempted against an archived run.
    #[error("Run {run_id} is closed")]
    RunClosed { run_id: Uuid },

    /// Journal persistence failed.
    #[error("Journal error: {message}")]
    JournalError { message: String },

    /// The journal was recorded for a different module revision.
    #[error("Module fingerprint mismatch: journal has {recorded}, module is {current}")]
    FingerprintMismatch { recorded: String, current: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_cycle(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl GroundworkError {
    /// Returns true if this error was raised while building the graph,
    /// before any backend call could have been made.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            GroundworkError::DuplicateNodeId { .. }
                | GroundworkError::DanglingReference { .. }
                | GroundworkError::CycleDetected { .. }
        )
    }

    /// Returns true if this error describes a single node failing against
    /// the backend rather than the run as a whole.
    pub fn is_node_failure(&self) -> bool {
        matches!(
            self,
            GroundworkError::Submission { .. }
                | GroundworkError::Reverted { .. }
                | GroundworkError::Timeout { .. }
        )
    }

    /// Returns the node ID if available.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            GroundworkError::DuplicateNodeId { id } => Some(id),
            GroundworkError::DanglingReference { consumer, .. } => Some(consumer),
            GroundworkError::Unresolved { node_id, .. } => Some(node_id),
            GroundworkError::Submission { node_id, .. } => Some(node_id),
            GroundworkError::Reverted { node_id, .. } => Some(node_id),
            GroundworkError::Timeout { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

/// Convenience Result type for Groundwork operations.
pub type Result<T> = std::result::Result<T, GroundworkError>;

impl From<serde_json::Error> for GroundworkError {
    fn from(err: serde_json::Error) -> Self {
        GroundworkError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_classification() {
        let err = GroundworkError::DuplicateNodeId {
            id: NodeId::new("mod", "token", "create"),
        };
        assert!(err.is_build_error());
        assert!(!err.is_node_failure());
    }

    #[test]
    fn test_node_failure_classification() {
        let err = GroundworkError::Timeout {
            node_id: NodeId::new("mod", "token", "create"),
            duration_ms: 5000,
        };
        assert!(err.is_node_failure());
        assert!(err.node_id().is_some());
    }

    #[test]
    fn test_cycle_display_lists_path() {
        let err = GroundworkError::CycleDetected {
            path: vec![
                NodeId::new("m", "a", "create"),
                NodeId::new("m", "b", "create"),
                NodeId::new("m", "a", "create"),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("m/a#create -> m/b#create -> m/a#create"));
    }
}
