//! Journal entry types.
//!
//! Entries are appended on every state transition and never mutated in
//! place. Replaying them in append order reconstructs the executor state
//! after a crash.

use chrono::{DateTime, Utc};
use groundwork_core::{BackendHandle, FailureReason, NodeId, NodeState, OutputMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted record in a run's journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    /// First entry of every run: binds the journal to a module revision
    /// and a target backend identity.
    RunStarted {
        run_id: Uuid,
        module_fingerprint: String,
        target: String,
        timestamp: DateTime<Utc>,
    },

    /// A node moved to a new state.
    NodeTransition {
        run_id: Uuid,
        node_id: NodeId,
        state: NodeState,
        /// Outputs extracted on Completed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outputs: Option<OutputMap>,
        /// Backend-assigned identifier, recorded as soon as it is known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handle: Option<BackendHandle>,
        /// Failure detail on Failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<FailureReason>,
        timestamp: DateTime<Utc>,
    },

    /// Terminal success marker; the run is archived after this.
    RunFinalized {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl JournalEntry {
    /// Start-of-run marker.
    pub fn run_started(run_id: Uuid, module_fingerprint: String, target: String) -> Self {
        JournalEntry::RunStarted {
            run_id,
            module_fingerprint,
            target,
            timestamp: Utc::now(),
        }
    }

    /// A bare state transition without payload.
    pub fn transition(run_id: Uuid, node_id: NodeId, state: NodeState) -> Self {
        JournalEntry::NodeTransition {
            run_id,
            node_id,
            state,
            outputs: None,
            handle: None,
            failure: None,
            timestamp: Utc::now(),
        }
    }

    /// Submitted, with the backend-assigned handle.
    pub fn submitted(run_id: Uuid, node_id: NodeId, handle: BackendHandle) -> Self {
        JournalEntry::NodeTransition {
            run_id,
            node_id,
            state: NodeState::Submitted,
            outputs: None,
            handle: Some(handle),
            failure: None,
            timestamp: Utc::now(),
        }
    }

    /// Completed, with extracted outputs.
    pub fn completed(run_id: Uuid, node_id: NodeId, outputs: OutputMap) -> Self {
        JournalEntry::NodeTransition {
            run_id,
            node_id,
            state: NodeState::Completed,
            outputs: Some(outputs),
            handle: None,
            failure: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed, with the reason.
    pub fn failed(run_id: Uuid, node_id: NodeId, failure: FailureReason) -> Self {
        JournalEntry::NodeTransition {
            run_id,
            node_id,
            state: NodeState::Failed,
            outputs: None,
            handle: None,
            failure: Some(failure),
            timestamp: Utc::now(),
        }
    }

    /// End-of-run marker.
    pub fn run_finalized(run_id: Uuid) -> Self {
        JournalEntry::RunFinalized {
            run_id,
            timestamp: Utc::now(),
        }
    }

    /// The node this entry concerns, if any.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            JournalEntry::NodeTransition { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}
