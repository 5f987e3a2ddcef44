//! Journal replay into resumable executor state.

use std::collections::HashMap;

use groundwork_core::{BackendHandle, FailureReason, NodeId, NodeState, OutputMap};
use uuid::Uuid;

use crate::entry::JournalEntry;

/// The reconstructed view of one node after replay.
#[derive(Debug, Clone, Default)]
pub struct NodeRecord {
    pub state: Option<NodeState>,
    pub handle: Option<BackendHandle>,
    pub outputs: Option<OutputMap>,
    pub failure: Option<FailureReason>,
}

/// Per-node state reconstructed from a journal, last write wins.
#[derive(Debug, Clone, Default)]
pub struct ResumedState {
    run_id: Option<Uuid>,
    module_fingerprint: Option<String>,
    target: Option<String>,
    finalized: bool,
    records: HashMap<NodeId, NodeRecord>,
}

impl ResumedState {
    /// Replay entries in append order.
    pub fn replay(entries: &[JournalEntry]) -> Self {
        let mut resumed = Self::default();

        for entry in entries {
            match entry {
                JournalEntry::RunStarted {
                    run_id,
                    module_fingerprint,
                    target,
                    ..
                } => {
                    resumed.run_id = Some(*run_id);
                    resumed.module_fingerprint = Some(module_fingerprint.clone());
                    resumed.target = Some(target.clone());
                }
                JournalEntry::NodeTransition {
                    node_id,
                    state,
                    outputs,
                    handle,
                    failure,
                    ..
                } => {
                    let record = resumed.records.entry(node_id.clone()).or_default();
                    record.state = Some(*state);
                    // The handle is recorded once at submission; keep it
                    // through later transitions that omit it.
                    if handle.is_some() {
                        record.handle = handle.clone();
                    }
                    if outputs.is_some() {
                        record.outputs = outputs.clone();
                    }
                    if failure.is_some() {
                        record.failure = failure.clone();
                    }
                }
                JournalEntry::RunFinalized { .. } => {
                    resumed.finalized = true;
                }
            }
        }

        resumed
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Fingerprint of the module this journal was recorded for.
    pub fn module_fingerprint(&self) -> Option<&str> {
        self.module_fingerprint.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// True when the journal held no entries at all.
    pub fn is_empty(&self) -> bool {
        self.run_id.is_none() && self.records.is_empty()
    }

    /// Replayed state of a node, if any was recorded.
    pub fn state_of(&self, id: &NodeId) -> Option<NodeState> {
        self.records.get(id).and_then(|record| record.state)
    }

    pub fn record_of(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.records.get(id)
    }

    /// Outputs of every node that reached Completed. These seed the
    /// executor's resolution map so completed nodes are never resubmitted.
    pub fn completed_outputs(&self) -> HashMap<NodeId, OutputMap> {
        self.records
            .iter()
            .filter(|(_, record)| record.state == Some(NodeState::Completed))
            .filter_map(|(id, record)| {
                record
                    .outputs
                    .clone()
                    .map(|outputs| (id.clone(), outputs))
            })
            .collect()
    }

    /// Nodes left in flight (Submitted or Confirmed, never Completed) with
    /// their recorded backend handles. These are re-queried on resume
    /// instead of being resubmitted blindly.
    pub fn in_flight_handles(&self) -> HashMap<NodeId, BackendHandle> {
        self.records
            .iter()
            .filter(|(_, record)| {
                record
                    .state
                    .map(|state| state.is_in_flight())
                    .unwrap_or(false)
            })
            .filter_map(|(id, record)| {
                record.handle.clone().map(|handle| (id.clone(), handle))
            })
            .collect()
    }
}
