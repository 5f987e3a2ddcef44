//! Execution event broadcasting.
//!
//! Observers subscribe to a broadcast channel; emission never blocks the
//! executor and slow subscribers lose events rather than applying
//! backpressure.

use chrono::{DateTime, Utc};
use groundwork_core::{FailureReason, NodeId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::result::RunOutcome;

/// Something observable that happened during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// The run this event belongs to.
    pub run_id: Uuid,

    /// The node concerned, if any.
    pub node_id: Option<NodeId>,

    /// What happened.
    pub kind: ExecutionEventKind,

    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

/// Event kinds, in the order a successful run emits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEventKind {
    RunStarted,
    BatchStarted { index: usize, size: usize },
    NodeSubmitted,
    NodeConfirmed,
    NodeCompleted,
    NodeFailed { reason: FailureReason },
    BatchCompleted { index: usize },
    RunCompleted { outcome: RunOutcome },
}

/// Broadcast fan-out for execution events.
#[derive(Clone)]
pub struct EventBus {
    run_id: Uuid,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(run_id: Uuid) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { run_id, sender }
    }

    /// Subscribe to events from this run.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Emit a run-level event.
    pub fn emit(&self, kind: ExecutionEventKind) {
        self.emit_for(None, kind);
    }

    /// Emit an event about one node.
    pub fn emit_node(&self, node_id: NodeId, kind: ExecutionEventKind) {
        self.emit_for(Some(node_id), kind);
    }

    fn emit_for(&self, node_id: Option<NodeId>, kind: ExecutionEventKind) {
        // No subscribers is fine; events are advisory.
        let _ = self.sender.send(ExecutionEvent {
            run_id: self.run_id,
            node_id,
            kind,
            timestamp: Utc::now(),
        });
    }
}
