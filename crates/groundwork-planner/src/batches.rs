//! Batch planning over the dependency graph.
//!
//! Kahn's algorithm partitions the graph into batches: batch 0 holds every
//! node with in-degree 0; executing a batch decrements the in-degree of its
//! dependents. Within a batch nodes are ordered by declaration position so
//! identical declarations always plan identically, which resume matching
//! relies on.

use std::collections::HashMap;

use groundwork_core::{GroundworkError, NodeId, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::DependencyGraph;

/// A set of nodes safe to execute concurrently: no edges among them, and
/// every dependency sits in a strictly earlier batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionBatch {
    /// Position of this batch in the plan.
    pub index: usize,

    /// Member nodes, in declaration order.
    pub node_ids: Vec<NodeId>,
}

impl ExecutionBatch {
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

/// The ordered batches for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    batches: Vec<ExecutionBatch>,
}

impl ExecutionPlan {
    pub fn batches(&self) -> &[ExecutionBatch] {
        &self.batches
    }

    /// Total number of planned nodes across all batches.
    pub fn node_count(&self) -> usize {
        self.batches.iter().map(ExecutionBatch::len).sum()
    }

    /// The batch index a node was planned into.
    pub fn batch_of(&self, id: &NodeId) -> Option<usize> {
        self.batches
            .iter()
            .find(|batch| batch.node_ids.contains(id))
            .map(|batch| batch.index)
    }
}

/// Partition a graph into execution batches.
///
/// Fails with `PlanningFailed` if any node remains unplaced once the graph
/// is exhausted; the graph builder already rejects cycles, so this is a
/// pure invariant check.
pub fn plan(graph: &DependencyGraph) -> Result<ExecutionPlan> {
    let mut in_degree: HashMap<&NodeId, usize> = graph
        .nodes()
        .iter()
        .map(|node| (&node.id, graph.dependencies_of(&node.id).len()))
        .collect();

    let mut placed = 0usize;
    let mut batches = Vec::new();

    loop {
        // Declaration-order scan keeps the batch ordering deterministic.
        let ready: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|node| in_degree.get(&node.id) == Some(&0))
            .map(|node| node.id.clone())
            .collect();

        if ready.is_empty() {
            break;
        }

        for id in &ready {
            in_degree.remove(id);
            for dependent in graph.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                }
            }
        }

        placed += ready.len();
        batches.push(ExecutionBatch {
            index: batches.len(),
            node_ids: ready,
        });
    }

    if placed != graph.nodes().len() {
        return Err(GroundworkError::PlanningFailed {
            message: format!(
                "{} of {} nodes unplaced after graph exhaustion",
                graph.nodes().len() - placed,
                graph.nodes().len()
            ),
        });
    }

    info!(
        batches = batches.len(),
        nodes = placed,
        "execution plan computed"
    );

    Ok(ExecutionPlan { batches })
}
