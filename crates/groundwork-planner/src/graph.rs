//! Dependency graph construction.
//!
//! The graph is derived purely from declarations: every future-valued
//! argument slot induces exactly one producer -> consumer edge. Build-time
//! errors (duplicate ids, dangling references, cycles) are reported here,
//! before any backend call is ever made.

use std::collections::{HashMap, HashSet};

use groundwork_core::{ActionNode, GroundworkError, Module, NodeId, Result};
use tracing::debug;

/// A directed acyclic graph over action nodes.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Nodes in declaration order.
    nodes: Vec<ActionNode>,

    /// Declaration position per node id.
    positions: HashMap<NodeId, usize>,

    /// Deduplicated edge set, producer -> consumer.
    edges: HashSet<(NodeId, NodeId)>,

    /// Producers per consumer, in first-reference order.
    dependencies: HashMap<NodeId, Vec<NodeId>>,

    /// Consumers per producer, in declaration order.
    dependents: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph for a module's declarations.
    pub fn build(module: &Module) -> Result<Self> {
        Self::from_nodes(module.nodes().to_vec())
    }

    /// Build the graph from an ordered sequence of nodes.
    ///
    /// Fails with `DuplicateNodeId`, `DanglingReference`, or
    /// `CycleDetected`; the cycle error carries the full cycle path.
    pub fn from_nodes(nodes: Vec<ActionNode>) -> Result<Self> {
        let mut positions = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            if positions.insert(node.id.clone(), position).is_some() {
                return Err(GroundworkError::DuplicateNodeId {
                    id: node.id.clone(),
                });
            }
        }

        let mut edges = HashSet::new();
        let mut dependencies: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for node in &nodes {
            for future in node.future_args() {
                let producer = &future.producer;
                if !positions.contains_key(producer) {
                    return Err(GroundworkError::DanglingReference {
                        consumer: node.id.clone(),
                        missing: producer.clone(),
                    });
                }
                // Several slots may reference the same producer; the edge
                // set stays deduplicated while each slot resolves on its own.
                if edges.insert((producer.clone(), node.id.clone())) {
                    dependencies
                        .entry(node.id.clone())
                        .or_default()
                        .push(producer.clone());
                    dependents
                        .entry(producer.clone())
                        .or_default()
                        .push(node.id.clone());
                }
            }
        }

        let graph = Self {
            nodes,
            positions,
            edges,
            dependencies,
            dependents,
        };

        graph.check_acyclic()?;

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "dependency graph built"
        );

        Ok(graph)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&ActionNode> {
        self.positions.get(id).map(|&position| &self.nodes[position])
    }

    /// The deduplicated (producer, consumer) edge set.
    pub fn edges(&self) -> &HashSet<(NodeId, NodeId)> {
        &self.edges
    }

    /// Producers this node depends on.
    pub fn dependencies_of(&self, id: &NodeId) -> &[NodeId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Consumers depending on this node.
    pub fn dependents_of(&self, id: &NodeId) -> &[NodeId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declaration position of a node, used as the stable tie-break.
    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// DFS three-color cycle detection. On failure the error carries the
    /// full cycle path, closed on the repeated node.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: HashMap<&NodeId, Color> =
            self.nodes.iter().map(|n| (&n.id, Color::White)).collect();

        // Iterative DFS; `stack` mirrors the current gray path so the cycle
        // can be reconstructed when a back edge is found.
        for root in &self.nodes {
            if colors[&root.id] != Color::White {
                continue;
            }

            let mut stack: Vec<(&NodeId, usize)> = vec![(&root.id, 0)];
            colors.insert(&root.id, Color::Gray);

            while let Some((id, next_child)) = stack.last().copied() {
                let children = self.dependents_of(id);
                if next_child < children.len() {
                    if let Some(entry) = stack.last_mut() {
                        entry.1 += 1;
                    }
                    let child = &children[next_child];
                    match colors[child] {
                        Color::White => {
                            colors.insert(child, Color::Gray);
                            stack.push((child, 0));
                        }
                        Color::Gray => {
                            let start = stack
                                .iter()
                                .position(|(gray, _)| *gray == child)
                                .unwrap_or(0);
                            let mut path: Vec<NodeId> =
                                stack[start..].iter().map(|(n, _)| (*n).clone()).collect();
                            path.push(child.clone());
                            return Err(GroundworkError::CycleDetected { path });
                        }
                        Color::Black => {}
                    }
                } else {
                    colors.insert(id, Color::Black);
                    stack.pop();
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::{ActionKind, ArgValue, FutureValue};
    use serde_json::json;

    fn node(name: &str, deps: &[&ActionNode]) -> ActionNode {
        ActionNode {
            id: NodeId::new("m", name, "create"),
            module: "m".to_string(),
            local_name: name.to_string(),
            kind: ActionKind::Create,
            args: deps
                .iter()
                .map(|dep| FutureValue::new(dep.id.clone()).into())
                .collect(),
            account: None,
        }
    }

    #[test]
    fn test_edges_follow_future_slots() {
        let a = node("a", &[]);
        let b = node("b", &[&a]);
        let c = node("c", &[&a, &b]);

        let graph = DependencyGraph::from_nodes(vec![a.clone(), b.clone(), c.clone()]).unwrap();

        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.dependencies_of(&c.id), &[a.id.clone(), b.id.clone()]);
        assert_eq!(graph.dependents_of(&a.id), &[b.id.clone(), c.id.clone()]);
    }

    #[test]
    fn test_repeated_reference_is_one_edge() {
        let a = node("a", &[]);
        let b = node("b", &[&a, &a]);

        let graph = DependencyGraph::from_nodes(vec![a.clone(), b]).unwrap();
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_dangling_reference_fails_regardless_of_position() {
        let ghost = node("ghost", &[]);
        let a = node("a", &[&ghost]);
        let b = node("b", &[]);

        // ghost itself is never declared
        let err = DependencyGraph::from_nodes(vec![a.clone(), b]).unwrap_err();
        match err {
            GroundworkError::DanglingReference { consumer, missing } => {
                assert_eq!(consumer, a.id);
                assert_eq!(missing, ghost.id);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_id_fails() {
        let a = node("a", &[]);
        let err = DependencyGraph::from_nodes(vec![a.clone(), a.clone()]).unwrap_err();
        assert!(matches!(err, GroundworkError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_cycle_reports_full_path() {
        let mut a = node("a", &[]);
        let b = node("b", &[&a]);
        let c = node("c", &[&b]);
        // close the cycle: a depends on c
        a.args.push(ArgValue::Future {
            future: FutureValue::new(c.id.clone()),
        });

        let err = DependencyGraph::from_nodes(vec![a.clone(), b.clone(), c.clone()]).unwrap_err();
        match err {
            GroundworkError::CycleDetected { path } => {
                assert!(path.len() >= 3);
                assert_eq!(path.first(), path.last());
                // every consecutive pair must be a real edge of the input
                for pair in path.windows(2) {
                    let is_edge = [&a, &b, &c].iter().any(|n| {
                        n.future_args()
                            .any(|f| f.producer == pair[0] && n.id == pair[1])
                    });
                    assert!(is_edge, "reported pair {:?} is not an input edge", pair);
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_node_cycle_detected() {
        let mut a = node("a", &[]);
        let b = node("b", &[&a]);
        a.args.push(ArgValue::Future {
            future: FutureValue::new(b.id.clone()),
        });

        let err = DependencyGraph::from_nodes(vec![a, b]).unwrap_err();
        assert!(matches!(err, GroundworkError::CycleDetected { .. }));
    }

    #[test]
    fn test_literal_and_account_slots_induce_no_edges() {
        let a = ActionNode {
            id: NodeId::new("m", "a", "create"),
            module: "m".to_string(),
            local_name: "a".to_string(),
            kind: ActionKind::Create,
            args: vec![ArgValue::literal(json!(42))],
            account: None,
        };

        let graph = DependencyGraph::from_nodes(vec![a]).unwrap();
        assert!(graph.edges().is_empty());
    }
}
