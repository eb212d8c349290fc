//! The target graph: same node set as the computational graph, target
//! edges only.

use super::{Edge, EdgeKind, NodeId, Step};

/// Target edges kept in lockstep with the computational graph.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    node_count: usize,
    edges: Vec<Edge>,
}

impl TargetGraph {
    /// Creates an empty target graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the node set to `count` nodes.
    pub fn sync_nodes(&mut self, count: usize) {
        self.node_count = self.node_count.max(count);
    }

    /// Records the target edges of a newly added step.
    pub fn add_step(&mut self, step: &Step) {
        self.sync_nodes(step.id().index() + 1);
        for binding in step.bindings_of(EdgeKind::Target) {
            for &from in &binding.producers {
                self.edges.push(Edge {
                    from,
                    to: step.id(),
                    kind: EdgeKind::Target,
                    name: binding.name.clone(),
                });
            }
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the number of target edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns all target edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns true if `id` has at least one inbound target edge.
    #[must_use]
    pub fn has_inbound(&self, id: NodeId) -> bool {
        self.edges.iter().any(|edge| edge.to == id)
    }

    /// Returns the producers of `id`'s targets.
    pub fn producers_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().filter(move |e| e.to == id).map(|e| e.from)
    }
}
