//! The computational graph: an arena of placeholders and steps.

use super::{Binding, Edge, EdgeKind, InputNode, Node, NodeId, Step, StepSpec};
use crate::errors::{CycleDetectedError, WattflowError, WrongParameterError};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

/// Nodes plus their computational and conditional edges.
///
/// Edges are stored on the consumer as [`Binding`]s. Producers must exist
/// before a consumer is added, so insertion order is always a valid
/// topological order.
#[derive(Debug, Clone, Default)]
pub struct ComputationalGraph {
    nodes: Vec<Node>,
    inputs: HashMap<String, NodeId>,
    names: HashSet<String>,
}

impl ComputationalGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the placeholder for `column`, creating it if needed.
    pub fn add_input(&mut self, column: impl Into<String>) -> NodeId {
        let column = column.into();
        if let Some(&id) = self.inputs.get(&column) {
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.inputs.insert(column.clone(), id);
        self.nodes.push(Node::Input(InputNode { id, column }));
        id
    }

    /// Validates `spec` against the graph and appends it as a step.
    pub fn add_step(&mut self, spec: StepSpec) -> Result<NodeId, WattflowError> {
        spec.validate()?;

        for binding in &spec.bindings {
            for producer in &binding.producers {
                if self.node(*producer).is_none() {
                    return Err(WrongParameterError::new(format!(
                        "{} input '{}' refers to unknown node {producer}",
                        binding.kind, binding.name
                    ))
                    .with_module(spec.module.name())
                    .with_fix_hint("Add producers to the pipeline before the steps that consume them.")
                    .into());
                }
            }
        }

        let base = spec.name.clone().unwrap_or_else(|| spec.module.name());
        let name = self.unique_name(&base);
        let id = NodeId::from_index(self.nodes.len());
        self.names.insert(name.clone());
        self.nodes.push(Node::Step(Step {
            id,
            name,
            module: spec.module,
            bindings: spec.bindings,
            condition: spec.condition,
            mode: spec.mode,
            callbacks: spec.callbacks,
        }));
        Ok(id)
    }

    /// Returns `base`, or `base_N` with the smallest free suffix.
    fn unique_name(&self, base: &str) -> String {
        if !self.names.contains(base) && !self.inputs.contains_key(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.names.contains(candidate) && !self.inputs.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Returns a step by id.
    #[must_use]
    pub fn step(&self, id: NodeId) -> Option<&Step> {
        self.node(id).and_then(Node::as_step)
    }

    /// Returns a step by display name.
    #[must_use]
    pub fn step_by_name(&self, name: &str) -> Option<&Step> {
        self.steps().find(|step| step.name() == name)
    }

    /// Returns the placeholder id for a column.
    #[must_use]
    pub fn input_id(&self, column: &str) -> Option<NodeId> {
        self.inputs.get(column).copied()
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Iterates over steps in insertion order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.nodes.iter().filter_map(Node::as_step)
    }

    /// Iterates over placeholders in insertion order.
    pub fn input_nodes(&self) -> impl Iterator<Item = &InputNode> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Input(input) => Some(input),
            Node::Step(_) => None,
        })
    }

    /// Returns the number of nodes, placeholders included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns computational and conditional edges, one per producer.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.steps()
            .flat_map(|step| {
                step.bindings()
                    .iter()
                    .filter(|b| b.kind != EdgeKind::Target)
                    .flat_map(move |binding| edges_of(step.id(), binding))
            })
            .collect()
    }

    /// Returns the number of computational and conditional edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Returns the number of edges of one kind.
    #[must_use]
    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.steps()
            .flat_map(|step| step.bindings_of(kind))
            .map(|binding| binding.producers.len())
            .sum()
    }

    /// Returns the producers feeding `id` through non-target edges.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.step(id)
            .map(|step| {
                step.bindings()
                    .iter()
                    .filter(|b| b.kind != EdgeKind::Target)
                    .flat_map(|b| b.producers.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the steps consuming `id` through non-target edges.
    #[must_use]
    pub fn children(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.steps()
            .filter(|step| self.parents(step.id()).contains(&id))
            .map(Step::id)
            .collect()
    }

    /// Returns the steps without computational or conditional consumers.
    #[must_use]
    pub fn sinks(&self) -> Vec<NodeId> {
        let consumed: HashSet<NodeId> = self
            .steps()
            .flat_map(|step| self.parents(step.id()))
            .collect();
        self.steps()
            .map(Step::id)
            .filter(|id| !consumed.contains(id))
            .collect()
    }

    /// Orders `subset` so every producer precedes its consumers.
    ///
    /// Ties between ready nodes go to the lowest id, which keeps the order
    /// deterministic and close to insertion order. Target edges count as
    /// dependencies as well, since a fitting step needs its targets first.
    pub fn topological_order(&self, subset: &BTreeSet<NodeId>) -> Result<Vec<NodeId>, CycleDetectedError> {
        let deps = |id: NodeId| -> Vec<NodeId> {
            self.step(id)
                .map(|step| {
                    step.bindings()
                        .iter()
                        .flat_map(|b| b.producers.iter().copied())
                        .filter(|p| subset.contains(p))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut dependents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for &id in subset {
            let mut unique = deps(id);
            unique.sort_unstable();
            unique.dedup();
            in_degree.insert(id, unique.len());
            for dep in unique {
                dependents.entry(dep).or_default().push(id);
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();
        let mut order = Vec::with_capacity(subset.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for dependent in dependents.get(&id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*dependent));
                    }
                }
            }
        }

        if order.len() < subset.len() {
            return Err(CycleDetectedError::new(self.find_cycle().unwrap_or_default()));
        }
        Ok(order)
    }

    /// Checks the whole graph for cycles.
    pub fn validate(&self) -> Result<(), CycleDetectedError> {
        match self.find_cycle() {
            Some(cycle) => Err(CycleDetectedError::new(cycle)),
            None => Ok(()),
        }
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in &self.nodes {
            if !visited.contains(&node.id()) {
                if let Some(cycle) = self.dfs_cycle(node.id(), &mut visited, &mut rec_stack, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        rec_stack: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
    ) -> Option<Vec<String>> {
        visited.insert(id);
        rec_stack.insert(id);
        path.push(id);

        let producers: Vec<NodeId> = self
            .step(id)
            .map(|step| {
                step.bindings()
                    .iter()
                    .flat_map(|b| b.producers.iter().copied())
                    .collect()
            })
            .unwrap_or_default();

        for dep in producers {
            if !visited.contains(&dep) {
                if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| self.display(*n)).collect();
                cycle.push(self.display(dep));
                return Some(cycle);
            }
        }

        path.pop();
        rec_stack.remove(&id);
        None
    }

    fn display(&self, id: NodeId) -> String {
        self.node(id).map_or_else(|| id.to_string(), |node| node.name().to_string())
    }

    /// Builds a graph from already validated nodes, as read from a
    /// descriptor. Ids must equal positions.
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            match &node {
                Node::Input(input) => {
                    graph.inputs.insert(input.column.clone(), input.id);
                }
                Node::Step(step) => {
                    graph.names.insert(step.name.clone());
                }
            }
            graph.nodes.push(node);
        }
        graph
    }
}

fn edges_of(to: NodeId, binding: &Binding) -> impl Iterator<Item = Edge> + '_ {
    binding.producers.iter().map(move |&from| Edge {
        from,
        to,
        kind: binding.kind,
        name: binding.name.clone(),
    })
}
