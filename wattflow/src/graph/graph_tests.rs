//! Tests for graph wiring, validation and ordering.

#[cfg(test)]
mod tests {
    use crate::errors::WattflowError;
    use crate::graph::{Binding, ComputationalGraph, EdgeKind, NodeId, StepSpec, TargetGraph};
    use crate::module::SharedModule;
    use crate::testing::CountingModule;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn spec(module: &SharedModule, bindings: Vec<Binding>) -> StepSpec {
        let mut spec = StepSpec::new(module.clone());
        spec.bindings = bindings;
        spec
    }

    fn comp(name: &str, producers: &[NodeId]) -> Binding {
        Binding::new(name, EdgeKind::Computational, producers.to_vec())
    }

    #[test]
    fn test_input_placeholders_are_deduplicated() {
        let mut graph = ComputationalGraph::new();
        let a = graph.add_input("load");
        let b = graph.add_input("load");
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_display_names_get_suffixes() {
        let mut graph = ComputationalGraph::new();
        let x = graph.add_input("x");
        let module = SharedModule::new(CountingModule::new("scaler"));
        let first = graph.add_step(spec(&module, vec![comp("x", &[x])])).unwrap();
        let second = graph.add_step(spec(&module, vec![comp("x", &[first])])).unwrap();
        let third = graph.add_step(spec(&module, vec![comp("x", &[second])])).unwrap();
        assert_eq!(graph.step(first).unwrap().name(), "scaler");
        assert_eq!(graph.step(second).unwrap().name(), "scaler_1");
        assert_eq!(graph.step(third).unwrap().name(), "scaler_2");
    }

    #[test]
    fn test_rejects_unknown_producer() {
        let mut graph = ComputationalGraph::new();
        let module = SharedModule::new(CountingModule::new("m"));
        let err = graph
            .add_step(spec(&module, vec![comp("x", &[NodeId::new(7)])]))
            .unwrap_err();
        assert!(matches!(err, WattflowError::WrongParameter(_)));
    }

    #[test]
    fn test_rejects_step_without_computational_input() {
        let mut graph = ComputationalGraph::new();
        let y = graph.add_input("y");
        let module = SharedModule::new(CountingModule::new("m"));
        let err = graph
            .add_step(spec(&module, vec![Binding::new("y", EdgeKind::Target, vec![y])]))
            .unwrap_err();
        assert!(err.to_string().contains("at least one computational input"));
    }

    #[test]
    fn test_rejects_mismatched_input_names() {
        let mut graph = ComputationalGraph::new();
        let x = graph.add_input("x");
        let module = SharedModule::new(CountingModule::new("shift").with_inputs(&["x"]));
        let err = graph
            .add_step(spec(&module, vec![comp("series", &[x])]))
            .unwrap_err();
        match err {
            WattflowError::WrongParameter(err) => assert_eq!(err.module.as_deref(), Some("shift")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_duplicate_binding_names() {
        let mut graph = ComputationalGraph::new();
        let x = graph.add_input("x");
        let module = SharedModule::new(CountingModule::new("m"));
        let err = graph
            .add_step(spec(&module, vec![comp("x", &[x]), comp("x", &[x])]))
            .unwrap_err();
        assert!(err.to_string().contains("bound twice"));
    }

    #[test]
    fn test_edges_sinks_and_counts() {
        let mut graph = ComputationalGraph::new();
        let x = graph.add_input("x");
        let y = graph.add_input("y");
        let module = SharedModule::new(CountingModule::new("m"));
        let a = graph.add_step(spec(&module, vec![comp("x", &[x])])).unwrap();
        let b = graph
            .add_step(spec(
                &module,
                vec![comp("x", &[a]), Binding::new("y", EdgeKind::Target, vec![y])],
            ))
            .unwrap();
        let c = graph
            .add_step(spec(
                &module,
                vec![comp("x", &[x]), Binding::new("gate", EdgeKind::Conditional, vec![a])],
            ))
            .unwrap();

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edge_count_of(EdgeKind::Target), 1);
        assert_eq!(graph.edge_count_of(EdgeKind::Conditional), 1);
        assert_eq!(graph.sinks(), vec![b, c]);
        assert_eq!(graph.children(a), BTreeSet::from([b, c]));

        let mut targets = TargetGraph::new();
        targets.sync_nodes(graph.node_count());
        for step in graph.steps() {
            targets.add_step(step);
        }
        assert_eq!(targets.node_count(), graph.node_count());
        assert_eq!(targets.edge_count(), 1);
        assert!(targets.has_inbound(b));
        assert!(!targets.has_inbound(c));
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let mut graph = ComputationalGraph::new();
        let x = graph.add_input("x");
        let module = SharedModule::new(CountingModule::new("m"));
        let a = graph.add_step(spec(&module, vec![comp("x", &[x])])).unwrap();
        let b = graph.add_step(spec(&module, vec![comp("x", &[x])])).unwrap();
        let c = graph.add_step(spec(&module, vec![comp("l", &[b]), comp("r", &[a])])).unwrap();

        let all: BTreeSet<NodeId> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(graph.topological_order(&all).unwrap(), vec![x, a, b, c]);

        let partial = BTreeSet::from([b, c]);
        assert_eq!(graph.topological_order(&partial).unwrap(), vec![b, c]);
        assert!(graph.validate().is_ok());
    }
}
