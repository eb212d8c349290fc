//! Pipeline topology: node ids, bindings, the computational graph and the
//! target graph.

mod dag;
mod edge;
#[cfg(test)]
mod graph_tests;
mod ids;
mod node;
mod target;

pub use dag::ComputationalGraph;
pub use edge::{Binding, Edge, EdgeKind};
pub use ids::NodeId;
pub use node::{InputNode, Node, Step, StepSpec};
pub use target::TargetGraph;
