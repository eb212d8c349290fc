//! Edge kinds and input bindings.

use super::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role an edge plays for its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Feeds a named argument of `fit` and `transform`.
    Computational,
    /// Feeds a named target of `fit` only.
    Target,
    /// Feeds the step's condition predicate.
    Conditional,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Computational => write!(f, "computational"),
            Self::Target => write!(f, "target"),
            Self::Conditional => write!(f, "conditional"),
        }
    }
}

/// A named input of a step and the producers that may supply it.
///
/// With several producers, the first one (in order) holding a value for the
/// window wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The argument name seen by the module or condition.
    pub name: String,
    /// The edge kind.
    pub kind: EdgeKind,
    /// Candidate producers, in priority order.
    pub producers: Vec<NodeId>,
}

impl Binding {
    /// Creates a binding.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EdgeKind, producers: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            kind,
            producers,
        }
    }
}

/// A directed edge `from -> to` labelled with the consumer's argument name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The producer.
    pub from: NodeId,
    /// The consumer.
    pub to: NodeId,
    /// The edge kind.
    pub kind: EdgeKind,
    /// The consumer-side argument name.
    pub name: String,
}
