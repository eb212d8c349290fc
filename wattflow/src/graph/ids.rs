//! Node identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in the pipeline arena.
///
/// Placeholders and steps share one id space. Ids follow insertion order and
/// break ties when scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the arena position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
