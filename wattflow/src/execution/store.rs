//! The result store: step outputs cached per window.

use crate::core::{ExecutionWindow, StepOutput};
use crate::graph::NodeId;
use std::collections::{BTreeSet, HashMap};

/// Step outputs keyed by `(node, window)`.
///
/// Only the scheduler writes entries; callers can read and evict.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    entries: HashMap<(NodeId, ExecutionWindow), StepOutput>,
}

impl ResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the output of `id` for `window`, if cached.
    #[must_use]
    pub fn get(&self, id: NodeId, window: &ExecutionWindow) -> Option<&StepOutput> {
        self.entries.get(&(id, *window))
    }

    /// Returns true if an output is cached.
    #[must_use]
    pub fn contains(&self, id: NodeId, window: &ExecutionWindow) -> bool {
        self.entries.contains_key(&(id, *window))
    }

    pub(crate) fn insert(&mut self, id: NodeId, window: ExecutionWindow, output: StepOutput) {
        self.entries.insert((id, window), output);
    }

    /// Returns the number of cached outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the windows with cached outputs.
    #[must_use]
    pub fn windows(&self) -> BTreeSet<ExecutionWindow> {
        self.entries.keys().map(|(_, window)| *window).collect()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every entry not belonging to `window`.
    pub fn retain_window(&mut self, window: &ExecutionWindow) {
        self.entries.retain(|(_, w), _| w == window);
    }
}
