//! Event sink trait and implementations.

use tracing::{debug, info, Level};

/// Trait for event sinks that receive pipeline events.
///
/// Sinks must never fail the pass; errors are theirs to log and drop.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "step.completed")
    /// * `data` - Optional event data
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub const fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        } else {
            info!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Returns the collected event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<serde_json::Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}
