use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classifies every event the orchestration core emits.
///
/// The taxonomy is closed: each component emits exactly these types at the
/// documented execution points, so traces stay comparable across graphs and
/// patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // State operations
    StateCreate,
    StateClone,
    StateSet,
    StateMerge,
    // Graph traversal
    GraphStart,
    GraphComplete,
    NodeStart,
    NodeComplete,
    EdgeEvaluate,
    EdgeTransition,
    CycleDetected,
    // Checkpointing
    CheckpointSave,
    CheckpointLoad,
    CheckpointResume,
    // Sequential fold
    ChainStart,
    ChainComplete,
    StepStart,
    StepComplete,
    // Bounded parallel
    ParallelStart,
    ParallelComplete,
    WorkerStart,
    WorkerComplete,
    // Conditional routing
    RouteEvaluate,
    RouteSelect,
    RouteExecute,
}

impl EventType {
    /// Snake_case label used for display and structured logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StateCreate => "state_create",
            EventType::StateClone => "state_clone",
            EventType::StateSet => "state_set",
            EventType::StateMerge => "state_merge",
            EventType::GraphStart => "graph_start",
            EventType::GraphComplete => "graph_complete",
            EventType::NodeStart => "node_start",
            EventType::NodeComplete => "node_complete",
            EventType::EdgeEvaluate => "edge_evaluate",
            EventType::EdgeTransition => "edge_transition",
            EventType::CycleDetected => "cycle_detected",
            EventType::CheckpointSave => "checkpoint_save",
            EventType::CheckpointLoad => "checkpoint_load",
            EventType::CheckpointResume => "checkpoint_resume",
            EventType::ChainStart => "chain_start",
            EventType::ChainComplete => "chain_complete",
            EventType::StepStart => "step_start",
            EventType::StepComplete => "step_complete",
            EventType::ParallelStart => "parallel_start",
            EventType::ParallelComplete => "parallel_complete",
            EventType::WorkerStart => "worker_start",
            EventType::WorkerComplete => "worker_complete",
            EventType::RouteEvaluate => "route_evaluate",
            EventType::RouteSelect => "route_select",
            EventType::RouteExecute => "route_execute",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trace event.
///
/// `source` names the emitting graph or pattern. `data` holds metadata only:
/// node names, edge indices, iteration counts, error flags. Application
/// values never appear here.
///
/// # Examples
///
/// ```
/// use orchestrion::observability::{Event, EventType};
/// use serde_json::json;
///
/// let event = Event::new(EventType::NodeStart, "review-workflow")
///     .with("node", json!("analyze"))
///     .with("iteration", json!(1));
/// assert_eq!(event.data["node"], json!("analyze"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub data: FxHashMap<String, Value>,
}

impl Event {
    /// Creates an event stamped with the current time and empty metadata.
    #[must_use]
    pub fn new(event_type: EventType, source: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            source: source.into(),
            data: FxHashMap::default(),
        }
    }

    /// Attaches one metadata entry, chainable.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.event_type)
    }
}
