#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use orchestrion::graph::{FnNode, Node, NodeContext, NodeError};
use orchestrion::observability::{register_observer, Event, EventType, MemoryObserver};
use orchestrion::state::State;

/// Registers a fresh capture observer under `name` and returns it.
///
/// Registry names are process-wide, so each test should pick a unique name.
pub fn register_capture(name: &str) -> Arc<MemoryObserver> {
    let observer = Arc::new(MemoryObserver::new());
    register_observer(name, observer.clone());
    observer
}

/// Node that sets one key to a fixed value.
pub fn set_node(key: &'static str, value: Value) -> FnNode {
    FnNode::new(move |state, _ctx| {
        let value = value.clone();
        async move { Ok(state.set(key, value)) }
    })
}

/// Node that passes state through untouched.
pub fn pass_node() -> FnNode {
    FnNode::new(|state, _ctx| async move { Ok(state) })
}

/// Node that always fails.
pub fn failing_node(message: &'static str) -> FnNode {
    FnNode::new(move |_state, _ctx| async move { Err(NodeError::Failed(message.to_string())) })
}

/// Node that sets `key` to true once it has run `threshold` times.
pub struct FlagAfterVisits {
    key: &'static str,
    threshold: usize,
    visits: AtomicUsize,
}

impl FlagAfterVisits {
    pub fn new(key: &'static str, threshold: usize) -> Self {
        Self {
            key,
            threshold,
            visits: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Node for FlagAfterVisits {
    async fn run(&self, state: State, _ctx: NodeContext) -> Result<State, NodeError> {
        let visit = self.visits.fetch_add(1, Ordering::SeqCst) + 1;
        if visit >= self.threshold {
            Ok(state.set(self.key, json!(true)))
        } else {
            Ok(state)
        }
    }
}

/// Node names from NodeStart events, in emission order.
pub fn node_starts(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.event_type == EventType::NodeStart)
        .filter_map(|e| e.data.get("node").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Count of events of one type.
pub fn count_of(events: &[Event], event_type: EventType) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}
