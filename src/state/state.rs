use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use crate::observability::{Event, EventType, NoopObserver, Observer};
use crate::state::checkpoint::{CheckpointError, CheckpointStore};

const EVENT_SOURCE: &str = "state";

/// Immutable state flowing through workflow execution.
///
/// `State` keeps a string-keyed map of [`Value`]s for maximum flexibility,
/// enabling dynamic workflows where nodes agree on keys rather than types.
/// All operations are pure: [`set`](State::set), [`merge`](State::merge),
/// [`clone_state`](State::clone_state), and
/// [`with_checkpoint_node`](State::with_checkpoint_node) return new
/// instances and leave the receiver untouched.
///
/// Each `State` carries provenance that survives every derivation: a run id
/// assigned once at construction, the name of the most recently completed
/// node at the point this snapshot was produced, and a timestamp refreshed
/// only by checkpoint-node updates. The observer reference propagates
/// unchanged through all operations and is never persisted.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use orchestrion::state::State;
///
/// let s1 = State::new(None);
/// let s2 = s1.set("user", json!("alice"));
/// assert!(s1.get("user").is_none());
/// assert_eq!(s2.get("user"), Some(&json!("alice")));
/// assert_eq!(s1.run_id(), s2.run_id());
/// ```
pub struct State {
    data: FxHashMap<String, Value>,
    observer: Arc<dyn Observer>,
    run_id: String,
    checkpoint_node: String,
    timestamp: DateTime<Utc>,
}

impl State {
    /// Creates a fresh, empty state.
    ///
    /// When `observer` is `None` the no-op observer is substituted, so state
    /// operations can always emit unconditionally. A collision-resistant run
    /// id and the current time are assigned once here and preserved across
    /// all derivations.
    #[must_use]
    pub fn new(observer: Option<Arc<dyn Observer>>) -> Self {
        let observer = observer.unwrap_or_else(|| Arc::new(NoopObserver));
        let state = Self {
            data: FxHashMap::default(),
            observer,
            run_id: uuid::Uuid::new_v4().to_string(),
            checkpoint_node: String::new(),
            timestamp: Utc::now(),
        };
        state
            .observer
            .on_event(Event::new(EventType::StateCreate, EVENT_SOURCE));
        state
    }

    /// Rebuilds a state from persisted parts; used by checkpoint restoration.
    pub(crate) fn from_parts(
        data: FxHashMap<String, Value>,
        observer: Arc<dyn Observer>,
        run_id: String,
        checkpoint_node: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            data,
            observer,
            run_id,
            checkpoint_node,
            timestamp,
        }
    }

    /// Stable identifier of the run this state belongs to.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Name of the most recently completed node, empty for initial states.
    #[must_use]
    pub fn checkpoint_node(&self) -> &str {
        &self.checkpoint_node
    }

    /// Creation time, or the time of the last checkpoint-node update.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Read-only view of the underlying data map.
    #[must_use]
    pub fn data(&self) -> &FxHashMap<String, Value> {
        &self.data
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Retrieves a value by key in O(1). `None` means the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Creates an independent copy of this state.
    ///
    /// The copy has its own data map (shallow clone of the values) and the
    /// same observer reference, run id, checkpoint node, and timestamp.
    /// Emits [`EventType::StateClone`].
    #[must_use]
    pub fn clone_state(&self) -> Self {
        let next = Self {
            data: self.data.clone(),
            observer: self.observer.clone(),
            run_id: self.run_id.clone(),
            checkpoint_node: self.checkpoint_node.clone(),
            timestamp: self.timestamp,
        };
        self.observer.on_event(
            Event::new(EventType::StateClone, EVENT_SOURCE).with("keys", json!(next.data.len())),
        );
        next
    }

    /// Returns a new state with `key` added or updated.
    ///
    /// Emits [`EventType::StateSet`] (preceded by the internal clone's
    /// [`EventType::StateClone`]).
    #[must_use]
    pub fn set(&self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        let mut next = self.clone_state();
        next.data.insert(key.clone(), value);
        self.observer
            .on_event(Event::new(EventType::StateSet, EVENT_SOURCE).with("key", json!(key)));
        next
    }

    /// Returns a new state combining this state with `other`.
    ///
    /// Keys from `other` overwrite keys of the same name; only the data maps
    /// are combined. The receiver's run id, checkpoint node, timestamp, and
    /// observer carry through unchanged, and nothing of `other`'s identity
    /// is read. Merging a state with itself is a no-op on the data.
    ///
    /// Emits [`EventType::StateMerge`] with the number of keys taken from
    /// `other`.
    #[must_use]
    pub fn merge(&self, other: &State) -> Self {
        let mut next = self.clone_state();
        for (key, value) in &other.data {
            next.data.insert(key.clone(), value.clone());
        }
        self.observer.on_event(
            Event::new(EventType::StateMerge, EVENT_SOURCE).with("keys", json!(other.data.len())),
        );
        next
    }

    /// Returns a new state recording `node` as the last completed node.
    ///
    /// The timestamp is refreshed; this is the only operation that updates
    /// it after construction.
    #[must_use]
    pub fn with_checkpoint_node(&self, node: impl Into<String>) -> Self {
        let mut next = self.clone_state();
        next.checkpoint_node = node.into();
        next.timestamp = Utc::now();
        next
    }

    /// Persists this state into `store` under its run id.
    pub async fn checkpoint(&self, store: &dyn CheckpointStore) -> Result<(), CheckpointError> {
        store.save(self).await
    }
}

// Plain value-semantics copy, without the StateClone event. The observable
// clone operation is `clone_state`.
impl Clone for State {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            observer: self.observer.clone(),
            run_id: self.run_id.clone(),
            checkpoint_node: self.checkpoint_node.clone(),
            timestamp: self.timestamp,
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("run_id", &self.run_id)
            .field("checkpoint_node", &self.checkpoint_node)
            .field("timestamp", &self.timestamp)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

// Equality covers data and provenance; the observer is a capability, not a
// value.
impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.run_id == other.run_id
            && self.checkpoint_node == other.checkpoint_node
            && self.timestamp == other.timestamp
            && self.data == other.data
    }
}

impl Eq for State {}
