/*!
Serde-friendly persistence shape for state snapshots.

Serializing checkpoint backends store [`PersistedState`] rather than the
in-memory [`State`], keeping conversion logic localized here so store code
stays lean. The observer capability is deliberately absent from the
persisted shape; it is re-supplied on restoration. This module performs no
I/O.
*/

use std::sync::Arc;

use chrono::Utc;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::Observer;

use super::state::State;

/// Complete persisted form of a state snapshot.
///
/// The timestamp is carried as an RFC3339 string to keep `chrono` types out
/// of the serialized shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub run_id: String,
    #[serde(default)]
    pub checkpoint_node: String,
    pub timestamp: String,
    #[serde(default)]
    pub data: FxHashMap<String, Value>,
}

impl From<&State> for PersistedState {
    fn from(state: &State) -> Self {
        Self {
            run_id: state.run_id().to_string(),
            checkpoint_node: state.checkpoint_node().to_string(),
            timestamp: state.timestamp().to_rfc3339(),
            data: state.data().clone(),
        }
    }
}

impl PersistedState {
    /// Rebuilds a [`State`] from this persisted shape.
    ///
    /// `observer` re-attaches the non-persisted capability; `None` yields
    /// the no-op observer. A timestamp that fails to parse falls back to
    /// the current time rather than rejecting the checkpoint.
    #[must_use]
    pub fn into_state(self, observer: Option<Arc<dyn Observer>>) -> State {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        State::from_parts(
            self.data,
            observer.unwrap_or_else(|| Arc::new(crate::observability::NoopObserver)),
            self.run_id,
            self.checkpoint_node,
            timestamp,
        )
    }
}
