//! Configuration structs for every orchestration component.
//!
//! Configuration follows a strict lifecycle: structs are deserialized (or
//! built in code), consumed once during construction, and then discarded.
//! Observer and checkpoint-store fields are registry names resolved at
//! construction time, so unknown names fail before anything executes.

use serde::{Deserialize, Serialize};

/// Default observer for graph execution: the structured-log observer.
fn default_graph_observer() -> String {
    "tracing".to_string()
}

/// Default observer for patterns: zero-overhead no-op.
fn default_noop_observer() -> String {
    "noop".to_string()
}

fn default_max_iterations() -> u64 {
    1000
}

fn default_store() -> String {
    "memory".to_string()
}

fn default_worker_cap() -> usize {
    16
}

/// Checkpointing options for a graph.
///
/// An interval of 0 disables checkpointing entirely; otherwise state is
/// persisted after every `interval`-th node execution. When `preserve` is
/// false, the checkpoint is deleted once the run completes successfully.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Registry name of the checkpoint store.
    #[serde(default = "default_store")]
    pub store: String,
    /// Save every N node executions; 0 disables.
    #[serde(default)]
    pub interval: u64,
    /// Keep the checkpoint after successful completion.
    #[serde(default)]
    pub preserve: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            interval: 0,
            preserve: false,
        }
    }
}

/// Configuration for state graph execution.
///
/// # Examples
///
/// ```
/// let cfg: orchestrion::config::GraphConfig = serde_json::from_str(
///     r#"{"name": "document-workflow", "observer": "noop", "max_iterations": 500}"#,
/// ).unwrap();
/// assert_eq!(cfg.max_iterations, 500);
/// assert!(cfg.checkpoint.is_none());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Identifies the graph in emitted events.
    pub name: String,
    /// Registry name of the observer.
    #[serde(default = "default_graph_observer")]
    pub observer: String,
    /// Cap on total node executions, revisits included.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    /// Checkpointing options; absent means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointConfig>,
}

impl GraphConfig {
    /// Sensible defaults: structured logging, 1000-iteration cap, no
    /// checkpointing.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observer: default_graph_observer(),
            max_iterations: default_max_iterations(),
            checkpoint: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl Into<String>) -> Self {
        self.observer = observer.into();
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: CheckpointConfig) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}

/// Configuration for sequential chain execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Capture state after each step; the result then carries every
    /// intermediate state including the initial one.
    #[serde(default)]
    pub capture_intermediate_states: bool,
    /// Registry name of the observer.
    #[serde(default = "default_noop_observer")]
    pub observer: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            capture_intermediate_states: false,
            observer: default_noop_observer(),
        }
    }
}

/// Configuration for bounded parallel execution.
///
/// `fail_fast` is tri-state so configuration merging can distinguish
/// "never specified" (defaults to true) from "explicitly false".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Upper bound on workers; 0 means auto (twice the CPU count).
    #[serde(default)]
    pub max_workers: usize,
    /// Hard ceiling applied after `max_workers`.
    #[serde(default = "default_worker_cap")]
    pub worker_cap: usize,
    /// Cancel siblings on first error. `None` behaves as true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
    /// Registry name of the observer.
    #[serde(default = "default_noop_observer")]
    pub observer: String,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            worker_cap: default_worker_cap(),
            fail_fast: None,
            observer: default_noop_observer(),
        }
    }
}

impl ParallelConfig {
    /// Effective fail-fast mode: unset means true.
    #[must_use]
    pub fn fail_fast(&self) -> bool {
        self.fail_fast.unwrap_or(true)
    }

    /// Overlays explicitly-set values from `overlay` onto this config.
    ///
    /// An unset `fail_fast` in the overlay leaves the base untouched, so an
    /// explicit `Some(false)` survives composition.
    #[must_use]
    pub fn merged(mut self, overlay: &ParallelConfig) -> Self {
        if overlay.max_workers != 0 {
            self.max_workers = overlay.max_workers;
        }
        if overlay.worker_cap != default_worker_cap() {
            self.worker_cap = overlay.worker_cap;
        }
        if overlay.fail_fast.is_some() {
            self.fail_fast = overlay.fail_fast;
        }
        if overlay.observer != default_noop_observer() {
            self.observer = overlay.observer.clone();
        }
        self
    }

    /// Worker count for an input of `items` elements.
    ///
    /// `min(min(max_workers, worker_cap), items)`, never zero for non-empty
    /// input; `max_workers == 0` resolves to twice the reported CPU count.
    #[must_use]
    pub fn effective_workers(&self, items: usize) -> usize {
        if items == 0 {
            return 0;
        }
        let auto = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(2);
        let max_workers = if self.max_workers == 0 {
            auto
        } else {
            self.max_workers
        };
        let cap = self.worker_cap.max(1);
        max_workers.min(cap).min(items).max(1)
    }
}

/// Configuration for conditional routing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionalConfig {
    /// Registry name of the observer.
    #[serde(default = "default_noop_observer")]
    pub observer: String,
}

impl Default for ConditionalConfig {
    fn default() -> Self {
        Self {
            observer: default_noop_observer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_config_defaults() {
        let cfg = GraphConfig::new("wf");
        assert_eq!(cfg.observer, "tracing");
        assert_eq!(cfg.max_iterations, 1000);
        assert!(cfg.checkpoint.is_none());
    }

    #[test]
    fn test_parallel_fail_fast_tri_state() {
        let unset = ParallelConfig::default();
        assert!(unset.fail_fast());

        let explicit_off = ParallelConfig {
            fail_fast: Some(false),
            ..Default::default()
        };
        assert!(!explicit_off.fail_fast());

        // Merging an unset overlay keeps the explicit false.
        let merged = explicit_off.merged(&ParallelConfig::default());
        assert_eq!(merged.fail_fast, Some(false));

        // Merging an explicit overlay wins.
        let merged = ParallelConfig::default().merged(&ParallelConfig {
            fail_fast: Some(false),
            ..Default::default()
        });
        assert!(!merged.fail_fast());
    }

    #[test]
    fn test_effective_workers_bounds() {
        let cfg = ParallelConfig {
            max_workers: 8,
            worker_cap: 4,
            ..Default::default()
        };
        assert_eq!(cfg.effective_workers(100), 4);
        assert_eq!(cfg.effective_workers(3), 3);
        assert_eq!(cfg.effective_workers(1), 1);
        assert_eq!(cfg.effective_workers(0), 0);
    }

    #[test]
    fn test_checkpoint_config_from_json() {
        let cfg: CheckpointConfig =
            serde_json::from_str(r#"{"interval": 2, "preserve": true}"#).unwrap();
        assert_eq!(cfg.store, "memory");
        assert_eq!(cfg.interval, 2);
        assert!(cfg.preserve);
    }
}
