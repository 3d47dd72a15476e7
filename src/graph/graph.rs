use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::GraphConfig;
use crate::observability::{get_observer, Observer};
use crate::state::{get_checkpoint_store, CheckpointStore};

use super::edge::Edge;
use super::error::GraphError;
use super::node::Node;
use super::predicate::TransitionPredicate;

/// A workflow defined as a directed graph of named nodes.
///
/// Built once through the fallible fluent API, then immutable during
/// execution. Executing the same graph concurrently for distinct runs is
/// safe; mutating it concurrently with execution is not (the type system
/// prevents it, since the mutators consume `self`).
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use orchestrion::config::GraphConfig;
/// use orchestrion::graph::{key_equals, FnNode, Graph};
///
/// # fn build() -> Result<Graph, orchestrion::graph::GraphError> {
/// let graph = Graph::new(GraphConfig::new("review").with_observer("noop"))?
///     .add_node("analyze", FnNode::new(|s, _| async move {
///         Ok(s.set("status", json!("approved")))
///     }))?
///     .add_node("approve", FnNode::new(|s, _| async move { Ok(s) }))?
///     .add_edge("analyze", "approve", Some(key_equals("status", json!("approved"))))?
///     .set_entry_point("analyze")?
///     .add_exit_point("approve")?;
/// # Ok(graph)
/// # }
/// ```
pub struct Graph {
    pub(super) name: String,
    pub(super) nodes: FxHashMap<String, Arc<dyn Node>>,
    /// Outgoing edges per source node; the Vec preserves insertion order,
    /// which is the evaluation order.
    pub(super) edges: FxHashMap<String, Vec<Edge>>,
    pub(super) entry_point: Option<String>,
    pub(super) exit_points: FxHashSet<String>,
    pub(super) max_iterations: u64,
    pub(super) checkpoint_interval: u64,
    pub(super) preserve_checkpoint: bool,
    pub(super) observer: Arc<dyn Observer>,
    pub(super) checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

impl Graph {
    /// Creates an empty graph from configuration.
    ///
    /// The observer name is resolved through the registry immediately, and
    /// so is the checkpoint store when a checkpoint interval > 0 is
    /// configured. Unknown names fail construction rather than surfacing
    /// later at emit or save time.
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        let observer = get_observer(&config.observer)?;
        let (checkpoint_interval, preserve_checkpoint, checkpoint_store) =
            match &config.checkpoint {
                Some(cp) if cp.interval > 0 => {
                    (cp.interval, cp.preserve, Some(get_checkpoint_store(&cp.store)?))
                }
                _ => (0, false, None),
            };
        Ok(Self {
            name: config.name,
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            entry_point: None,
            exit_points: FxHashSet::default(),
            max_iterations: config.max_iterations,
            checkpoint_interval,
            preserve_checkpoint,
            observer,
            checkpoint_store,
        })
    }

    /// Graph name used as the event source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a computation step under a unique name.
    pub fn add_node(mut self, name: impl Into<String>, node: impl Node + 'static) -> Result<Self, GraphError> {
        let name = name.into();
        if name.is_empty() {
            return Err(GraphError::EmptyNodeName);
        }
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateNode { name });
        }
        self.nodes.insert(name, Arc::new(node));
        Ok(self)
    }

    /// Adds a directed transition; `predicate` of `None` is unconditional.
    ///
    /// Both endpoints must already be registered. Multiple edges from the
    /// same node are evaluated in the order they were added.
    pub fn add_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: Option<TransitionPredicate>,
    ) -> Result<Self, GraphError> {
        let (from, to) = (from.into(), to.into());
        if from.is_empty() || to.is_empty() {
            return Err(GraphError::EmptyEdgeEndpoint);
        }
        for endpoint in [&from, &to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    name: endpoint.clone(),
                });
            }
        }
        let edge = Edge::new(from.clone(), to, predicate);
        self.edges.entry(from).or_default().push(edge);
        Ok(self)
    }

    /// Defines the single starting node; a second call fails.
    pub fn set_entry_point(mut self, name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if let Some(existing) = &self.entry_point {
            return Err(GraphError::EntryPointAlreadySet {
                existing: existing.clone(),
            });
        }
        if !self.nodes.contains_key(&name) {
            return Err(GraphError::UnknownNode { name });
        }
        self.entry_point = Some(name);
        Ok(self)
    }

    /// Marks a node as terminal; repeated calls accumulate exit points.
    pub fn add_exit_point(mut self, name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if !self.nodes.contains_key(&name) {
            return Err(GraphError::UnknownNode { name });
        }
        self.exit_points.insert(name);
        Ok(self)
    }

    /// Checks the graph is runnable: at least one node, an entry point, and
    /// at least one exit point, all referring to registered nodes.
    ///
    /// Edge endpoints are checked at [`add_edge`](Self::add_edge) time, and
    /// entry/exit registration at their setters, so validation here guards
    /// only the completeness conditions.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::NoNodes);
        }
        match &self.entry_point {
            None => return Err(GraphError::MissingEntryPoint),
            Some(entry) if !self.nodes.contains_key(entry) => {
                return Err(GraphError::UnknownNode {
                    name: entry.clone(),
                })
            }
            Some(_) => {}
        }
        if self.exit_points.is_empty() {
            return Err(GraphError::MissingExitPoints);
        }
        for exit in &self.exit_points {
            if !self.nodes.contains_key(exit) {
                return Err(GraphError::UnknownNode { name: exit.clone() });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("entry_point", &self.entry_point)
            .field("exit_points", &self.exit_points)
            .field("max_iterations", &self.max_iterations)
            .field("checkpoint_interval", &self.checkpoint_interval)
            .finish_non_exhaustive()
    }
}
