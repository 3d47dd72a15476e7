use rustc_hash::FxHashMap;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::observability::{Event, EventType};
use crate::state::State;

use super::error::{ExecutionError, ExecutionFailure};
use super::graph::Graph;
use super::node::NodeContext;

impl Graph {
    /// Runs the graph from its entry point with `initial` state.
    ///
    /// Nodes execute one at a time; after each node the returned state is
    /// stamped with that node as its checkpoint node and, at the configured
    /// interval, persisted. Traversal ends successfully when an exit point
    /// completes. On failure the returned [`ExecutionError`] carries the
    /// failing node, the last known-good state, and the visited path; if a
    /// checkpoint was saved, that state's run id is usable with
    /// [`resume`](Self::resume).
    pub async fn execute(
        &self,
        ctx: CancellationToken,
        initial: State,
    ) -> Result<State, ExecutionError> {
        if let Err(err) = self.validate() {
            return Err(ExecutionError::new("", initial, Vec::new(), err.into()));
        }
        let entry = self
            .entry_point
            .clone()
            .expect("validated graph has an entry point");
        self.run_loop(ctx, initial, entry).await
    }

    /// Continues an interrupted run from its last checkpoint.
    ///
    /// Loads the checkpoint for `run_id`, determines the next node by
    /// evaluating the checkpoint node's outgoing edges against the loaded
    /// state (first match wins), then enters the normal traversal loop at
    /// that node. Completed work is not re-executed. Fails when no
    /// checkpoint store is configured, the checkpoint node is itself an
    /// exit point (the run had already completed), or no transition
    /// matches.
    pub async fn resume(
        &self,
        ctx: CancellationToken,
        run_id: &str,
    ) -> Result<State, ExecutionError> {
        if let Err(err) = self.validate() {
            return Err(ExecutionError::new("", State::new(None), Vec::new(), err.into()));
        }
        let store = match &self.checkpoint_store {
            Some(store) => store,
            None => {
                return Err(ExecutionError::new(
                    "",
                    State::new(None),
                    Vec::new(),
                    ExecutionFailure::ResumeWithoutStore,
                ))
            }
        };

        let state = match store.load(run_id).await {
            Ok(state) => state,
            Err(err) => {
                return Err(ExecutionError::new(
                    "",
                    State::new(None),
                    Vec::new(),
                    err.into(),
                ))
            }
        };
        let checkpoint_node = state.checkpoint_node().to_string();
        self.observer.on_event(
            Event::new(EventType::CheckpointLoad, &self.name)
                .with("run_id", json!(run_id))
                .with("checkpoint_node", json!(checkpoint_node)),
        );

        if self.exit_points.contains(&checkpoint_node) {
            return Err(ExecutionError::new(
                checkpoint_node.clone(),
                state,
                Vec::new(),
                ExecutionFailure::AlreadyComplete {
                    name: checkpoint_node,
                },
            ));
        }

        let outgoing = match self.edges.get(&checkpoint_node) {
            Some(edges) if !edges.is_empty() => edges,
            _ => {
                return Err(ExecutionError::new(
                    checkpoint_node.clone(),
                    state,
                    Vec::new(),
                    ExecutionFailure::NoOutgoingEdges {
                        name: checkpoint_node,
                    },
                ))
            }
        };
        let resume_node = match outgoing.iter().find(|edge| edge.matches(&state)) {
            Some(edge) => edge.to.clone(),
            None => {
                return Err(ExecutionError::new(
                    checkpoint_node.clone(),
                    state,
                    Vec::new(),
                    ExecutionFailure::NoTransition {
                        name: checkpoint_node,
                    },
                ))
            }
        };

        self.observer.on_event(
            Event::new(EventType::CheckpointResume, &self.name)
                .with("checkpoint_node", json!(checkpoint_node))
                .with("resume_node", json!(resume_node))
                .with("run_id", json!(run_id)),
        );

        self.run_loop(ctx, state, resume_node).await
    }

    /// Shared traversal loop for execute and resume.
    async fn run_loop(
        &self,
        ctx: CancellationToken,
        mut state: State,
        start: String,
    ) -> Result<State, ExecutionError> {
        self.observer.on_event(
            Event::new(EventType::GraphStart, &self.name)
                .with("entry_point", json!(start))
                .with("run_id", json!(state.run_id()))
                .with("exit_points", json!(self.exit_points.len())),
        );

        let mut iterations: u64 = 0;
        let mut visited: FxHashMap<String, u64> = FxHashMap::default();
        let mut path: Vec<String> = Vec::new();
        let mut current = start;

        loop {
            if ctx.is_cancelled() {
                return Err(ExecutionError::new(
                    current,
                    state,
                    path,
                    ExecutionFailure::Cancelled,
                ));
            }

            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ExecutionError::new(
                    current,
                    state,
                    path,
                    ExecutionFailure::IterationCap {
                        max: self.max_iterations,
                    },
                ));
            }

            path.push(current.clone());
            let visits = visited.entry(current.clone()).or_insert(0);
            *visits += 1;
            if *visits > 1 {
                self.observer.on_event(
                    Event::new(EventType::CycleDetected, &self.name)
                        .with("node", json!(current))
                        .with("visit_count", json!(*visits))
                        .with("iteration", json!(iterations))
                        .with("path_length", json!(path.len())),
                );
            }

            let node = match self.nodes.get(&current) {
                Some(node) => node.clone(),
                None => {
                    return Err(ExecutionError::new(
                        current.clone(),
                        state,
                        path,
                        ExecutionFailure::MissingNode { name: current },
                    ))
                }
            };

            self.observer.on_event(
                Event::new(EventType::NodeStart, &self.name)
                    .with("node", json!(current))
                    .with("iteration", json!(iterations)),
            );
            let node_ctx = NodeContext {
                node: current.clone(),
                iteration: iterations,
                cancellation: ctx.clone(),
            };
            let result = node.run(state.clone(), node_ctx).await;
            self.observer.on_event(
                Event::new(EventType::NodeComplete, &self.name)
                    .with("node", json!(current))
                    .with("iteration", json!(iterations))
                    .with("error", json!(result.is_err())),
            );
            let next_state = match result {
                Ok(next_state) => next_state,
                Err(err) => {
                    return Err(ExecutionError::new(current, state, path, err.into()));
                }
            };

            state = next_state.with_checkpoint_node(&current);

            if let Some(store) = &self.checkpoint_store {
                if self.checkpoint_interval > 0 && iterations % self.checkpoint_interval == 0 {
                    if let Err(err) = state.checkpoint(store.as_ref()).await {
                        return Err(ExecutionError::new(current, state, path, err.into()));
                    }
                    self.observer.on_event(
                        Event::new(EventType::CheckpointSave, &self.name)
                            .with("node", json!(current))
                            .with("iteration", json!(iterations))
                            .with("run_id", json!(state.run_id())),
                    );
                }
            }

            if self.exit_points.contains(&current) {
                self.observer.on_event(
                    Event::new(EventType::GraphComplete, &self.name)
                        .with("node", json!(current))
                        .with("iterations", json!(iterations))
                        .with("path_length", json!(path.len()))
                        .with("run_id", json!(state.run_id())),
                );
                if let Some(store) = &self.checkpoint_store {
                    if !self.preserve_checkpoint {
                        // Cleanup failure does not fail a completed run.
                        if let Err(err) = store.delete(state.run_id()).await {
                            tracing::debug!(
                                run_id = state.run_id(),
                                error = %err,
                                "failed to delete checkpoint after completion"
                            );
                        }
                    }
                }
                return Ok(state);
            }

            let outgoing = match self.edges.get(&current) {
                Some(edges) if !edges.is_empty() => edges,
                _ => {
                    return Err(ExecutionError::new(
                        current.clone(),
                        state,
                        path,
                        ExecutionFailure::NoOutgoingEdges { name: current },
                    ))
                }
            };

            let mut next = None;
            for (edge_index, edge) in outgoing.iter().enumerate() {
                self.observer.on_event(
                    Event::new(EventType::EdgeEvaluate, &self.name)
                        .with("from", json!(edge.from))
                        .with("to", json!(edge.to))
                        .with("edge_index", json!(edge_index))
                        .with("has_predicate", json!(edge.predicate.is_some())),
                );
                if edge.matches(&state) {
                    self.observer.on_event(
                        Event::new(EventType::EdgeTransition, &self.name)
                            .with("from", json!(edge.from))
                            .with("to", json!(edge.to)),
                    );
                    next = Some(edge.to.clone());
                    break;
                }
            }

            current = match next {
                Some(next) => next,
                None => {
                    return Err(ExecutionError::new(
                        current.clone(),
                        state,
                        path,
                        ExecutionFailure::NoTransition { name: current },
                    ))
                }
            };
        }
    }
}
