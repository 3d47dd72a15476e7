use miette::Diagnostic;
use thiserror::Error;

use crate::state::{CheckpointError, State};

use super::node::NodeError;
use crate::observability::ObserverError;

/// Errors from graph construction and validation.
///
/// These are unrecoverable for the graph being built: the configuration or
/// topology must be corrected before execution can be attempted.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("node name must not be empty")]
    #[diagnostic(code(orchestrion::graph::empty_node_name))]
    EmptyNodeName,

    #[error("node already registered: {name}")]
    #[diagnostic(code(orchestrion::graph::duplicate_node))]
    DuplicateNode { name: String },

    #[error("unknown node: {name}")]
    #[diagnostic(
        code(orchestrion::graph::unknown_node),
        help("Register the node with add_node before referencing it.")
    )]
    UnknownNode { name: String },

    #[error("edge endpoints must not be empty")]
    #[diagnostic(code(orchestrion::graph::empty_edge_endpoint))]
    EmptyEdgeEndpoint,

    #[error("entry point already set: {existing}")]
    #[diagnostic(code(orchestrion::graph::entry_point_already_set))]
    EntryPointAlreadySet { existing: String },

    #[error("graph has no nodes")]
    #[diagnostic(code(orchestrion::graph::no_nodes))]
    NoNodes,

    #[error("entry point not set")]
    #[diagnostic(code(orchestrion::graph::missing_entry_point))]
    MissingEntryPoint,

    #[error("no exit points configured")]
    #[diagnostic(
        code(orchestrion::graph::missing_exit_points),
        help("Mark at least one node with add_exit_point; traversal terminates there.")
    )]
    MissingExitPoints,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Observer(#[from] ObserverError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// The cause inside an [`ExecutionError`].
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionFailure {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] GraphError),

    #[error("execution cancelled")]
    #[diagnostic(code(orchestrion::execution::cancelled))]
    Cancelled,

    #[error("iteration cap exceeded: {max}")]
    #[diagnostic(
        code(orchestrion::execution::iteration_cap),
        help("A cycle is not converging; raise max_iterations or fix the exit predicate.")
    )]
    IterationCap { max: u64 },

    #[error("node not registered: {name}")]
    #[diagnostic(code(orchestrion::execution::missing_node))]
    MissingNode { name: String },

    #[error("no outgoing edges from '{name}' and it is not an exit point")]
    #[diagnostic(code(orchestrion::execution::no_outgoing_edges))]
    NoOutgoingEdges { name: String },

    #[error("no valid transition from '{name}'")]
    #[diagnostic(
        code(orchestrion::execution::no_transition),
        help("Every predicate on the node's outgoing edges evaluated false for the current state.")
    )]
    NoTransition { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("resume requires a configured checkpoint store")]
    #[diagnostic(code(orchestrion::execution::resume_without_store))]
    ResumeWithoutStore,

    #[error("checkpoint node '{name}' is an exit point; the run already completed")]
    #[diagnostic(code(orchestrion::execution::already_complete))]
    AlreadyComplete { name: String },
}

/// Rich failure context from graph interpretation.
///
/// Carries the failing node, the last known-good state, and the full
/// visited path, with the underlying cause reachable through
/// `std::error::Error::source`. When checkpointing was enabled and at least
/// one save succeeded, the run id in [`state`](Self::state) can be handed
/// to [`Graph::resume`](super::Graph::resume).
#[derive(Debug, Error, Diagnostic)]
#[error("graph execution failed at node '{node}': {cause}")]
pub struct ExecutionError {
    /// Name of the node at which execution failed; empty when the failure
    /// precedes traversal (validation, checkpoint load).
    pub node: String,
    /// The state at failure, the last known-good snapshot.
    pub state: State,
    /// Ordered node names visited so far, revisits included.
    pub path: Vec<String>,
    #[source]
    #[diagnostic_source]
    pub cause: ExecutionFailure,
}

impl ExecutionError {
    pub(crate) fn new(
        node: impl Into<String>,
        state: State,
        path: Vec<String>,
        cause: ExecutionFailure,
    ) -> Self {
        Self {
            node: node.into(),
            state,
            path,
            cause,
        }
    }
}
