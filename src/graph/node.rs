use async_trait::async_trait;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::state::State;
use crate::BoxError;

/// Execution context handed to a node for one invocation.
///
/// Carries the node's registered name, the 1-based iteration at which it is
/// running, and the run's cancellation token. Long-running nodes should
/// observe the token and bail out promptly when it trips.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name this node is registered under in the graph.
    pub node: String,
    /// Current iteration of the traversal loop (counts revisits).
    pub iteration: u64,
    /// Cancellation signal for the enclosing run.
    pub cancellation: CancellationToken,
}

/// A single unit of computation within a workflow graph.
///
/// Nodes receive the current state and return a transformed state; the
/// interpreter records the node as the state's checkpoint node afterwards.
/// Implementations should be deterministic where resumability matters: a
/// resumed run re-executes only the nodes after the last checkpoint.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::json;
/// use orchestrion::graph::{Node, NodeContext, NodeError};
/// use orchestrion::state::State;
///
/// struct Tagger;
///
/// #[async_trait]
/// impl Node for Tagger {
///     async fn run(&self, state: State, _ctx: NodeContext) -> Result<State, NodeError> {
///         Ok(state.set("tagged", json!(true)))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: State, ctx: NodeContext) -> Result<State, NodeError>;
}

type NodeFn =
    Arc<dyn Fn(State, NodeContext) -> BoxFuture<'static, Result<State, NodeError>> + Send + Sync>;

/// Wraps an async closure as a [`Node`].
///
/// The function-wrapping convenience for inline computation steps; the
/// pattern-wrapping variants live in [`crate::workflows::nodes`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use orchestrion::graph::FnNode;
///
/// let node = FnNode::new(|state, _ctx| async move {
///     Ok(state.set("x", json!(1)))
/// });
/// ```
#[derive(Clone)]
pub struct FnNode {
    f: NodeFn,
}

impl FnNode {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(State, NodeContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<State, NodeError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |state, ctx| Box::pin(f(state, ctx))),
        }
    }
}

#[async_trait]
impl Node for FnNode {
    async fn run(&self, state: State, ctx: NodeContext) -> Result<State, NodeError> {
        (self.f)(state, ctx).await
    }
}

/// Fatal errors from node execution; these halt the enclosing run.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(orchestrion::node::missing_input),
        help("Check that an upstream node produced the required key.")
    )]
    MissingInput { what: &'static str },

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(code(orchestrion::node::validation))]
    ValidationFailed(String),

    /// JSON (de)serialization error.
    #[error(transparent)]
    #[diagnostic(code(orchestrion::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Domain-specific failure raised by a node implementation.
    #[error("node failed: {0}")]
    #[diagnostic(code(orchestrion::node::failed))]
    Failed(String),

    /// An embedded sequential fold failed.
    #[error("chain node failed: {source}")]
    #[diagnostic(code(orchestrion::node::chain))]
    Chain {
        #[source]
        source: BoxError,
    },

    /// An embedded parallel fan-out failed.
    #[error("parallel node failed: {source}")]
    #[diagnostic(code(orchestrion::node::parallel))]
    Parallel {
        #[source]
        source: BoxError,
    },

    /// An embedded conditional route failed.
    #[error("conditional node failed: {source}")]
    #[diagnostic(code(orchestrion::node::conditional))]
    Conditional {
        #[source]
        source: BoxError,
    },
}
