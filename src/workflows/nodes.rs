//! Pattern-wrapping graph nodes.
//!
//! Each adapter presents one workflow pattern as a [`Node`] so patterns can
//! be embedded in graph topologies. Adapters forward the node context's
//! cancellation token into the pattern and wrap pattern failures in the
//! matching [`NodeError`] variant, keeping the structured pattern error
//! reachable through the source chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::{ChainConfig, ConditionalConfig, ParallelConfig};
use crate::graph::{Node, NodeContext, NodeError};
use crate::state::State;
use crate::BoxError;

use super::chain::process_chain;
use super::conditional::{process_conditional, Routes};
use super::parallel::process_parallel;

type ChainProcessorFn<I, C> =
    Arc<dyn Fn(CancellationToken, I, C) -> BoxFuture<'static, Result<C, BoxError>> + Send + Sync>;
type ParallelProcessorFn<I, R> =
    Arc<dyn Fn(CancellationToken, I) -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync>;
type RoutePredicateFn = Arc<dyn Fn(&State) -> Result<String, BoxError> + Send + Sync>;

/// Embeds a sequential fold as a graph node.
///
/// The extractor pulls the fold's working context out of the graph state,
/// the processor folds the items over it, and the injector writes the final
/// context back into the state. When the working context is the graph
/// [`State`] itself, use [`ChainNode::over_state`].
pub struct ChainNode<I, C> {
    config: ChainConfig,
    items: Vec<I>,
    extract: Arc<dyn Fn(&State) -> C + Send + Sync>,
    processor: ChainProcessorFn<I, C>,
    inject: Arc<dyn Fn(C, State) -> State + Send + Sync>,
}

impl<I, C> ChainNode<I, C> {
    pub fn new<E, F, Fut, J>(
        config: ChainConfig,
        items: Vec<I>,
        extract: E,
        processor: F,
        inject: J,
    ) -> Self
    where
        E: Fn(&State) -> C + Send + Sync + 'static,
        F: Fn(CancellationToken, I, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, BoxError>> + Send + 'static,
        J: Fn(C, State) -> State + Send + Sync + 'static,
    {
        Self {
            config,
            items,
            extract: Arc::new(extract),
            processor: Arc::new(move |ctx, item, acc| Box::pin(processor(ctx, item, acc))),
            inject: Arc::new(inject),
        }
    }
}

impl<I> ChainNode<I, State> {
    /// Threads the graph state directly through the fold.
    pub fn over_state<F, Fut>(config: ChainConfig, items: Vec<I>, processor: F) -> Self
    where
        F: Fn(CancellationToken, I, State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<State, BoxError>> + Send + 'static,
    {
        Self::new(
            config,
            items,
            State::clone,
            processor,
            |folded, _original| folded,
        )
    }
}

#[async_trait]
impl<I, C> Node for ChainNode<I, C>
where
    I: Clone + fmt::Debug + Send + Sync + 'static,
    C: Clone + fmt::Debug + Send + Sync + 'static,
{
    async fn run(&self, state: State, ctx: NodeContext) -> Result<State, NodeError> {
        let initial = (self.extract)(&state);
        let processor = self.processor.clone();
        let result = process_chain(
            ctx.cancellation.clone(),
            &self.config,
            self.items.clone(),
            initial,
            move |token, item, acc| processor(token, item, acc),
            None,
        )
        .await
        .map_err(|err| NodeError::Chain {
            source: Box::new(err),
        })?;
        Ok((self.inject)(result.final_state, state))
    }
}

/// Embeds a bounded parallel fan-out as a graph node.
///
/// The aggregator bridges the parallel output shape back to the graph state
/// shape: it receives the successful results in original order together
/// with the incoming state and produces the outgoing state.
pub struct ParallelNode<I, R> {
    config: ParallelConfig,
    items: Vec<I>,
    processor: ParallelProcessorFn<I, R>,
    aggregate: Arc<dyn Fn(Vec<R>, State) -> State + Send + Sync>,
}

impl<I, R> ParallelNode<I, R> {
    pub fn new<F, Fut, A>(config: ParallelConfig, items: Vec<I>, processor: F, aggregate: A) -> Self
    where
        F: Fn(CancellationToken, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
        A: Fn(Vec<R>, State) -> State + Send + Sync + 'static,
    {
        Self {
            config,
            items,
            processor: Arc::new(move |ctx, item| Box::pin(processor(ctx, item))),
            aggregate: Arc::new(aggregate),
        }
    }
}

#[async_trait]
impl<I, R> Node for ParallelNode<I, R>
where
    I: Clone + fmt::Debug + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    async fn run(&self, state: State, ctx: NodeContext) -> Result<State, NodeError> {
        let processor = self.processor.clone();
        let result = process_parallel(
            ctx.cancellation.clone(),
            &self.config,
            self.items.clone(),
            move |token, item| processor(token, item),
            None,
        )
        .await
        .map_err(|err| NodeError::Parallel {
            source: Box::new(err),
        })?;
        Ok((self.aggregate)(result.results, state))
    }
}

/// Embeds predicate-based routing as a graph node.
pub struct ConditionalNode {
    config: ConditionalConfig,
    predicate: RoutePredicateFn,
    routes: Routes<State>,
}

impl ConditionalNode {
    pub fn new<P>(config: ConditionalConfig, predicate: P, routes: Routes<State>) -> Self
    where
        P: Fn(&State) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self {
            config,
            predicate: Arc::new(predicate),
            routes,
        }
    }
}

#[async_trait]
impl Node for ConditionalNode {
    async fn run(&self, state: State, ctx: NodeContext) -> Result<State, NodeError> {
        process_conditional(
            ctx.cancellation.clone(),
            &self.config,
            state,
            |s| (self.predicate)(s),
            &self.routes,
        )
        .await
        .map_err(|err| NodeError::Conditional {
            source: Box::new(err),
        })
    }
}
