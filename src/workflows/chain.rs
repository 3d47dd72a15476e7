use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ChainConfig;
use crate::observability::{get_observer, Event, EventType};
use crate::BoxError;

use super::error::{Cancelled, ChainError};

const EVENT_SOURCE: &str = "chain";

/// Callback invoked after each successful step with
/// `(completed, total, current_state)`.
pub type ChainProgress<C> = Arc<dyn Fn(usize, usize, &C) + Send + Sync>;

/// Outcome of a completed chain.
#[derive(Debug, Clone)]
pub struct ChainResult<C> {
    /// State after the final step (the initial state for empty input).
    pub final_state: C,
    /// Every state including the initial one, present only when capture
    /// was requested.
    pub intermediate: Option<Vec<C>>,
    /// Number of steps executed.
    pub steps: usize,
}

/// Processes items in order with state accumulation between steps.
///
/// A fold: each step receives the accumulated state and returns an updated
/// state. The first failure stops the chain and is returned as a
/// [`ChainError::Step`] carrying the step index, the item, and the state
/// at failure; completed steps are not rolled back. The progress callback
/// fires after each successful step and never after a failure.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use orchestrion::config::ChainConfig;
/// use orchestrion::workflows::process_chain;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let result = process_chain(
///     CancellationToken::new(),
///     &ChainConfig::default(),
///     vec![1i64, 2, 3],
///     0i64,
///     |_ctx, item, acc| async move { Ok(acc + item) },
///     None,
/// )
/// .await
/// .unwrap();
/// assert_eq!(result.final_state, 6);
/// assert_eq!(result.steps, 3);
/// # }
/// ```
pub async fn process_chain<I, C, F, Fut>(
    ctx: CancellationToken,
    config: &ChainConfig,
    items: Vec<I>,
    initial: C,
    processor: F,
    progress: Option<ChainProgress<C>>,
) -> Result<ChainResult<C>, ChainError<I, C>>
where
    I: Clone,
    C: Clone,
    F: Fn(CancellationToken, I, C) -> Fut,
    Fut: Future<Output = Result<C, BoxError>>,
{
    let observer = get_observer(&config.observer)?;
    observer.on_event(
        Event::new(EventType::ChainStart, EVENT_SOURCE)
            .with("items", json!(items.len()))
            .with("capture", json!(config.capture_intermediate_states)),
    );

    if items.is_empty() {
        observer
            .on_event(Event::new(EventType::ChainComplete, EVENT_SOURCE).with("steps", json!(0)));
        return Ok(ChainResult {
            final_state: initial,
            intermediate: None,
            steps: 0,
        });
    }

    let total = items.len();
    let mut state = initial;
    let mut intermediate = config
        .capture_intermediate_states
        .then(|| vec![state.clone()]);

    for (index, item) in items.into_iter().enumerate() {
        if ctx.is_cancelled() {
            return Err(ChainError::Step {
                step_index: index,
                item,
                state,
                source: Box::new(Cancelled),
            });
        }

        observer.on_event(Event::new(EventType::StepStart, EVENT_SOURCE).with("index", json!(index)));
        let result = processor(ctx.clone(), item.clone(), state.clone()).await;
        observer.on_event(
            Event::new(EventType::StepComplete, EVENT_SOURCE)
                .with("index", json!(index))
                .with("error", json!(result.is_err())),
        );

        match result {
            Ok(next) => {
                state = next;
                if let Some(states) = &mut intermediate {
                    states.push(state.clone());
                }
                if let Some(progress) = &progress {
                    progress(index + 1, total, &state);
                }
            }
            Err(source) => {
                return Err(ChainError::Step {
                    step_index: index,
                    item,
                    state,
                    source,
                });
            }
        }
    }

    observer.on_event(Event::new(EventType::ChainComplete, EVENT_SOURCE).with("steps", json!(total)));
    Ok(ChainResult {
        final_state: state,
        intermediate,
        steps: total,
    })
}
