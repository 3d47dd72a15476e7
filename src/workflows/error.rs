use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::observability::ObserverError;
use crate::BoxError;

/// Cause recorded when a pattern stops because its context was cancelled.
#[derive(Debug, Error)]
#[error("execution cancelled")]
pub struct Cancelled;

/// Cause recorded when routing selects a name with no handler and no
/// default is registered.
#[derive(Debug, Error)]
#[error("no handler registered for route '{route}'")]
pub struct NoHandler {
    pub route: String,
}

/// One failed task inside a parallel run.
///
/// Captures the item's original index and the item itself so callers can
/// retry or report precisely, with the processor's error as the source.
#[derive(Debug, Error)]
#[error("task {index} failed: {source}")]
pub struct TaskError<I> {
    /// Original position of the item in the input sequence.
    pub index: usize,
    /// The item being processed when the error occurred.
    pub item: I,
    #[source]
    pub source: BoxError,
}

/// Rich error context for sequential chain failures.
///
/// The `Step` variant preserves complete failure state: the 0-based step
/// index, the item being processed, and the accumulated state at the
/// failure point. The underlying processor error stays reachable through
/// `std::error::Error::source`.
#[derive(Debug, Error)]
pub enum ChainError<I, C> {
    #[error(transparent)]
    Observer(#[from] ObserverError),

    #[error("chain failed at step {step_index}: {source}")]
    Step {
        /// 0-based index of the step that failed.
        step_index: usize,
        /// The item being processed when the error occurred.
        item: I,
        /// Accumulated state at the time of failure.
        state: C,
        #[source]
        source: BoxError,
    },
}

/// Aggregate failure from a parallel run.
#[derive(Debug)]
pub enum ParallelError<I> {
    Observer(ObserverError),
    Join(tokio::task::JoinError),
    /// Task failures collected in original-index order.
    Failed { errors: Vec<TaskError<I>> },
}

impl<I> From<ObserverError> for ParallelError<I> {
    fn from(err: ObserverError) -> Self {
        Self::Observer(err)
    }
}

impl<I> From<tokio::task::JoinError> for ParallelError<I> {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err)
    }
}

impl<I> ParallelError<I> {
    /// The collected task errors; empty for non-task failures.
    #[must_use]
    pub fn task_errors(&self) -> &[TaskError<I>] {
        match self {
            Self::Failed { errors } => errors,
            _ => &[],
        }
    }
}

impl<I> fmt::Display for ParallelError<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observer(err) => err.fmt(f),
            Self::Join(err) => write!(f, "parallel worker task failed: {err}"),
            Self::Failed { errors } => {
                // Group by cause message so repeated failures read as one
                // category with a count.
                let mut categories: BTreeMap<String, usize> = BTreeMap::new();
                for err in errors {
                    *categories.entry(err.source.to_string()).or_insert(0) += 1;
                }
                let mut ordered: Vec<(String, usize)> = categories.into_iter().collect();
                ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

                write!(
                    f,
                    "parallel execution failed: {} items failed with {} error types: ",
                    errors.len(),
                    ordered.len()
                )?;
                for (i, (message, count)) in ordered.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{message}' ({count} items)")?;
                }
                Ok(())
            }
        }
    }
}

impl<I: fmt::Debug + 'static> std::error::Error for ParallelError<I> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Observer(err) => Some(err),
            Self::Join(err) => Some(err),
            Self::Failed { errors } => errors
                .first()
                .map(|err| err as &(dyn std::error::Error + 'static)),
        }
    }
}

/// Failure from conditional routing.
#[derive(Debug, Error)]
pub enum ConditionalError<S> {
    #[error(transparent)]
    Observer(#[from] ObserverError),

    #[error("conditional route '{route}' failed: {source}")]
    Route {
        /// Selected route name; empty when the predicate itself failed.
        route: String,
        /// The state before the failing step.
        state: S,
        #[source]
        source: BoxError,
    },
}
