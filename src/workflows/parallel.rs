use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::ParallelConfig;
use crate::observability::{get_observer, Event, EventType};
use crate::BoxError;

use super::error::{ParallelError, TaskError};

const EVENT_SOURCE: &str = "parallel";

/// Callback invoked after each successful item with `(completed, total)`.
/// Invocation order across workers is not guaranteed.
pub type ParallelProgress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Outcome of a parallel run.
///
/// `results` holds successful values compacted in original input order;
/// `errors` holds failures in index order. In fail-fast mode a successful
/// return always has an empty `errors` list; in collect-all mode callers
/// must inspect it, since partial success is not an error.
#[derive(Debug)]
pub struct ParallelResult<I, R> {
    pub results: Vec<R>,
    pub errors: Vec<TaskError<I>>,
}

/// Processes items concurrently on a bounded worker pool.
///
/// Work is distributed through a buffered queue sized to the input, results
/// flow to a dedicated collector through an equally-sized buffer, so
/// workers never block on submission and the pool cannot deadlock. Worker
/// count is `min(min(max_workers, worker_cap), items)`.
///
/// With fail-fast on (the default), workers share a child token of the
/// caller's context; the first error cancels it and remaining workers stop
/// picking up work, while in-flight items may still finish. With fail-fast
/// off, every item runs to completion regardless of sibling failures and
/// the call errs only when all items failed.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use orchestrion::config::ParallelConfig;
/// use orchestrion::workflows::process_parallel;
///
/// # #[tokio::main(flavor = "multi_thread")]
/// # async fn main() {
/// let result = process_parallel(
///     CancellationToken::new(),
///     &ParallelConfig::default(),
///     vec![1u64, 2, 3],
///     |_ctx, item| async move { Ok(item * 10) },
///     None,
/// )
/// .await
/// .unwrap();
/// assert_eq!(result.results, vec![10, 20, 30]);
/// # }
/// ```
pub async fn process_parallel<I, R, F, Fut>(
    ctx: CancellationToken,
    config: &ParallelConfig,
    items: Vec<I>,
    processor: F,
    progress: Option<ParallelProgress>,
) -> Result<ParallelResult<I, R>, ParallelError<I>>
where
    I: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(CancellationToken, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    let observer = get_observer(&config.observer)?;
    let total = items.len();
    let fail_fast = config.fail_fast();
    let workers = config.effective_workers(total);

    observer.on_event(
        Event::new(EventType::ParallelStart, EVENT_SOURCE)
            .with("workers", json!(workers))
            .with("items", json!(total)),
    );

    if total == 0 {
        observer.on_event(
            Event::new(EventType::ParallelComplete, EVENT_SOURCE)
                .with("succeeded", json!(0))
                .with("failed", json!(0)),
        );
        return Ok(ParallelResult {
            results: Vec::new(),
            errors: Vec::new(),
        });
    }

    // Buffered to the full input so distribution and submission never block.
    let (work_tx, work_rx) = flume::bounded::<(usize, I)>(total);
    for entry in items.into_iter().enumerate() {
        let _ = work_tx.send(entry);
    }
    drop(work_tx);

    let (result_tx, result_rx) = flume::bounded::<(usize, I, Result<R, BoxError>)>(total);

    // Fail-fast gets a cancellable child so sibling shutdown never cancels
    // the caller's own context; collect-all observes the caller directly.
    let run_token = if fail_fast {
        ctx.child_token()
    } else {
        ctx.clone()
    };

    let processor = Arc::new(processor);
    let completed = Arc::new(AtomicUsize::new(0));

    let collector = tokio::spawn(async move {
        let mut slots: Vec<Option<(I, Result<R, BoxError>)>> = (0..total).map(|_| None).collect();
        while let Ok((index, item, result)) = result_rx.recv_async().await {
            slots[index] = Some((item, result));
        }
        slots
    });

    let mut worker_handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let token = run_token.clone();
        let processor = processor.clone();
        let observer = observer.clone();
        let progress = progress.clone();
        let completed = completed.clone();
        worker_handles.push(tokio::spawn(async move {
            while let Ok((index, item)) = work_rx.recv_async().await {
                if token.is_cancelled() {
                    break;
                }
                observer.on_event(
                    Event::new(EventType::WorkerStart, EVENT_SOURCE).with("index", json!(index)),
                );
                let result = processor(token.clone(), item.clone()).await;
                let failed = result.is_err();
                if failed && fail_fast {
                    token.cancel();
                }
                observer.on_event(
                    Event::new(EventType::WorkerComplete, EVENT_SOURCE)
                        .with("index", json!(index))
                        .with("error", json!(failed)),
                );
                if !failed {
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(progress) = &progress {
                        progress(done, total);
                    }
                }
                let _ = result_tx.send_async((index, item, result)).await;
            }
        }));
    }
    drop(result_tx);
    drop(work_rx);

    for handle in worker_handles {
        handle.await?;
    }
    let slots = collector.await?;

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some((_, Ok(value))) => results.push(value),
            Some((item, Err(source))) => errors.push(TaskError {
                index,
                item,
                source,
            }),
            // Unprocessed after cancellation: neither success nor failure.
            None => {}
        }
    }

    observer.on_event(
        Event::new(EventType::ParallelComplete, EVENT_SOURCE)
            .with("succeeded", json!(results.len()))
            .with("failed", json!(errors.len())),
    );

    if fail_fast {
        if errors.is_empty() {
            Ok(ParallelResult {
                results,
                errors: Vec::new(),
            })
        } else {
            Err(ParallelError::Failed { errors })
        }
    } else if errors.len() == total {
        Err(ParallelError::Failed { errors })
    } else {
        Ok(ParallelResult { results, errors })
    }
}
