//! Bounded fan-out of independent queries.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

use crate::error::Result;

/// Runs `task` for every item with at most `concurrency` calls in flight and
/// returns the outputs in input order.
///
/// Results are gathered through a buffered channel. The first error closes
/// the semaphore: tasks that have not started yet give up without running,
/// while tasks already running finish (or hit their own timeout). Once every
/// task has ended, that first error is returned.
pub(crate) async fn bounded_fan_out<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    task: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel(total);
    let mut handles = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let task = task.clone();
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            let result = task(item).await;
            // The receiver outlives every sender, so this cannot fail.
            let _ = tx.send((index, result)).await;
        }));
    }
    drop(tx);

    let mut outputs: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut first_error = None;
    while let Some((index, result)) = rx.recv().await {
        match result {
            Ok(output) => outputs[index] = Some(output),
            Err(err) if first_error.is_none() => {
                debug!(error = %err, "fan-out task failed, not starting further tasks");
                semaphore.close();
                first_error = Some(err);
            }
            Err(err) => debug!(error = %err, "additional fan-out failure"),
        }
    }

    for joined in join_all(handles).await {
        if let Err(err) = joined {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(outputs.into_iter().flatten().collect()),
    }
}
