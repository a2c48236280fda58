//! Bounded concurrent fan-out with positional re-association.
//!
//! Every task runs to completion. Results come back in submission order no
//! matter which task finished first, and all failures are collected instead of
//! stopping at the first one.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// A task that failed, tagged with its submission index.
#[derive(Debug)]
pub struct TaskFailure<E> {
    pub index: usize,
    pub error: E,
}

/// Run `task` over `inputs` with at most `limit` in flight (`0` = no limit).
///
/// Returns outputs in input order when every task succeeded, otherwise the
/// failures sorted by index.
pub async fn fan_out<I, T, E, F, Fut>(
    inputs: Vec<I>,
    limit: usize,
    task: F,
) -> Result<Vec<T>, Vec<TaskFailure<E>>>
where
    F: Fn(usize, I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total = inputs.len();
    let width = if limit == 0 { total.max(1) } else { limit };

    let mut outcomes: Vec<(usize, Result<T, E>)> = stream::iter(inputs.into_iter().enumerate())
        .map(|(index, input)| {
            let fut = task(index, input);
            async move { (index, fut.await) }
        })
        .buffer_unordered(width)
        .collect()
        .await;

    // Completion order is arbitrary; restore submission order.
    outcomes.sort_by_key(|(index, _)| *index);

    let mut outputs = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(value) => outputs.push(value),
            Err(error) => failures.push(TaskFailure { index, error }),
        }
    }

    if failures.is_empty() {
        Ok(outputs)
    } else {
        Err(failures)
    }
}

/// Split `items` into contiguous chunks of at most `size` (`size` >= 1).
pub fn partition<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}
