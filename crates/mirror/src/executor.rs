// Bounded executor: runs deferred operations with a cap on how many are in flight.

use std::future::Future;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, trace};

/// Runs `operations` with at most `limit` in flight, admitting them in order.
///
/// Each operation is only invoked once a slot is free. After the first
/// failure no further operations are admitted; the ones already running are
/// allowed to settle, then the first error is returned. On success the number
/// of completed operations is returned. A `limit` of 0 behaves as 1.
pub async fn run_bounded<I, F, Fut, E>(operations: I, limit: usize) -> Result<usize, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let limit = limit.max(1);
    let mut pending = operations.into_iter();
    let mut in_flight = FuturesUnordered::new();
    let mut first_error: Option<E> = None;
    let mut completed = 0usize;

    loop {
        while first_error.is_none() && in_flight.len() < limit {
            match pending.next() {
                Some(operation) => in_flight.push(operation()),
                None => break,
            }
        }

        match in_flight.next().await {
            Some(Ok(())) => {
                completed += 1;
                trace!(completed, in_flight = in_flight.len(), "Operation settled");
            }
            Some(Err(err)) => {
                if first_error.is_none() {
                    debug!(
                        completed,
                        in_flight = in_flight.len(),
                        "Operation failed, admitting no further operations"
                    );
                    first_error = Some(err);
                }
            }
            None => break,
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(completed),
    }
}
