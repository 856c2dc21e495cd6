//! Bounded fan-out and fail-fast fan-in.
//!
//! Every stage spawns one task per unit of work and joins on all of them.
//! The first fatal error returns immediately. Tasks that are still running
//! are detached, not aborted: their calls finish against the remote system
//! and their results are dropped.
//!
//! A run-wide [`CancellationToken`] is fired on that first error. Gates
//! built with `cancel_on_abort` watch it and turn pending and in-flight
//! calls into [`PrefillError::Cancelled`]; otherwise it is only a signal.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use prefill_common::{PrefillError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Limits how many remote calls a stage has in flight.
#[derive(Clone)]
pub struct CallGate {
    stage: &'static str,
    permits: Arc<Semaphore>,
    abort: CancellationToken,
    cancel_on_abort: bool,
}

impl CallGate {
    pub fn new(
        stage: &'static str,
        max_in_flight: usize,
        abort: CancellationToken,
        cancel_on_abort: bool,
    ) -> Self {
        Self {
            stage,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            abort,
            cancel_on_abort,
        }
    }

    pub fn abort_signal(&self) -> &CancellationToken {
        &self.abort
    }

    /// Number of calls that could start right now without waiting.
    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `call` once a permit is free.
    pub async fn call<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.cancel_on_abort {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| PrefillError::TaskFailed(e.to_string()))?;
            return call.await;
        }

        let outcome = tokio::select! {
            biased;
            _ = self.abort.cancelled() => Err(PrefillError::Cancelled),
            permit = self.permits.acquire() => {
                let _permit = permit.map_err(|e| PrefillError::TaskFailed(e.to_string()))?;
                tokio::select! {
                    biased;
                    _ = self.abort.cancelled() => Err(PrefillError::Cancelled),
                    result = call => result,
                }
            }
        };
        if matches!(outcome, Err(PrefillError::Cancelled)) {
            debug!(stage = self.stage, "call cancelled after abort");
        }
        outcome
    }
}

/// Spawn every future and collect their outputs in completion order.
///
/// Returns the first error observed and fires `abort`. A `Cancelled` error
/// only wins if no branch reports a real failure, so the cause reported is
/// the one that started the abort.
pub async fn join_fail_fast<T, I, Fut>(
    label: &str,
    abort: &CancellationToken,
    branches: I,
) -> Result<Vec<T>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut pending: FuturesUnordered<_> = branches.into_iter().map(tokio::spawn).collect();
    let total = pending.len();
    debug!(label, total, "fan-out started");

    let mut results = Vec::with_capacity(total);
    let mut cancelled = None;

    while let Some(joined) = pending.next().await {
        match joined {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(PrefillError::Cancelled)) => {
                cancelled.get_or_insert(PrefillError::Cancelled);
            }
            Ok(Err(err)) => {
                warn!(label, error = %err, in_flight = pending.len(), "fan-out aborted");
                abort.cancel();
                return Err(err);
            }
            Err(join_err) => {
                warn!(label, error = %join_err, "fan-out task failed");
                abort.cancel();
                return Err(PrefillError::TaskFailed(join_err.to_string()));
            }
        }
    }

    if let Some(err) = cancelled {
        return Err(err);
    }

    debug!(label, total, "fan-out joined");
    Ok(results)
}
