//! The attempt loop shared by reads and writes.
//!
//! One operation (a sub-batch bulk-get, one write) runs as a series of
//! attempts. Each attempt acquires its own connection slot inside the
//! closure it is given; nothing is held across attempts. The loop stops on
//! the first success, on a terminal error, when the retry budget is spent,
//! or when the end-to-end deadline has passed.
//!
//! The deadline is checked between attempts, never mid-attempt: an
//! in-flight request is already bounded by the request timeout, so the
//! worst case is the end-to-end budget plus one request timeout. Abandoned
//! attempts contribute nothing; there is no partial-result salvage.
//!
//! Every failed attempt ticks the exception counter exactly once, retried
//! or not, so the counter reflects attempts rather than operations.

use std::future::Future;

use tokio::time::Instant;

use super::error::ClientError;
use crate::metrics::StateMetrics;

/// Retry budget for one operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryBudget {
    /// Attempts allowed after the first failure.
    pub retries: u32,
    /// Wall-clock budget for the operation, retries included.
    pub e2e_timeout: std::time::Duration,
}

/// Run `attempt` until it succeeds or the budget is spent.
///
/// Transient errors are retried; terminal errors return immediately. After
/// the final transient failure the caller sees
/// [`ClientError::ExhaustedRetries`] wrapping it.
pub(crate) async fn run_attempts<T, F, Fut>(
    budget: RetryBudget,
    metrics: &StateMetrics,
    op: &'static str,
    mut attempt: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let started = Instant::now();
    let deadline = started + budget.e2e_timeout;
    let max_attempts = budget.retries.saturating_add(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        metrics.exception();

        if !err.is_transient() {
            return Err(err);
        }

        if attempts >= max_attempts || Instant::now() >= deadline {
            tracing::warn!(
                error = %err,
                attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                op,
                "cache operation out of retry budget"
            );
            return Err(ClientError::ExhaustedRetries {
                attempts,
                elapsed: started.elapsed(),
                last: Box::new(err),
            });
        }

        tracing::debug!(error = %err, attempt = attempts, op, "retrying cache operation");
    }
}
