use crate::{BackoffPolicy, RetryError, Retryable};
use rand::{Rng, rng};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Runs an operation until it succeeds, fails permanently, exhausts its
/// [`BackoffPolicy`], or is cancelled.
///
/// Only errors whose [`Retryable::is_retryable`] returns `true` are retried.
/// Every attempt and every backoff sleep races the cancellation token, so a
/// cancelled caller returns promptly instead of waiting out a sleep.
#[derive(Clone, Debug, Default)]
pub struct RetryDriver {
    policy: BackoffPolicy,
}

impl RetryDriver {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Drives `op` to completion.
    ///
    /// `op` is called once per attempt and must build a fresh future each
    /// time.
    ///
    /// # Errors
    /// - [`RetryError::Permanent`] for the first non-retryable error
    /// - [`RetryError::Exhausted`] once the policy allows no further attempt
    /// - [`RetryError::Cancelled`] if `cancel` fires first
    pub async fn retry<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = op() => outcome,
            };
            attempts = attempts.saturating_add(1);

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(RetryError::Permanent(err)),
                Err(err) => err,
            };

            let unit: f64 = rng().random();
            let next_sleep = self
                .policy
                .jitter(self.policy.interval(attempts - 1), unit);
            if !self
                .policy
                .allows_retry(attempts, started.elapsed(), next_sleep)
            {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts, "retry budget exhausted");
                return Err(RetryError::Exhausted {
                    attempts,
                    last: err,
                });
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempts,
                backoff_ms = u64::try_from(next_sleep.as_millis()).unwrap_or(u64::MAX),
                "retryable failure, backing off"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                () = sleep(next_sleep) => {}
            }
        }
    }
}
