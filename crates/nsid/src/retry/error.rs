/// Classifies errors for a [`RetryDriver`].
///
/// [`RetryDriver`]: crate::RetryDriver
pub trait Retryable {
    /// Returns `true` if the failed operation may succeed when re-run.
    fn is_retryable(&self) -> bool;
}

/// Why a [`RetryDriver`] stopped without a value.
///
/// [`RetryDriver`]: crate::RetryDriver
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// The operation failed with a non-retryable error. The error is returned
    /// as the operation reported it.
    #[error(transparent)]
    Permanent(E),

    /// Every attempt failed with a retryable error and the policy allows no
    /// further attempts.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    /// The caller's cancellation token fired during an attempt or a backoff.
    #[error("operation cancelled")]
    Cancelled,
}
