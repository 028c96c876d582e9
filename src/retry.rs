//! Bounded exponential backoff for transient embedding failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::EmbedError;

/// Retry budget and delay schedule.
///
/// The delay before retry `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`. Only errors reporting [`EmbedError::is_transient`] are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Builds a policy allowing `max_retries` retries after the first attempt.
    pub fn new(max_retries: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Number of retries allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay slept before retry `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, EmbedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EmbedError>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        label,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(2), Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::embedder::{Embedder, RetryingEmbedder};
    use crate::testing::FlakyEmbedder;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_secs(2), Duration::from_secs(20));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
        assert_eq!(policy.backoff(5), Duration::from_secs(20));
        assert_eq!(policy.backoff(60), Duration::from_secs(20));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn transient_failures_are_retried() {
        let embedder = Arc::new(FlakyEmbedder::new(2, EmbedError::Timeout));
        let retrying = RetryingEmbedder::new(
            embedder.clone(),
            RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(60)),
        );
        let vectors = retrying
            .embed_batch(&["q".to_string()])
            .await
            .expect("succeeds after retries");
        assert_eq!(vectors.len(), 1);
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn budget_exhaustion_returns_last_error() {
        let embedder = Arc::new(FlakyEmbedder::new(usize::MAX, EmbedError::Timeout));
        let retrying = RetryingEmbedder::new(
            embedder.clone(),
            RetryPolicy::new(2, Duration::from_millis(10), Duration::from_secs(1)),
        );
        let err = retrying
            .embed_batch(&["q".to_string()])
            .await
            .expect_err("budget exhausted");
        assert!(matches!(err, EmbedError::Timeout));
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let embedder = Arc::new(FlakyEmbedder::new(
            usize::MAX,
            EmbedError::Status {
                status: 400,
                body: "bad request".into(),
            },
        ));
        let retrying = RetryingEmbedder::new(embedder.clone(), RetryPolicy::default());
        assert!(retrying.embed_batch(&["q".to_string()]).await.is_err());
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn no_retry_policy_runs_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), EmbedError> = RetryPolicy::none()
            .run("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EmbedError::Timeout) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
