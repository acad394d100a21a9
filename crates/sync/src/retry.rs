//! Transient-failure classification and the shared retry wrapper.
//!
//! Both adapters and the task layer funnel their calls through
//! [`RetryPolicy::run`]. The policy only ever retries failures classified
//! as transient (HTTP 429, 5xx, connection-level failures, timeouts);
//! everything else propagates immediately. A call that succeeds on a later
//! attempt returns exactly as if it had succeeded on the first one.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// How a failure relates to retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Rate-limited or temporarily unavailable upstream; retry-eligible.
    Transient,
    /// Upstream rejected the request as invalid; never retried.
    Permanent,
    /// Expected absence (missing variant, item, location); never retried.
    NotFound,
    /// Required configuration is absent; never retried.
    Configuration,
    /// An order with zero mappable lines; never retried.
    Mapping,
}

/// Errors that know their own failure class.
pub trait Classify {
    /// Classify this failure for retry and status-code purposes.
    fn class(&self) -> FailureClass;

    /// Whether the failure is worth retrying.
    fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }
}

/// Backoff shape between attempts.
#[derive(Debug, Clone, Copy)]
enum Backoff {
    /// Doubling delay from `base`, capped at `cap`, with full jitter.
    Exponential { base: Duration, cap: Duration },
    /// Constant delay, no jitter.
    Fixed(Duration),
}

/// A retry policy: attempt bound plus backoff shape.
///
/// Three instances are used across the codebase:
/// - [`RetryPolicy::adapter`] wraps every individual HTTP call;
/// - [`RetryPolicy::task`] wraps whole dispatched sync runs and has no
///   attempt bound of its own (the dispatcher bounds the unit's lifetime);
/// - [`RetryPolicy::single_item`] wraps the single-SKU inventory set.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Adapter-level policy: 6 attempts, exponential 0.5s to 30s.
    #[must_use]
    pub const fn adapter() -> Self {
        Self {
            max_attempts: Some(6),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                cap: Duration::from_secs(30),
            },
        }
    }

    /// Task-level policy for bulk runs: unbounded attempts, same ceiling.
    #[must_use]
    pub const fn task() -> Self {
        Self {
            max_attempts: None,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                cap: Duration::from_secs(30),
            },
        }
    }

    /// Single-SKU policy: 3 attempts with a fixed 10s pause.
    #[must_use]
    pub const fn single_item() -> Self {
        Self {
            max_attempts: Some(3),
            backoff: Backoff::Fixed(Duration::from_secs(10)),
        }
    }

    /// Custom exponential policy, mainly for tests with short delays.
    #[must_use]
    pub const fn exponential(max_attempts: Option<u32>, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, cap },
        }
    }

    /// Custom fixed-delay policy.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Delay before the given retry (1 = first retry).
    ///
    /// Exponential backoff doubles from the base up to the cap; the actual
    /// sleep is drawn uniformly from `[0, delay]` (full jitter) so
    /// concurrent units spread out.
    fn delay_for(&self, retry_number: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, cap } => {
                let shift = retry_number.saturating_sub(1).min(16);
                let exp = base.saturating_mul(1u32 << shift).min(cap);
                exp.mul_f64(rand::rng().random_range(0.0..=1.0))
            }
        }
    }

    /// Run `op`, retrying transient failures per this policy.
    ///
    /// # Errors
    ///
    /// Returns the final error once the attempt bound is exhausted, or the
    /// first error classified as non-transient.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    if let Some(max) = self.max_attempts
                        && attempt >= max
                    {
                        warn!(operation = label, attempt, error = %err, "retries exhausted");
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient={})", self.transient)
        }
    }

    impl Classify for TestError {
        fn class(&self) -> FailureClass {
            if self.transient {
                FailureClass::Transient
            } else {
                FailureClass::Permanent
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::exponential(
            Some(max_attempts),
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let result: Result<u32, TestError> = fast_policy(6)
            .run("test", || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.expect("success"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let result: Result<&str, TestError> = fast_policy(6)
            .run("test", || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError { transient: true })
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;
        assert_eq!(result.expect("recovered"), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_propagate_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let result: Result<(), TestError> = fast_policy(6)
            .run("test", || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError { transient: false })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_bound_is_honored() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let result: Result<(), TestError> = fast_policy(3)
            .run("test", || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError { transient: true })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy =
            RetryPolicy::exponential(Some(6), Duration::from_millis(500), Duration::from_secs(30));
        for retry in 1..=20 {
            assert!(policy.delay_for(retry) <= Duration::from_secs(30));
        }
    }

    #[test]
    fn fixed_delay_has_no_jitter() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(10));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
    }
}
