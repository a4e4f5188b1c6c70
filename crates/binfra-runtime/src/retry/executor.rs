//! Bounded-retry executor with per-attempt timeouts.
//!
//! Each attempt runs on its own tokio task so the timeout is enforced from
//! the outside, without depending on the operation's own cancellation
//! cooperation. Attempts are strictly sequential: attempt N+1 starts only
//! after attempt N is determined to have failed or timed out.

use std::future::Future;
use std::time::Duration;

use binfra_core::Timer;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::policy::{InvalidPolicy, RetryPolicy, TimeoutAction};

/// Why the final attempt failed.
#[derive(Error, Debug)]
pub enum FailureCause<E>
where
    E: std::error::Error + 'static,
{
    #[error("attempt did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("attempt failed: {0}")]
    Failed(#[source] E),

    #[error("attempt panicked: {0}")]
    Panicked(String),
}

/// Errors from retry execution.
#[derive(Error, Debug)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// All attempts failed; carries the last failure's cause.
    #[error("operation '{operation}' failed after {attempts} attempts: {cause}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        cause: FailureCause<E>,
    },

    /// Cancellation was requested before a result was produced.
    #[error("operation '{operation}' cancelled")]
    Cancelled { operation: String },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Whether the final failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RetryError::Exhausted {
                cause: FailureCause::TimedOut(_),
                ..
            }
        )
    }
}

/// Outcome of one attempt.
enum Attempt<T, E> {
    Completed(T),
    Failed(E),
    TimedOut,
    Panicked(String),
}

/// Executes an operation under a [`RetryPolicy`].
///
/// The executor is stateless across calls; the attempt counter lives inside
/// a single `execute` call and is discarded on return.
///
/// # Example
///
/// ```rust,ignore
/// use binfra_runtime::{RetryExecutor, RetryPolicy};
/// use std::time::Duration;
///
/// let executor = RetryExecutor::new(RetryPolicy::new(3, Duration::from_secs(60)))?;
/// let report = executor
///     .execute("daily-report", || async { build_report().await })
///     .await?;
/// ```
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor with a validated policy.
    pub fn new(policy: RetryPolicy) -> Result<Self, InvalidPolicy> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy this executor runs under.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an async operation with retries.
    ///
    /// `make_attempt` is called once per attempt; each produced future is
    /// spawned on its own task. The operation's side effects occur once per
    /// attempt — idempotency under retry is the caller's responsibility.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: &str,
        mut make_attempt: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        self.run(operation, move || tokio::spawn(make_attempt()), None)
            .await
    }

    /// Execute with an explicit cancellation request API.
    ///
    /// Cancellation is observed before each attempt, during an attempt, and
    /// during inter-attempt delays. An in-flight attempt receives a
    /// best-effort abort, which non-yielding code will not acknowledge.
    pub async fn execute_with_cancel<F, Fut, T, E>(
        &self,
        operation: &str,
        mut make_attempt: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        self.run(operation, move || tokio::spawn(make_attempt()), Some(cancel))
            .await
    }

    /// Execute a blocking operation with retries.
    ///
    /// Each attempt runs on a blocking task. A timed-out blocking attempt
    /// can never be interrupted; it is always left to finish detached.
    pub async fn execute_blocking<F, T, E>(
        &self,
        operation: &str,
        f: F,
    ) -> Result<T, RetryError<E>>
    where
        F: Fn() -> Result<T, E> + Clone + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        self.run(operation, move || tokio::task::spawn_blocking(f.clone()), None)
            .await
    }

    /// The retry loop. Sequential by construction: the next attempt is
    /// spawned only after the previous one resolved.
    async fn run<S, T, E>(
        &self,
        operation: &str,
        mut spawn_attempt: S,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RetryError<E>>
    where
        S: FnMut() -> JoinHandle<Result<T, E>>,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let total = self.policy.total_attempts();
        let mut delays = self.policy.delays();

        for attempt_no in 1..=total {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    tracing::debug!(operation = %operation, attempts = attempt_no - 1, "cancelled before attempt");
                    return Err(RetryError::Cancelled {
                        operation: operation.to_string(),
                    });
                }
            }

            let timer = Timer::start();
            let cause = match self.wait(operation, spawn_attempt(), cancel).await? {
                Attempt::Completed(value) => {
                    if attempt_no > 1 {
                        tracing::debug!(
                            operation = %operation,
                            attempts = attempt_no,
                            "retry succeeded"
                        );
                    }
                    return Ok(value);
                }
                Attempt::Failed(error) => FailureCause::Failed(error),
                Attempt::TimedOut => FailureCause::TimedOut(self.policy.attempt_timeout),
                Attempt::Panicked(message) => FailureCause::Panicked(message),
            };

            if attempt_no == total {
                tracing::warn!(
                    operation = %operation,
                    attempts = total,
                    cause = %cause,
                    "no attempts left, giving up"
                );
                return Err(RetryError::Exhausted {
                    operation: operation.to_string(),
                    attempts: total,
                    cause,
                });
            }

            let delay = delays.next().unwrap_or(self.policy.max_delay);
            tracing::warn!(
                operation = %operation,
                attempt = attempt_no,
                attempts_left = total - attempt_no,
                elapsed_s = timer.seconds(),
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "attempt failed, retrying"
            );

            if delay.is_zero() {
                // No busy-wait between back-to-back attempts
                tokio::task::yield_now().await;
            } else if let Some(token) = cancel {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        tracing::debug!(operation = %operation, attempts = attempt_no, "cancelled during retry delay");
                        return Err(RetryError::Cancelled {
                            operation: operation.to_string(),
                        });
                    }
                }
            } else {
                tokio::time::sleep(delay).await;
            }
        }

        // The loop always returns from its last iteration
        unreachable!("retry loop exited without a result")
    }

    /// Wait out one attempt under the per-attempt timeout.
    async fn wait<T, E>(
        &self,
        operation: &str,
        handle: JoinHandle<Result<T, E>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Attempt<T, E>, RetryError<E>>
    where
        E: std::error::Error + 'static,
    {
        let timeout = self.policy.attempt_timeout;
        let abort = handle.abort_handle();

        let joined = match cancel {
            Some(token) => tokio::select! {
                joined = tokio::time::timeout(timeout, handle) => joined,
                _ = token.cancelled() => {
                    // Best-effort: the attempt may not acknowledge this
                    abort.abort();
                    tracing::debug!(operation = %operation, "cancelled during attempt");
                    return Err(RetryError::Cancelled {
                        operation: operation.to_string(),
                    });
                }
            },
            None => tokio::time::timeout(timeout, handle).await,
        };

        Ok(match joined {
            Ok(Ok(Ok(value))) => Attempt::Completed(value),
            Ok(Ok(Err(error))) => Attempt::Failed(error),
            Ok(Err(join_error)) => Attempt::Panicked(join_error.to_string()),
            Err(_elapsed) => {
                if self.policy.timeout_action == TimeoutAction::Abort {
                    abort.abort();
                }
                // Under Detach the task keeps running; its result is discarded
                Attempt::TimedOut
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Error, Debug)]
    #[error("boom")]
    struct Boom;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_secs(5)).without_delay()
    }

    /// Operation that fails the first `failures` calls, then succeeds.
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, Boom>> + Send>> {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call <= failures {
                    Err(Boom)
                } else {
                    Ok(call)
                }
            })
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_policy(3)).unwrap();

        let result = executor.execute("op", flaky(calls.clone(), 0)).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_then_success_makes_exactly_two_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_policy(3)).unwrap();

        let result = executor.execute("op", flaky(calls.clone(), 1)).await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_always_failing_is_attempted_retries_plus_one_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_policy(3)).unwrap();

        let result = executor.execute("op", flaky(calls.clone(), u32::MAX)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result.unwrap_err() {
            RetryError::Exhausted {
                attempts,
                cause: FailureCause::Failed(Boom),
                ..
            } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_policy(0)).unwrap();

        let result = executor.execute("op", flaky(calls.clone(), u32::MAX)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out_on_every_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(1)).without_delay();
        let executor = RetryExecutor::new(policy).unwrap();

        let started = tokio::time::Instant::now();
        let result: Result<(), _> = executor
            .execute("op", {
                let calls = calls.clone();
                move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        Ok::<(), Boom>(())
                    }
                }
            })
            .await;

        // 4 sequential attempts, 1s budget each
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_secs(4));

        let error = result.unwrap_err();
        assert!(error.is_timeout());
        match error {
            RetryError::Exhausted { attempts, cause, .. } => {
                assert_eq!(attempts, 4);
                assert!(matches!(cause, FailureCause::TimedOut(t) if t == Duration::from_secs(1)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_secs(60))
            .with_initial_delay(Duration::from_secs(10))
            .with_backoff_factor(2.0);
        let executor = RetryExecutor::new(policy).unwrap();

        let started = tokio::time::Instant::now();
        let result = executor.execute("op", flaky(calls.clone(), u32::MAX)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Delays of 10s and 20s separate the three attempts
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_retry_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(60))
            .with_initial_delay(Duration::from_secs(60));
        let executor = RetryExecutor::new(policy).unwrap();

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let result = executor
            .execute_with_cancel("op", flaky(calls.clone(), u32::MAX), &token)
            .await;

        // First attempt failed, cancellation landed in the 60s delay
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), RetryError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_panicking_attempt_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(fast_policy(1)).unwrap();

        let result: Result<(), _> = executor
            .execute("op", {
                let calls = calls.clone();
                move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if calls.load(Ordering::SeqCst) > 0 {
                            panic!("attempt blew up");
                        }
                        Ok::<(), Boom>(())
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match result.unwrap_err() {
            RetryError::Exhausted { cause, .. } => {
                assert!(matches!(cause, FailureCause::Panicked(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_blocking_operation_retries_on_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(1, Duration::from_millis(50)).without_delay();
        let executor = RetryExecutor::new(policy).unwrap();

        let result: Result<(), RetryError<Boom>> = executor
            .execute_blocking("op", {
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_blocking_operation_success() {
        let policy = RetryPolicy::new(1, Duration::from_secs(5)).without_delay();
        let executor = RetryExecutor::new(policy).unwrap();

        let result: Result<u32, RetryError<Boom>> =
            executor.execute_blocking("op", || Ok(41 + 1)).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        assert!(RetryExecutor::new(RetryPolicy::new(1, Duration::ZERO)).is_err());
        assert!(
            RetryExecutor::new(RetryPolicy::default().with_backoff_factor(0.9)).is_err()
        );
    }
}
