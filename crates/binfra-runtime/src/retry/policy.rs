//! Retry policy configuration.

use backon::{BackoffBuilder, ConstantBuilder, ExponentialBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from policy validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidPolicy {
    #[error("attempt_timeout must be positive")]
    ZeroTimeout,

    #[error("backoff_factor must be >= 1.0, got {0}")]
    BackoffBelowOne(f32),
}

/// Disposition of a timed-out attempt's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAction {
    /// Leave the task running; its eventual result is discarded.
    #[default]
    Detach,

    /// Request abortion; lands at the task's next await point, so code that
    /// never yields will not acknowledge it.
    Abort,
}

/// Immutable retry configuration.
///
/// In config files durations are written human-readable ("60s", "2m 30s").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`
    pub max_retries: u32,

    /// Per-attempt wall-clock budget
    #[serde(with = "humantime_duration")]
    pub attempt_timeout: Duration,

    /// Wait before the first retry
    #[serde(with = "humantime_duration")]
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f32,

    /// Cap on the inter-attempt delay
    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,

    /// What happens to a timed-out attempt's task
    pub timeout_action: TimeoutAction,
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(60),
            initial_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(300),
            timeout_action: TimeoutAction::Detach,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry count and per-attempt timeout.
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            attempt_timeout,
            ..Default::default()
        }
    }

    /// Set the wait before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, factor: f32) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the inter-attempt delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the disposition of timed-out attempts.
    pub fn with_timeout_action(mut self, action: TimeoutAction) -> Self {
        self.timeout_action = action;
        self
    }

    /// Retry back-to-back, with no delay between attempts.
    pub fn without_delay(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self
    }

    /// Total attempts this policy allows.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Check the policy invariants: positive timeout, backoff factor >= 1.
    pub fn validate(&self) -> Result<(), InvalidPolicy> {
        if self.attempt_timeout.is_zero() {
            return Err(InvalidPolicy::ZeroTimeout);
        }
        if self.backoff_factor < 1.0 {
            return Err(InvalidPolicy::BackoffBelowOne(self.backoff_factor));
        }
        Ok(())
    }

    /// The inter-attempt delay sequence for one execution.
    ///
    /// A factor of exactly 1.0 means a constant delay; backon's exponential
    /// builder requires a growing factor.
    pub(crate) fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        if self.backoff_factor > 1.0 {
            Box::new(
                ExponentialBuilder::default()
                    .with_min_delay(self.initial_delay)
                    .with_max_delay(self.max_delay)
                    .with_factor(self.backoff_factor)
                    .with_max_times(self.max_retries as usize)
                    .build(),
            )
        } else {
            Box::new(
                ConstantBuilder::default()
                    .with_delay(self.initial_delay)
                    .with_max_times(self.max_retries as usize)
                    .build(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(60));
        assert_eq!(policy.initial_delay, Duration::from_secs(10));
        assert_eq!(policy.backoff_factor, 2.0);
        assert_eq!(policy.timeout_action, TimeoutAction::Detach);
        assert_eq!(policy.total_attempts(), 4);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let policy = RetryPolicy::new(1, Duration::ZERO);
        assert_eq!(policy.validate(), Err(InvalidPolicy::ZeroTimeout));
    }

    #[test]
    fn test_validation_rejects_shrinking_backoff() {
        let policy = RetryPolicy::default().with_backoff_factor(0.5);
        assert_eq!(policy.validate(), Err(InvalidPolicy::BackoffBelowOne(0.5)));
    }

    #[test]
    fn test_exponential_delay_sequence() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60))
            .with_initial_delay(Duration::from_secs(10))
            .with_backoff_factor(2.0)
            .with_max_delay(Duration::from_secs(25));

        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(25), // capped
            ]
        );
    }

    #[test]
    fn test_constant_delay_sequence() {
        let policy = RetryPolicy::new(2, Duration::from_secs(60))
            .with_initial_delay(Duration::from_secs(5))
            .with_backoff_factor(1.0);

        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(5), Duration::from_secs(5)]);
    }

    #[test]
    fn test_serde_round_trip_with_human_durations() {
        let yaml = r#"
max_retries: 5
attempt_timeout: 90s
initial_delay: 500ms
backoff_factor: 1.5
timeout_action: abort
"#;
        let policy: RetryPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(90));
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.timeout_action, TimeoutAction::Abort);
        // Omitted fields take defaults
        assert_eq!(policy.max_delay, Duration::from_secs(300));

        let serialized = serde_yaml::to_string(&policy).unwrap();
        let reparsed: RetryPolicy = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.attempt_timeout, policy.attempt_timeout);
        assert_eq!(reparsed.initial_delay, policy.initial_delay);
    }
}
