//! Retry policies for origin fetches.

use std::time::Duration;

use edge_core::DEFAULT_MAX_RETRIES;

/// Default base delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: `base * 2^(retry - 1)`, optionally capped.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Upper bound on any single delay.
        max: Option<Duration>,
    },
}

impl BackoffStrategy {
    /// Exponential backoff with no cap.
    pub fn exponential(base: Duration) -> Self {
        Self::Exponential { base, max: None }
    }

    /// Delay applied before retry number `retry` (1-indexed).
    ///
    /// Retry 0 is the initial attempt and never waits.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u32.saturating_pow(retry - 1);
                let delay = base.saturating_mul(multiplier);
                match max {
                    Some(max) => delay.min(*max),
                    None => delay,
                }
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::exponential(DEFAULT_BASE_DELAY)
    }
}

/// Retry policy configuration.
///
/// Any failed attempt is retried while budget remains: a non-2xx status and
/// a transport error are treated the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a policy with the default exponential backoff.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Total attempts this policy allows, including the first.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt `attempt` (0-indexed).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_schedule() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.delay_for_retry(0), Duration::ZERO);
        assert_eq!(backoff.delay_for_retry(1), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_retry(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_retry(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_retry(6), Duration::from_millis(32000));
    }

    #[test]
    fn test_exponential_cap_and_saturation() {
        let capped = BackoffStrategy::Exponential {
            base: Duration::from_millis(100),
            max: Some(Duration::from_millis(250)),
        };
        assert_eq!(capped.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(capped.delay_for_retry(3), Duration::from_millis(250));

        let huge = BackoffStrategy::default().delay_for_retry(200);
        assert_eq!(huge, DEFAULT_BASE_DELAY.saturating_mul(u32::MAX));
    }

    #[test]
    fn test_fixed_delay() {
        let fixed = BackoffStrategy::Fixed(Duration::from_millis(7));
        assert_eq!(fixed.delay_for_retry(0), Duration::ZERO);
        assert_eq!(fixed.delay_for_retry(5), Duration::from_millis(7));
    }

    #[test]
    fn test_policy_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.total_attempts(), 3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));

        let single = RetryPolicy::new(0);
        assert_eq!(single.total_attempts(), 1);
        assert!(!single.should_retry(0));
    }
}
