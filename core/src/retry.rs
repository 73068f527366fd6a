//! Retry policy: attempt bound, per-attempt timeout and capped exponential
//! backoff.

use std::time::Duration;

use crate::config::ClientConfig;

/// Delay after the failed attempt `attempt` (0-based):
/// `min(base_ms * 2^attempt, max_ms)`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Budget for a single attempt, connect through body.
    pub timeout: Duration,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: config.timeout(),
            backoff_base_ms: config.backoff_base_ms,
            backoff_cap_ms: config.backoff_cap_ms,
        }
    }

    pub fn total_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.backoff_base_ms, self.backoff_cap_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_double_then_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..6).map(|a| policy.backoff_delay(a).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000, 5000]);
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_cap() {
        assert_eq!(calculate_backoff(200, 1000, 5000), Duration::from_millis(5000));
        assert_eq!(calculate_backoff(u32::MAX, u64::MAX, 7), Duration::from_millis(7));
    }

    #[test]
    fn zero_base_means_no_delay() {
        assert_eq!(calculate_backoff(3, 0, 5000), Duration::ZERO);
    }

    #[test]
    fn total_attempts_counts_first_try() {
        let policy = RetryPolicy::from_config(&ClientConfig::default().with_max_retries(0));
        assert_eq!(policy.total_attempts(), 1);
        assert_eq!(RetryPolicy::default().total_attempts(), 4);
    }
}
