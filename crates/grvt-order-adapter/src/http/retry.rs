/*
[INPUT]:  Retry configuration and attempt counters
[OUTPUT]: Retry decisions and jittered backoff delays
[POS]:    HTTP layer - retry policy for idempotent reads
[UPDATE]: When retry classification or backoff shape changes
*/

use std::time::Duration;

/// Retry policy attached to each dispatched request
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// Never retried; order entry and other writes
    #[default]
    None,
    /// Transport failures plus 429/502/503/504, using the client's retry config
    Idempotent,
    Custom(RetryConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first request
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter: true,
            retryable_statuses: vec![429, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// No jitter and short delays, for tests and deterministic callers
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
            jitter: false,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed), with ±25% jitter when enabled
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter {
            let jitter_range = capped * 0.25;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_none() {
        assert!(matches!(RetryPolicy::default(), RetryPolicy::None));
    }

    #[test]
    fn test_default_config_statuses() {
        let config = RetryConfig::default();
        for status in [429, 502, 503, 504] {
            assert!(config.retries_status(status));
        }
        assert!(!config.retries_status(400));
        assert!(!config.retries_status(500));
    }

    #[test]
    fn test_delay_doubles_without_jitter() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            jitter: false,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for_attempt(0).as_millis(), 100);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 200);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 400);
    }

    #[test]
    fn test_delay_caps_and_jitter_bounds() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(2000),
            backoff_factor: 10.0,
            jitter: false,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for_attempt(3).as_millis(), 2000);

        let jittered = RetryConfig {
            jitter: true,
            ..config
        };
        for _ in 0..50 {
            let ms = jittered.delay_for_attempt(3).as_millis();
            assert!((1500..=2500).contains(&ms), "delay {ms} outside ±25%");
        }
    }
}
