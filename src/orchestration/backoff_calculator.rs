//! # Backoff Calculator
//!
//! Computes the wait between stage attempts.
//!
//! ## Overview
//!
//! After attempt `n` fails with a retryable error the executor waits
//! `base_delay × multiplier^(n-1)`, capped at `max_delay`. With jitter enabled
//! the delay is moved up or down by at most `max_jitter` of its value, and the
//! cap still applies afterwards.

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    config: BackoffConfig,
}

impl BackoffCalculator {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay before the attempt following `failed_attempt` (1-based)
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        let delay_ms = self.exponential_delay_ms(failed_attempt);
        let delay_ms = if self.config.jitter_enabled {
            self.apply_jitter(delay_ms)
        } else {
            delay_ms
        };
        Duration::from_millis(delay_ms.min(self.config.max_delay_ms))
    }

    /// Capped exponential delay without jitter
    pub fn exponential_delay_ms(&self, failed_attempt: u32) -> u64 {
        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.config.base_delay_ms as f64;
        let delay = base * self.config.multiplier.powi(exponent);
        let max = self.config.max_delay_ms as f64;

        if !delay.is_finite() || delay >= max {
            self.config.max_delay_ms
        } else {
            delay.max(0.0) as u64
        }
    }

    fn apply_jitter(&self, delay_ms: u64) -> u64 {
        let jitter_range = (delay_ms as f64 * self.config.max_jitter) as u64;
        if jitter_range == 0 {
            return delay_ms;
        }

        let mut rng = rand::thread_rng();
        let jitter = rng.gen_range(0..=jitter_range);

        if rng.gen_bool(0.5) {
            delay_ms.saturating_add(jitter)
        } else {
            delay_ms.saturating_sub(jitter)
        }
    }
}

impl Default for BackoffCalculator {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn without_jitter(base_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> BackoffCalculator {
        BackoffCalculator::new(BackoffConfig {
            base_delay_ms,
            max_delay_ms,
            multiplier,
            jitter_enabled: false,
            max_jitter: 0.0,
        })
    }

    #[test]
    fn test_exponential_growth() {
        let calculator = without_jitter(500, 30_000, 2.0);
        assert_eq!(calculator.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(calculator.delay_for_attempt(2), Duration::from_millis(1_000));
        assert_eq!(calculator.delay_for_attempt(3), Duration::from_millis(2_000));
    }

    #[test]
    fn test_delay_is_capped() {
        let calculator = without_jitter(500, 30_000, 2.0);
        assert_eq!(calculator.delay_for_attempt(10), Duration::from_millis(30_000));
        assert_eq!(calculator.delay_for_attempt(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn test_default_configuration() {
        let calculator = BackoffCalculator::default();
        assert_eq!(calculator.config().base_delay_ms, 500);
        assert!(calculator.config().jitter_enabled);
    }

    proptest! {
        #[test]
        fn prop_jittered_delay_stays_within_bounds(
            base in 1u64..5_000,
            max_extra in 0u64..60_000,
            multiplier in 1.0f64..4.0,
            max_jitter in 0.0f64..=1.0,
            attempt in 1u32..20,
        ) {
            let max = base + max_extra;
            let calculator = BackoffCalculator::new(BackoffConfig {
                base_delay_ms: base,
                max_delay_ms: max,
                multiplier,
                jitter_enabled: true,
                max_jitter,
            });

            let nominal = calculator.exponential_delay_ms(attempt);
            let delay = calculator.delay_for_attempt(attempt).as_millis() as u64;
            let spread = (nominal as f64 * max_jitter) as u64;

            prop_assert!(delay <= max);
            prop_assert!(delay + spread >= nominal);
        }

        #[test]
        fn prop_delay_is_monotonic_without_jitter(
            base in 1u64..5_000,
            multiplier in 1.0f64..4.0,
            attempt in 1u32..30,
        ) {
            let calculator = without_jitter(base, 120_000, multiplier);
            prop_assert!(
                calculator.delay_for_attempt(attempt) <= calculator.delay_for_attempt(attempt + 1)
            );
        }
    }
}
