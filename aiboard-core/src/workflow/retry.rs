//! Retry delay calculation

use crate::models::workflow::RetryPolicy;
use std::time::Duration;

/// Longest wait between two attempts of a step
pub const MAX_RETRY_DELAY_SECONDS: f64 = 600.0;

/// Delay before retry number `attempt` (1-based)
///
/// Fixed policies always wait `retry_delay`. Exponential policies wait
/// `retry_delay * multiplier^(attempt - 1)`, capped at ten minutes.
pub fn calculate_retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let delay_seconds = if policy.exponential_backoff {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = policy.retry_delay as f64 * policy.backoff_multiplier.powi(exponent);
        // 0 * inf and NaN multipliers never reach from_secs_f64
        if delay.is_nan() {
            0.0
        } else {
            delay.clamp(0.0, MAX_RETRY_DELAY_SECONDS)
        }
    } else {
        policy.retry_delay as f64
    };

    Duration::from_secs_f64(delay_seconds)
}

/// Whether a step that has already been retried `retry_count` times may run again
pub fn should_retry(policy: Option<&RetryPolicy>, retry_count: u32) -> bool {
    policy.is_some_and(|p| retry_count < p.max_retries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::fixed(3, 5);
        assert_eq!(calculate_retry_delay(&policy, 1), Duration::from_secs(5));
        assert_eq!(calculate_retry_delay(&policy, 3), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            retry_delay: 10,
            exponential_backoff: true,
            backoff_multiplier: 2.0,
        };

        assert_eq!(calculate_retry_delay(&policy, 1), Duration::from_secs(10));
        assert_eq!(calculate_retry_delay(&policy, 2), Duration::from_secs(20));
        assert_eq!(calculate_retry_delay(&policy, 4), Duration::from_secs(80));
        assert_eq!(calculate_retry_delay(&policy, 10), Duration::from_secs(600));
    }

    #[test]
    fn test_non_finite_multiplier_does_not_panic() {
        let mut policy = RetryPolicy {
            max_retries: 3,
            retry_delay: 0,
            exponential_backoff: true,
            backoff_multiplier: f64::INFINITY,
        };
        assert_eq!(calculate_retry_delay(&policy, 3), Duration::ZERO);

        policy.retry_delay = 5;
        assert_eq!(calculate_retry_delay(&policy, 3), Duration::from_secs(600));

        policy.backoff_multiplier = f64::NAN;
        assert_eq!(calculate_retry_delay(&policy, 2), Duration::ZERO);
    }

    #[test]
    fn test_should_retry_bounds() {
        let policy = RetryPolicy::fixed(2, 0);
        assert!(should_retry(Some(&policy), 0));
        assert!(should_retry(Some(&policy), 1));
        assert!(!should_retry(Some(&policy), 2));
        assert!(!should_retry(None, 0));
    }
}
