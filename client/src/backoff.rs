use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the poll delay grows after consecutive failed fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

/// Calculate the next poll delay after `attempt` consecutive failures
pub fn calculate_backoff_delay(
    attempt: u32,
    strategy: BackoffStrategy,
    initial_delay: Duration,
    max_delay: Duration,
) -> Duration {
    let delay = match strategy {
        BackoffStrategy::Fixed => initial_delay,
        BackoffStrategy::Linear => initial_delay.saturating_mul(attempt.saturating_add(1)),
        BackoffStrategy::Exponential => {
            let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
            initial_delay.saturating_mul(factor)
        },
    };

    delay.min(max_delay.max(initial_delay))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: Duration = Duration::from_secs(5);
    const MAX: Duration = Duration::from_secs(60);

    #[test]
    fn test_exponential_backoff() {
        assert_eq!(calculate_backoff_delay(0, BackoffStrategy::Exponential, INITIAL, MAX), Duration::from_secs(5));
        assert_eq!(calculate_backoff_delay(1, BackoffStrategy::Exponential, INITIAL, MAX), Duration::from_secs(10));
        assert_eq!(calculate_backoff_delay(2, BackoffStrategy::Exponential, INITIAL, MAX), Duration::from_secs(20));

        // Test max delay cap
        assert_eq!(calculate_backoff_delay(10, BackoffStrategy::Exponential, INITIAL, MAX), MAX);
        assert_eq!(calculate_backoff_delay(40, BackoffStrategy::Exponential, INITIAL, MAX), MAX);
    }

    #[test]
    fn test_linear_backoff() {
        assert_eq!(calculate_backoff_delay(0, BackoffStrategy::Linear, INITIAL, MAX), Duration::from_secs(5));
        assert_eq!(calculate_backoff_delay(1, BackoffStrategy::Linear, INITIAL, MAX), Duration::from_secs(10));
        assert_eq!(calculate_backoff_delay(2, BackoffStrategy::Linear, INITIAL, MAX), Duration::from_secs(15));
    }

    #[test]
    fn test_fixed_backoff() {
        assert_eq!(calculate_backoff_delay(0, BackoffStrategy::Fixed, INITIAL, MAX), INITIAL);
        assert_eq!(calculate_backoff_delay(5, BackoffStrategy::Fixed, INITIAL, MAX), INITIAL);
    }
}
