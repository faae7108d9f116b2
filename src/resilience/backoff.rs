//! Exponential backoff.

use std::time::Duration;

/// Delay before the retry that follows zero-based attempt `attempt`:
/// `min(initial * 2^attempt, max)`.
pub fn calculate_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| initial.checked_mul(factor))
        .map_or(max, |delay| delay.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_millis(1000);

        assert_eq!(calculate_backoff(0, initial, max), Duration::from_millis(100));
        assert_eq!(calculate_backoff(1, initial, max), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, initial, max), Duration::from_millis(800));
        assert_eq!(calculate_backoff(4, initial, max), max);
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let max = Duration::from_secs(10);
        assert_eq!(calculate_backoff(31, Duration::from_secs(1), max), max);
        assert_eq!(calculate_backoff(40, Duration::from_secs(1), max), max);
        assert_eq!(calculate_backoff(u32::MAX, Duration::from_secs(1), max), max);
    }
}
