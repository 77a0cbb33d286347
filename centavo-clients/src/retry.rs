//! Bounded retry with exponential backoff, modeled as explicit state:
//! the callers thread an attempt counter and the current delay through
//! their own loops rather than hiding them behind a combinator.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to use after the current one: doubled, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        let first = policy.initial_delay;
        let second = policy.next_delay(first);
        let third = policy.next_delay(second);
        let fourth = policy.next_delay(third);
        assert_eq!(first, Duration::from_secs(1));
        assert_eq!(second, Duration::from_secs(2));
        assert_eq!(third, Duration::from_secs(4));
        assert_eq!(fourth, Duration::from_secs(8));
        assert_eq!(policy.next_delay(fourth), Duration::from_secs(8));
    }
}
