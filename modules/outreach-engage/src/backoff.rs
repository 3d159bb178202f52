//! Shared retry/backoff policy.
//!
//! Pure: given how many attempts have failed and an optional provider wait
//! hint, decide whether to retry and how long to sleep first. No state
//! beyond configuration.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed per action.
    pub max_attempts: u32,
    /// Added on top of a provider-specified wait hint.
    pub grace: Duration,
    /// Sleep window when the provider gave no hint.
    pub default_min: Duration,
    pub default_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            grace: Duration::from_secs(1),
            default_min: Duration::from_secs(5),
            default_max: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// Decide the next step after a failure. `failed_attempts` counts the
    /// attempts already made, so the first failure passes 1.
    pub fn next_delay(&self, failed_attempts: u32, hint: Option<Duration>) -> Verdict {
        if failed_attempts >= self.max_attempts {
            return Verdict::GiveUp;
        }
        let delay = match hint {
            Some(wait) => wait + self.grace,
            None => {
                let millis = rand::rng()
                    .random_range(self.default_min.as_millis()..=self.default_max.as_millis());
                Duration::from_millis(millis as u64)
            }
        };
        Verdict::RetryAfter(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hinted_wait_includes_grace() {
        let policy = RetryPolicy::default();
        let verdict = policy.next_delay(1, Some(Duration::from_secs(5)));
        assert_eq!(verdict, Verdict::RetryAfter(Duration::from_secs(6)));
    }

    #[test]
    fn gives_up_at_max_attempts() {
        let policy = RetryPolicy::default();
        assert_ne!(policy.next_delay(2, None), Verdict::GiveUp);
        assert_eq!(policy.next_delay(3, None), Verdict::GiveUp);
        assert_eq!(policy.next_delay(3, Some(Duration::from_secs(1))), Verdict::GiveUp);
    }

    #[test]
    fn unhinted_wait_stays_in_window() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            match policy.next_delay(1, None) {
                Verdict::RetryAfter(d) => {
                    assert!(d >= policy.default_min && d <= policy.default_max, "{d:?}");
                }
                Verdict::GiveUp => panic!("should not give up on first failure"),
            }
        }
    }
}
