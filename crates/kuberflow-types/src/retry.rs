use std::time::Duration;

/// How the supervisor decides whether, and how long, to wait before
/// restarting a failed pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// Restart up to `remaining` more times, waiting `delay` before the next
    /// attempt and multiplying `delay` by `multiplier` (>= 1.0) each time.
    Times {
        remaining: u32,
        delay: Duration,
        multiplier: f64,
    },
    /// Always restart, waiting a uniformly random duration in
    /// `[min_delay, max_delay]` before each attempt.
    Infinite { min_delay: Duration, max_delay: Duration },
}

impl RetryPolicy {
    /// A fixed number of attempts with exponentially growing delay.
    pub fn times(max: u32, initial_delay: Duration, multiplier: f64) -> Self {
        RetryPolicy::Times {
            remaining: max,
            delay: initial_delay,
            multiplier,
        }
    }

    /// Restart forever, waiting a random delay in `[min_delay, max_delay]`.
    pub fn infinite(min_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy::Infinite { min_delay, max_delay }
    }

    /// Whether another restart attempt is permitted under this policy.
    pub fn can_restart(&self) -> bool {
        match self {
            RetryPolicy::Times { remaining, .. } => *remaining > 0,
            RetryPolicy::Infinite { .. } => true,
        }
    }

    /// Returns the delay to sleep before the next attempt, and the policy
    /// that should govern the attempt after that one.
    ///
    /// Callers must check [`RetryPolicy::can_restart`] first; a `Times`
    /// policy with no attempts remaining still returns a (meaningless) delay
    /// here rather than panicking, to keep this a total function.
    pub fn next(&self) -> (Duration, RetryPolicy) {
        match self {
            RetryPolicy::Times {
                remaining,
                delay,
                multiplier,
            } => {
                let next_delay = delay.mul_f64(*multiplier);
                (
                    *delay,
                    RetryPolicy::Times {
                        remaining: remaining.saturating_sub(1),
                        delay: next_delay,
                        multiplier: *multiplier,
                    },
                )
            }
            RetryPolicy::Infinite { min_delay, max_delay } => {
                let delay = random_in_range(*min_delay, *max_delay);
                (delay, self.clone())
            }
        }
    }
}

/// Uniformly sample a duration in `[min, max]`. Falls back to `min` if the
/// range is empty or inverted rather than panicking — a misconfigured range
/// should not crash the supervisor's restart loop.
fn random_in_range(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = max - min;
    let span_nanos = span.as_nanos().min(u128::from(u64::MAX)) as u64;
    let jitter_nanos = if span_nanos == 0 { 0 } else { rand::random::<u64>() % span_nanos };
    min + Duration::from_nanos(jitter_nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_policy_exhausts_after_n_restarts() {
        let mut policy = RetryPolicy::times(2, Duration::from_secs(1), 2.0);
        let mut delays = Vec::new();
        while policy.can_restart() {
            let (delay, next) = policy.next();
            delays.push(delay);
            policy = next;
        }
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert!(!policy.can_restart());
    }

    #[test]
    fn infinite_policy_always_restarts_within_bounds() {
        let policy = RetryPolicy::infinite(Duration::from_millis(10), Duration::from_millis(50));
        for _ in 0..100 {
            assert!(policy.can_restart());
            let (delay, next) = policy.next();
            assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
            assert_eq!(next, policy);
        }
    }
}
