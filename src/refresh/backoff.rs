use std::time::Duration;

use rand::Rng;

/// Delay policy between ticks.
///
/// While the store is healthy every tick waits the plain poll interval.
/// After consecutive failures the wait grows geometrically up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    failures: u32,
}

impl Backoff {
    pub fn new(interval: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            interval,
            max: max.max(interval),
            multiplier: multiplier.max(1.0),
            jitter: jitter.clamp(0.0, 0.99),
            failures: 0,
        }
    }

    /// Fixed cadence, no growth and no jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, interval, 1.0, 0.0)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Wait before the next tick. The first failure still waits a single
    /// interval; each further one multiplies it.
    pub fn next_delay(&self) -> Duration {
        if self.failures <= 1 {
            return self.interval;
        }
        let exponent = (self.failures - 1).min(63) as i32;
        let grown = self.interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = grown.min(self.max.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            capped * (1.0 + spread)
        } else {
            capped
        };
        let clamped = jittered.clamp(self.interval.as_secs_f64(), self.max.as_secs_f64());
        Duration::try_from_secs_f64(clamped).unwrap_or(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_store_polls_at_interval() {
        let backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 2.0, 0.0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn grows_then_caps() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 2.0, 0.0);
        let mut delays = Vec::new();
        for _ in 0..6 {
            backoff.record_failure();
            delays.push(backoff.next_delay().as_secs());
        }
        assert_eq!(delays, vec![2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn success_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 2.0, 0.0);
        for _ in 0..4 {
            backoff.record_failure();
        }
        backoff.record_success();
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 2.0, 0.5);
        backoff.record_failure();
        backoff.record_failure();
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(6));
        }
    }

    #[test]
    fn huge_cap_does_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::MAX, 10.0, 0.0);
        for _ in 0..40 {
            backoff.record_failure();
        }
        assert!(backoff.next_delay() > Duration::from_secs(2));
    }

    #[test]
    fn fixed_never_grows() {
        let mut backoff = Backoff::fixed(Duration::from_millis(500));
        for _ in 0..10 {
            backoff.record_failure();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }
}
