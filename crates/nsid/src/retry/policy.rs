use core::time::Duration;

/// Interval before the first retry.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
/// Growth factor applied to the interval after every retry.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
/// Jitter applied around each interval, as a fraction of it.
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
/// Cap on any single (un-jittered) interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
/// Total time after which retrying stops.
pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(15 * 60);

/// Exponential backoff with jitter.
///
/// The interval before retry `n` (zero-based) is
/// `min(initial_interval * multiplier^n, max_interval)`, then spread uniformly
/// over `[i * (1 - r), i * (1 + r)]` where `r` is the randomization factor.
///
/// Retrying stops once the next sleep would end past `max_elapsed`, or once
/// `max_attempts` attempts have been made. `None` means unbounded.
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub max_interval: Duration,
    pub max_elapsed: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed: Some(DEFAULT_MAX_ELAPSED),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// A policy that retries without waiting and without bound. Intended for
    /// tests; pair it with `max_attempts` or a cancellation token.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            multiplier: 1.0,
            randomization_factor: 0.0,
            max_interval: Duration::ZERO,
            max_elapsed: None,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The un-jittered interval before retry `retry` (zero-based).
    pub fn interval(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let cap = self.max_interval.as_secs_f64();
        if !secs.is_finite() || secs >= cap {
            return self.max_interval;
        }
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_interval)
    }

    /// Spreads `interval` around itself. `unit` is a uniform sample from
    /// `[0, 1)`; `0.5` returns the interval unchanged.
    pub fn jitter(&self, interval: Duration, unit: f64) -> Duration {
        let factor = self.randomization_factor.clamp(0.0, 1.0);
        let unit = unit.clamp(0.0, 1.0);
        let base = interval.as_secs_f64();
        let delta = base * factor;
        let secs = (base - delta) + unit * (2.0 * delta);
        if !secs.is_finite() {
            return interval;
        }
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Whether another attempt may follow `attempts` failed ones, given the
    /// time already spent and the sleep that would precede it.
    pub fn allows_retry(&self, attempts: u32, elapsed: Duration, next_sleep: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return false;
        }
        self.max_elapsed
            .is_none_or(|max| elapsed.saturating_add(next_sleep) <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_grows_geometrically_up_to_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.interval(0), Duration::from_millis(500));
        assert_eq!(policy.interval(1), Duration::from_millis(750));
        assert_eq!(policy.interval(2), Duration::from_millis(1125));
        assert_eq!(policy.interval(30), DEFAULT_MAX_INTERVAL);
        assert_eq!(policy.interval(u32::MAX), DEFAULT_MAX_INTERVAL);
    }

    #[test]
    fn jitter_stays_within_randomization_window() {
        let policy = BackoffPolicy::default();
        let interval = Duration::from_secs(2);
        assert_eq!(policy.jitter(interval, 0.0), Duration::from_secs(1));
        assert_eq!(policy.jitter(interval, 0.5), interval);
        assert!(policy.jitter(interval, 0.999) < Duration::from_secs(3));
        assert!(policy.jitter(interval, 0.999) > Duration::from_millis(2990));
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = BackoffPolicy::immediate();
        for retry in [0, 1, 10, 1000] {
            assert_eq!(policy.jitter(policy.interval(retry), 0.9), Duration::ZERO);
        }
        assert!(policy.allows_retry(1_000_000, Duration::from_secs(86_400), Duration::ZERO));
    }

    #[test]
    fn max_attempts_bounds_retries() {
        let policy = BackoffPolicy::immediate().with_max_attempts(Some(3));
        assert!(policy.allows_retry(2, Duration::ZERO, Duration::ZERO));
        assert!(!policy.allows_retry(3, Duration::ZERO, Duration::ZERO));
    }

    #[test]
    fn max_elapsed_accounts_for_the_next_sleep() {
        let policy = BackoffPolicy::default().with_max_elapsed(Some(Duration::from_secs(10)));
        assert!(policy.allows_retry(5, Duration::from_secs(8), Duration::from_secs(2)));
        assert!(!policy.allows_retry(5, Duration::from_secs(8), Duration::from_secs(3)));
    }

    #[test]
    fn unbounded_interval_saturates() {
        let policy = BackoffPolicy::default().with_max_interval(Duration::MAX);
        assert_eq!(policy.interval(200), Duration::MAX);
        assert_eq!(policy.jitter(Duration::MAX, 0.99), Duration::MAX);
        assert!(policy.jitter(Duration::MAX, 0.0) < Duration::MAX);
        assert!(!policy.allows_retry(1, Duration::from_secs(1), Duration::MAX));
    }
}
