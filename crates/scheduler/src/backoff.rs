use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter: `min(max, base * 2^n) * (0.5 + u*0.5)`,
/// `u` drawn fresh from `[0, 1)` on every call.
///
/// Unlike a deterministic attempt-indexed jitter, this needs true randomness
/// to spread concurrent retries of the same `retryCount` across the window
/// instead of lining them back up every `n`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffSchedule {
    base: Duration,
    max: Duration,
}

impl BackoffSchedule {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the next attempt for a row currently at `retry_count`.
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let unit: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.delay_with_unit(retry_count, unit)
    }

    /// Same formula with the jitter unit supplied explicitly, so callers can
    /// pin it down for deterministic tests.
    #[must_use]
    pub fn delay_with_unit(&self, retry_count: u32, jitter_unit: f64) -> Duration {
        // retry_count is a small bounded value (< maxRetries); clamp the
        // exponent so a pathological config can't overflow `powi`.
        let exponent = retry_count.min(32);
        let raw = self.base.as_secs_f64() * 2f64.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let capped = raw.min(self.max.as_secs_f64());
        let factor = 0.5 + jitter_unit.clamp(0.0, 1.0) * 0.5;
        Duration::from_secs_f64(capped * factor)
    }

    /// Whether `updated_at + delay_for(retry_count) <= now`. Draws a fresh
    /// jitter unit per call; see [`Self::elapsed_with_unit`] for a
    /// reproducible variant.
    #[must_use]
    pub fn elapsed(&self, updated_at: chrono::DateTime<chrono::Utc>, retry_count: u32, now: chrono::DateTime<chrono::Utc>) -> bool {
        let unit: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.elapsed_with_unit(updated_at, retry_count, unit, now)
    }

    /// Whether `updated_at + delay_for(retry_count) <= now`, using an
    /// explicit jitter unit so the cutoff test is reproducible.
    #[must_use]
    pub fn elapsed_with_unit(&self, updated_at: chrono::DateTime<chrono::Utc>, retry_count: u32, jitter_unit: f64, now: chrono::DateTime<chrono::Utc>) -> bool {
        let delay = self.delay_with_unit(retry_count, jitter_unit);
        match chrono::Duration::from_std(delay) {
            Ok(delay) => updated_at + delay <= now,
            Err(_) => false,
        }
    }
}

impl Default for BackoffSchedule {
    /// `base=10s`, `maxBackoff=10m`, the spec's defaults.
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_jitter_doubles_each_retry() {
        let schedule = BackoffSchedule::new(Duration::from_secs(10), Duration::from_secs(600));
        assert_eq!(schedule.delay_with_unit(0, 1.0), Duration::from_secs(10));
        assert_eq!(schedule.delay_with_unit(1, 1.0), Duration::from_secs(20));
        assert_eq!(schedule.delay_with_unit(2, 1.0), Duration::from_secs(40));
    }

    #[test]
    fn clamps_to_max_backoff() {
        let schedule = BackoffSchedule::new(Duration::from_secs(10), Duration::from_secs(600));
        assert_eq!(schedule.delay_with_unit(10, 1.0), Duration::from_secs(600));
    }

    #[test]
    fn jitter_halves_the_floor() {
        let schedule = BackoffSchedule::new(Duration::from_secs(10), Duration::from_secs(600));
        assert_eq!(schedule.delay_with_unit(0, 0.0), Duration::from_secs(5));
    }

    #[test]
    fn monotonic_for_a_fixed_jitter_unit() {
        let schedule = BackoffSchedule::new(Duration::from_secs(1), Duration::from_secs(600));
        let unit = 0.37;
        let mut previous = Duration::ZERO;
        for retry_count in 0..8 {
            let delay = schedule.delay_with_unit(retry_count, unit);
            assert!(delay >= previous, "backoff must not shrink as retry_count grows");
            previous = delay;
        }
    }

    #[test]
    fn elapsed_is_false_before_the_cutoff_and_true_after() {
        let schedule = BackoffSchedule::new(Duration::from_secs(10), Duration::from_secs(600));
        let updated_at = chrono::Utc::now() - chrono::Duration::seconds(5);
        let now = chrono::Utc::now();
        // unit=1.0 -> delay 10s, 5s elapsed so far -> not yet due.
        assert!(!schedule.elapsed_with_unit(updated_at, 0, 1.0, now));
        // unit=0.0 -> delay 5s, 5s elapsed -> due.
        assert!(schedule.elapsed_with_unit(updated_at, 0, 0.0, now));
    }

    #[test]
    fn random_delay_for_stays_within_bounds() {
        let schedule = BackoffSchedule::new(Duration::from_secs(10), Duration::from_secs(600));
        for _ in 0..50 {
            let delay = schedule.delay_for(3);
            assert!(delay >= Duration::from_secs(40)); // 10*2^3 * 0.5
            assert!(delay <= Duration::from_secs(80)); // 10*2^3 * 1.0
        }
    }
}
