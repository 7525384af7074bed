use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::time::{Duration, Instant};

#[cfg(test)]
#[path = "./backoff.tests.rs"]
mod backoff_tests;

/// Period of calm after which the backoff starts again from the minimal delay.
const RESET_AFTER_SECS: u64 = 120;

/// Resettable backoff policy.
pub struct ResettableBackoff {
    backoff: ExponentialBackoff,
    builder: ExponentialBuilder,
    start_time: Instant,
}

impl Default for ResettableBackoff {
    /// Creates default resettable backoff policy adjusted for Kubernetes API.
    fn default() -> Self {
        Self::new(Duration::from_millis(800), Duration::from_secs(30))
    }
}

impl ResettableBackoff {
    /// Creates new [`ResettableBackoff`] instance that grows from `min_delay` up to `max_delay`.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let builder = ExponentialBuilder::default()
            .with_min_delay(min_delay)
            .with_max_delay(max_delay.max(min_delay))
            .with_factor(2.0)
            .without_max_times()
            .with_jitter();
        let backoff = builder.build();

        Self {
            backoff,
            builder,
            start_time: Instant::now(),
        }
    }

    /// Gets next backoff duration.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.start_time.elapsed().as_secs() > RESET_AFTER_SECS {
            self.reset();
        }

        self.backoff.next()
    }

    /// Resets backoff.
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
        self.backoff = self.builder.build();
    }
}

impl Iterator for ResettableBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_backoff()
    }
}
