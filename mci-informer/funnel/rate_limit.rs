use mci_config::RateLimitConfig;
use std::time::Duration;

#[cfg(test)]
#[path = "./rate_limit.tests.rs"]
mod rate_limit_tests;

/// Item based rate limiting policy of the [`EventFunnel`](crate::EventFunnel).
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimit {
    /// No delay at all.
    None,

    /// The same delay for every admission.
    Fixed(Duration),

    /// Delay is `base * 2^retries`, but never more than `max`.
    Exponential { base: Duration, max: Duration },
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(5),
            max: Duration::from_secs(1_000),
        }
    }
}

impl RateLimit {
    /// Returns how long an item that was already retried `retries` times should wait before it becomes visible.
    pub fn delay(&self, retries: u32) -> Duration {
        match self {
            RateLimit::None => Duration::ZERO,
            RateLimit::Fixed(delay) => *delay,
            RateLimit::Exponential { base, max } => 2_u32
                .checked_pow(retries)
                .and_then(|factor| base.checked_mul(factor))
                .map_or(*max, |delay| delay.min(*max)),
        }
    }
}

impl From<&RateLimitConfig> for RateLimit {
    fn from(value: &RateLimitConfig) -> Self {
        match value {
            RateLimitConfig::None => RateLimit::None,
            RateLimitConfig::Fixed { delay_ms } => RateLimit::Fixed(Duration::from_millis(*delay_ms)),
            RateLimitConfig::Exponential {
                base_delay_ms,
                max_delay_ms,
            } => RateLimit::Exponential {
                base: Duration::from_millis(*base_delay_ms),
                max: Duration::from_millis(*max_delay_ms),
            },
        }
    }
}
