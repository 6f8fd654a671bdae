//! Backoff math for transient provider errors.
//!
//! The orchestrator never sleeps on its own schedule; callers own the
//! polling cadence and ask for an advisory delay instead. Centralizing
//! the math here keeps every caller backing off the same way.

use std::time::Duration;

/// Polling interval the generation providers recommend between status
/// checks. Advisory only.
pub const RECOMMENDED_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Default bound on consecutive transient polling failures before a task
/// is failed with a retries-exhausted reason.
pub const DEFAULT_MAX_POLL_RETRIES: u32 = 3;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay suggested after the first transient failure.
    pub initial_delay: Duration,
    /// Upper bound on the suggested delay.
    pub max_delay: Duration,
    /// Growth factor applied per consecutive failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Advisory delay before retrying after `attempt` consecutive transient
/// failures (1-based): `initial_delay * multiplier^(attempt - 1)`,
/// clamped to [`BackoffConfig::max_delay`].
pub fn retry_delay(attempt: u32, config: &BackoffConfig) -> Duration {
    // Cap the exponent; the clamp below dominates long before 2^63.
    let exponent = attempt.saturating_sub(1).min(63);
    let millis = (config.initial_delay.as_millis() as f64 * config.multiplier.powi(exponent as i32))
        .min(config.max_delay.as_millis() as f64);
    Duration::from_millis(millis as u64)
}
