//! Randomized exponential backoff.
//!
//! Shared by the login poller and any caller that retries an HTTP request.
//! The delay for an attempt is `base * 2^attempt` with ±25% uniform jitter,
//! so clients that started together drift apart instead of retrying in lockstep.

use std::time::Duration;

use rand::Rng;

/// Smallest delay ever returned, so a zero base never turns into a busy loop.
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// Attempts beyond this are treated as this value to keep `2^attempt` finite.
pub const MAX_ATTEMPT: u32 = 16;

/// Fraction of the exponential value used as the jitter half-width.
const JITTER_FRACTION: f64 = 0.25;

/// Compute the jittered delay before retry number `attempt` (0-based).
pub fn delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.as_secs_f64() * 2f64.powi(attempt.min(MAX_ATTEMPT) as i32);
    let spread = exponential * JITTER_FRACTION;
    let offset = if spread > 0.0 {
        rand::thread_rng().gen_range(-spread..=spread)
    } else {
        0.0
    };

    Duration::try_from_secs_f64((exponential + offset).max(0.0))
        .unwrap_or(Duration::MAX)
        .max(MIN_DELAY)
}
