//! Drift-corrected interval arithmetic
//!
//! Fires are phased against the start instant `T0`, never against the
//! previous fire, so the n-th fire lands as close as possible to `T0 + n·I`.

use std::time::Duration;

/// Next fire instant in epoch milliseconds for a routine started at
/// `start_ms`, evaluated at `now_ms`.
///
/// Always strictly after `now_ms`. Several missed intervals collapse into the
/// next boundary.
pub fn next_fire_ms(start_ms: i64, now_ms: i64, interval_ms: i64) -> i64 {
    let drift = (now_ms - start_ms).rem_euclid(interval_ms);
    now_ms + interval_ms - drift
}

/// Delay from now until the next boundary, given the time elapsed since the
/// routine started.
pub fn delay_until_next(elapsed: Duration, interval: Duration) -> Duration {
    let interval_nanos = interval.as_nanos().max(1);
    let drift = elapsed.as_nanos() % interval_nanos;
    let delay = interval_nanos - drift;

    Duration::from_nanos(u64::try_from(delay).unwrap_or(u64::MAX))
}
