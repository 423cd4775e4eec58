//! TTL jitter.

use rand::Rng;
use std::time::Duration;

/// Sample a TTL uniformly from `ttl * (1 ± jitter_percent / 100)`.
pub fn jittered_ttl(ttl: Duration, jitter_percent: f64) -> Duration {
    jittered_ttl_with(&mut rand::rng(), ttl, jitter_percent)
}

/// [`jittered_ttl`] with a caller-supplied RNG.
pub fn jittered_ttl_with<R: Rng + ?Sized>(rng: &mut R, ttl: Duration, jitter_percent: f64) -> Duration {
    if jitter_percent <= 0.0 || ttl.is_zero() {
        return ttl;
    }
    let (lo, hi) = bounds_secs(ttl, jitter_percent);
    Duration::from_secs_f64(rng.random_range(lo..=hi))
}

/// Inclusive range every jittered TTL falls in.
pub fn jitter_bounds(ttl: Duration, jitter_percent: f64) -> (Duration, Duration) {
    if jitter_percent <= 0.0 || ttl.is_zero() {
        return (ttl, ttl);
    }
    let (lo, hi) = bounds_secs(ttl, jitter_percent);
    (Duration::from_secs_f64(lo), Duration::from_secs_f64(hi))
}

fn bounds_secs(ttl: Duration, jitter_percent: f64) -> (f64, f64) {
    let base = ttl.as_secs_f64();
    let spread = base * jitter_percent.min(100.0) / 100.0;
    (base - spread, base + spread)
}
