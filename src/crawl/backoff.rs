use rand::Rng;
use std::time::Duration;

/// Exponential backoff with ±30% jitter before fetch retry `attempt`
/// (zero-based).
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    // 2^6 keeps the longest wait near a minute for a one-second base
    let exponent = attempt.min(6);
    let delay = base.saturating_mul(2_u32.pow(exponent));

    let jitter = rand::thread_rng().gen_range(0.7..1.3);
    delay.mul_f64(jitter)
}
