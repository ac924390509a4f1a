use std::time::Duration;

use super::extract::PROGRESS_EPSILON;

/// Estimates remaining seconds from the time spent so far and the
/// completion ratio, assuming a constant rate.
///
/// Returns `None` while the ratio is too small (or not finite) to
/// extrapolate from.
pub fn estimate_eta(elapsed: Duration, ratio: f64) -> Option<u64> {
    if !ratio.is_finite() || ratio <= PROGRESS_EPSILON {
        return None;
    }
    let ratio = ratio.min(1.0);
    let remaining = elapsed.as_secs_f64() * (1.0 - ratio) / ratio;
    Some(remaining.trunc() as u64)
}
