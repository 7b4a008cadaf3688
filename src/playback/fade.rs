//! Fade-in gain ramp.
//!
//! Pure gain computation used by the device output loop: linear ramp from
//! 0 to the target volume over a fixed warm-up window.

use std::time::Duration;

/// Returns the output gain at `elapsed` into a fade window.
///
/// Gain is 0 at t=0, rises linearly, and holds at `target` once the
/// window has passed. Monotone non-decreasing in `elapsed`. A zero-length
/// window means no ramp: the target applies immediately.
pub fn gain_at(elapsed: Duration, window: Duration, target: f32) -> f32 {
    if window.is_zero() {
        return target;
    }
    let fraction = (elapsed.as_secs_f32() / window.as_secs_f32()).min(1.0);
    fraction * target
}
