//! Simulation Clock
//!
//! The match advances in fixed steps of `1 / TICK_RATE` seconds. Every
//! timestamp the core stores is a tick number; durations only exist in
//! seconds inside configuration and are converted once, here.

use crate::TICK_RATE;

/// Simulation time in fixed steps since the match started.
pub type Tick = u32;

/// Length of one tick in seconds.
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Convert a duration in seconds to whole ticks (rounded to nearest).
///
/// Negative and non-finite durations map to zero.
#[inline]
pub fn seconds_to_ticks(seconds: f32) -> Tick {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * TICK_RATE as f32).round() as Tick
}

/// Convert ticks back to seconds (for logs and UI).
#[inline]
pub fn ticks_to_seconds(ticks: Tick) -> f32 {
    ticks as f32 / TICK_RATE as f32
}
