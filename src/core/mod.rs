//! Core primitives shared by the match simulation.
//!
//! Nothing in here knows about players or rounds; these are the clock,
//! the vector helpers and the seeded RNG the game modules build on.

pub mod math;
pub mod rng;
pub mod time;

// Re-export core types
pub use math::{compose_impulse, flat_direction, push_direction};
pub use rng::DeterministicRng;
pub use time::{seconds_to_ticks, ticks_to_seconds, Tick};
