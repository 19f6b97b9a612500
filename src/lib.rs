//! # Knockout Arena
//!
//! Match core for a local-multiplayer arena brawler: players slide around a
//! frozen platform, shove each other on contact and score a round for being
//! the last one standing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      KNOCKOUT ARENA                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Match configuration (JSON, serde)         │
//! │                                                              │
//! │  core/           - Primitives                                │
//! │  ├── time.rs     - Tick clock and seconds conversion         │
//! │  ├── math.rs     - Push direction and impulse helpers        │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Match logic                               │
//! │  ├── controller.rs - Round/match state machine               │
//! │  ├── knockback.rs  - Push gating and impulses                │
//! │  ├── sequence.rs   - Keyed scheduler for timed work          │
//! │  ├── respawn.rs    - Respawn and invulnerability             │
//! │  ├── giant.rs      - Giant mode                              │
//! │  ├── powerup.rs    - Power-up spawner                        │
//! │  ├── physics.rs    - Physics collaborator + arena solver     │
//! │  └── tick.rs       - One fixed simulation step               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Players live in `BTreeMap`s and every loop runs in player-id order.
//! Timed work runs on the tick clock, never on wall time, and all randomness
//! comes from the seeded RNG. The same config, registration and inputs
//! replay to the same event stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use config::{ConfigError, EliminationMode, MatchConfig};
pub use core::rng::DeterministicRng;
pub use core::time::Tick;
pub use game::controller::{MatchController, MatchPhase};
pub use game::player::PlayerId;
pub use game::registry::{MatchError, Registration};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
