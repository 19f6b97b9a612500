//! Game Logic Module
//!
//! The match itself: players, rounds, knockback and the timed effects
//! around them. Deterministic for a given seed and input sequence.
//!
//! ## Module Structure
//!
//! - `player`: Player ids and per-player agent state
//! - `registry`: Player numbering and spawn assignment
//! - `input`: Keyboard/joystick sampling into input frames
//! - `physics`: Physics collaborator trait and the arena solver
//! - `knockback`: Push gating and impulse math
//! - `controller`: Round/match state machine
//! - `sequence`: Keyed scheduler for delayed and periodic work
//! - `respawn`: Respawn, invulnerability window and flashing
//! - `giant`: Giant-mode grow/hold/shrink
//! - `powerup`: Power-up spawning, expiry and pickup
//! - `presentation`: Requests for the rendering/UI layer
//! - `events`: Match events for logs and replay comparison
//! - `tick`: One fixed simulation step

pub mod controller;
pub mod events;
pub mod giant;
pub mod input;
pub mod knockback;
pub mod physics;
pub mod player;
pub mod powerup;
pub mod presentation;
pub mod registry;
pub mod respawn;
pub mod sequence;
pub mod tick;

// Re-export key types
pub use controller::{MatchController, MatchPhase};
pub use events::{MatchEvent, MatchEventData};
pub use input::{InputFrame, InputSource, Key, RawInput};
pub use knockback::{Knockback, PushRejection};
pub use physics::{ArenaPhysics, PhysicsBackend, PhysicsNotification, RegionKind};
pub use player::{PlayerAgent, PlayerId, Pushable};
pub use powerup::PowerupKind;
pub use presentation::{PresentationRequest, TextSlot};
pub use registry::{DiscoveredObject, MatchError, PlayerSpec, Registration};
pub use tick::{tick, tick_with_frames, TickResult};
