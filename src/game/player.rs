//! Player Agents
//!
//! Per-player gameplay state. Body state (position, velocity, orientation)
//! belongs to the physics collaborator and is looked up by `PlayerId`; the
//! agent only keeps what the match rules need.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::game::input::InputSource;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Player number, unique within a match (1-based).
///
/// Implements Ord so players iterate in number order everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create from a player number.
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Player number.
    pub const fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// =============================================================================
// PUSHABLE
// =============================================================================

/// Something the knockback resolver can push.
pub trait Pushable {
    /// Whether this target currently refuses knockback on its own account,
    /// independent of the `invulnerable` flag the match manages.
    fn declares_invulnerable(&self, now: Tick) -> bool;
}

// =============================================================================
// PLAYER AGENT
// =============================================================================

/// Runtime state of one player.
#[derive(Clone, Debug)]
pub struct PlayerAgent {
    /// Player number
    pub id: PlayerId,

    /// Display label the player was registered with
    pub label: String,

    /// Still in this round
    pub alive: bool,

    /// Present in the simulation (false while waiting to respawn)
    pub active: bool,

    /// Incoming pushes are rejected while set
    pub invulnerable: bool,

    /// End of the current invulnerability window, if one is running
    pub invulnerable_until: Option<Tick>,

    /// Visual/physical size, 1.0 = normal
    pub size_scale: f32,

    /// Outgoing push force before size rules
    pub push_force: f32,

    /// Multiplier on knockback this player receives
    pub knockback_multiplier: f32,

    /// Renderer visibility (toggled by the invulnerability flash)
    pub visible: bool,

    /// Tick of the last successful outgoing push
    pub last_push_tick: Option<Tick>,

    /// Who pushed this player last this round
    pub last_attacker: Option<PlayerId>,

    /// How this player's movement is read
    pub input: InputSource,

    /// Players this agent knocked off the platform (informational)
    pub knockouts: u32,

    /// Times this agent fell off the platform (informational)
    pub falls: u32,

    spawn_position: Vec3,
    base_push_force: f32,
}

impl PlayerAgent {
    /// Create a player at its spawn position.
    pub fn new(
        id: PlayerId,
        label: impl Into<String>,
        spawn_position: Vec3,
        base_push_force: f32,
        input: InputSource,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            alive: true,
            active: true,
            invulnerable: false,
            invulnerable_until: None,
            size_scale: 1.0,
            push_force: base_push_force,
            knockback_multiplier: 1.0,
            visible: true,
            last_push_tick: None,
            last_attacker: None,
            input,
            knockouts: 0,
            falls: 0,
            spawn_position,
            base_push_force,
        }
    }

    /// Fixed spawn point for the whole match.
    #[inline]
    pub fn spawn_position(&self) -> Vec3 {
        self.spawn_position
    }

    /// Push force with no modifiers applied.
    #[inline]
    pub fn base_push_force(&self) -> f32 {
        self.base_push_force
    }

    /// Can this player take part in collisions right now?
    #[inline]
    pub fn is_in_play(&self) -> bool {
        self.alive && self.active
    }

    /// Is the player above the giant size threshold?
    #[inline]
    pub fn is_giant(&self, threshold: f32) -> bool {
        self.size_scale > threshold
    }

    /// Is the attacker still cooling down from its last push?
    #[inline]
    pub fn push_on_cooldown(&self, now: Tick, cooldown: Tick) -> bool {
        self.last_push_tick
            .is_some_and(|last| now < last.saturating_add(cooldown))
    }

    /// Drop size and force modifiers back to baseline.
    pub fn clear_modifiers(&mut self) {
        self.size_scale = 1.0;
        self.push_force = self.base_push_force;
        self.knockback_multiplier = 1.0;
    }

    /// Clear invulnerability and restore visibility.
    pub fn clear_invulnerability(&mut self) {
        self.invulnerable = false;
        self.invulnerable_until = None;
        self.visible = true;
    }

    /// Gameplay part of the round reset (the physics part is done by the
    /// controller).
    pub fn reset_for_round(&mut self) {
        self.alive = true;
        self.active = true;
        self.clear_invulnerability();
        self.clear_modifiers();
        self.last_push_tick = None;
        self.last_attacker = None;
    }
}

impl Pushable for PlayerAgent {
    fn declares_invulnerable(&self, now: Tick) -> bool {
        self.invulnerable_until.is_some_and(|until| now < until)
    }
}
