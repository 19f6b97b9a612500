//! Knockback Resolution
//!
//! Turns a contact between two players into an impulse on the defender.
//! Evaluation is pure (`evaluate_push`) so the gating and force rules can be
//! checked without a solver; `apply_knockback` then drives the physics
//! collaborator.
//!
//! Gating, in order:
//! 1. both players must be in play (alive and active)
//! 2. the defender must not be flagged invulnerable
//! 3. the defender must not declare itself invulnerable
//! 4. the attacker must be off cooldown; the cooldown is per attacker, not
//!    per attacker/defender pair
//! 5. the push direction must not be degenerate

use glam::Vec3;
use thiserror::Error;

use crate::config::PushConfig;
use crate::core::math::{compose_impulse, push_direction};
use crate::core::time::{seconds_to_ticks, Tick};
use crate::game::physics::PhysicsBackend;
use crate::game::player::{PlayerAgent, PlayerId, Pushable};

/// Why a push had no effect. Rejections are normal gameplay, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushRejection {
    /// A player cannot push itself.
    #[error("attacker and defender are the same player")]
    SelfPush,

    /// Attacker or defender is eliminated or inactive.
    #[error("attacker or defender is out of play")]
    OutOfPlay,

    /// Defender is flagged invulnerable.
    #[error("defender is invulnerable")]
    DefenderInvulnerable,

    /// Defender declares its own invulnerability.
    #[error("defender declared invulnerability")]
    DefenderDeclaredInvulnerable,

    /// Attacker pushed too recently.
    #[error("attacker is on push cooldown")]
    AttackerCoolingDown,

    /// Players are at the same position.
    #[error("push direction is degenerate")]
    DegenerateDirection,
}

/// A resolved push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    /// Pushing player
    pub attacker: PlayerId,
    /// Pushed player
    pub defender: PlayerId,
    /// Horizontal-ish unit direction from attacker to defender
    pub direction: Vec3,
    /// Impulse length
    pub magnitude: f32,
    /// Final velocity change applied to the defender
    pub impulse: Vec3,
}

/// Force of a push after modifiers and giant-size rules.
///
/// `attacker.push_force × defender.knockback_multiplier`, then ×
/// `giant_attacker_bonus` if the attacker is giant and ×
/// `giant_defender_resistance` if the defender is giant.
pub fn push_magnitude(attacker: &PlayerAgent, defender: &PlayerAgent, push: &PushConfig) -> f32 {
    let mut magnitude = attacker.push_force * defender.knockback_multiplier;

    if attacker.is_giant(push.giant_threshold) {
        magnitude *= push.giant_attacker_bonus;
    }
    if defender.is_giant(push.giant_threshold) {
        magnitude *= push.giant_defender_resistance;
    }

    magnitude
}

/// Decide whether `attacker` pushes `defender` at `now` and with what impulse.
pub fn evaluate_push(
    attacker: &PlayerAgent,
    defender: &PlayerAgent,
    attacker_position: Vec3,
    defender_position: Vec3,
    now: Tick,
    push: &PushConfig,
) -> Result<Knockback, PushRejection> {
    if attacker.id == defender.id {
        return Err(PushRejection::SelfPush);
    }
    if !attacker.is_in_play() || !defender.is_in_play() {
        return Err(PushRejection::OutOfPlay);
    }
    if defender.invulnerable {
        return Err(PushRejection::DefenderInvulnerable);
    }
    if defender.declares_invulnerable(now) {
        return Err(PushRejection::DefenderDeclaredInvulnerable);
    }
    if attacker.push_on_cooldown(now, seconds_to_ticks(push.push_cooldown)) {
        return Err(PushRejection::AttackerCoolingDown);
    }

    let direction = push_direction(attacker_position, defender_position)
        .ok_or(PushRejection::DegenerateDirection)?;
    let magnitude = push_magnitude(attacker, defender, push);
    let impulse = compose_impulse(direction, push.upward_lift, magnitude)
        .ok_or(PushRejection::DegenerateDirection)?;

    Ok(Knockback {
        attacker: attacker.id,
        defender: defender.id,
        direction,
        magnitude,
        impulse,
    })
}

/// Replace the defender's velocity with the knockback impulse.
///
/// Zeroing first keeps back-to-back hits from stacking into one
/// uncontrolled combined velocity.
pub fn apply_knockback(physics: &mut dyn PhysicsBackend, knockback: &Knockback) {
    physics.set_velocity(knockback.defender, Vec3::ZERO);
    physics.apply_impulse(knockback.defender, knockback.impulse);
}

// =============================================================================
// TESTS
// =============================================================================
