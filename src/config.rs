//! Match Configuration
//!
//! Every tunable of the match lives here. Durations are in seconds and are
//! converted to ticks by the modules that schedule on them. All sections
//! default individually, so a config file only needs the values it changes:
//!
//! ```json
//! { "rounds": { "max_rounds": 3 }, "push": { "base_push_force": 12.0 } }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::{seconds_to_ticks, Tick};
use crate::game::powerup::PowerupKind;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for `MatchConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its allowed range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

// =============================================================================
// ELIMINATION MODE
// =============================================================================

/// What happens when a player falls off the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationMode {
    /// Fallen players stay out until the round ends (best-of-N match).
    #[default]
    Rounds,
    /// Fallen players respawn after a delay with a short invulnerability.
    Respawn,
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Round and match length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Best-of-N series length
    pub max_rounds: u32,
    /// Pause between a decided round and the next reset (seconds)
    pub round_end_delay: f32,
    /// Round-based elimination or legacy respawn flow
    pub mode: EliminationMode,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            round_end_delay: 3.0,
            mode: EliminationMode::Rounds,
        }
    }
}

impl RoundConfig {
    /// Wins needed to take the match: `ceil(max_rounds / 2)`.
    pub fn win_threshold(&self) -> u32 {
        self.max_rounds.div_ceil(2)
    }
}

/// Knockback tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Impulse magnitude of a normal push
    pub base_push_force: f32,
    /// Per-attacker cooldown between successful pushes (seconds)
    pub push_cooldown: f32,
    /// Upward component mixed into the push direction before normalizing
    pub upward_lift: f32,
    /// Size scale above which a player counts as giant
    pub giant_threshold: f32,
    /// Force multiplier when the attacker is giant
    pub giant_attacker_bonus: f32,
    /// Force multiplier when the defender is giant
    pub giant_defender_resistance: f32,
    /// Camera shake requested on every successful push
    pub camera_shake_intensity: f32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            base_push_force: 10.0,
            push_cooldown: 0.5,
            upward_lift: 0.25,
            giant_threshold: 4.0,
            giant_attacker_bonus: 1.5,
            giant_defender_resistance: 0.5,
            camera_shake_intensity: 0.3,
        }
    }
}

/// Respawn mode timings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnConfig {
    /// Time a fallen player stays out (seconds)
    pub respawn_delay: f32,
    /// Invulnerability window after respawning (seconds)
    pub invulnerability_time: f32,
    /// Visibility toggle period during the window (seconds)
    pub flash_interval: f32,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            respawn_delay: 2.0,
            invulnerability_time: 1.0,
            flash_interval: 0.1,
        }
    }
}

/// Giant-mode power-up effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GiantConfig {
    /// Time held at peak size (seconds)
    pub duration: f32,
    /// Size scale at the peak
    pub peak_scale: f32,
    /// Number of animation steps up (and down)
    pub steps: u32,
    /// Time between animation steps (seconds)
    pub step_interval: f32,
    /// Push-force multiplier while at peak
    pub force_multiplier: f32,
    /// Multiplier on knockback received while at peak
    pub knockback_multiplier: f32,
}

impl Default for GiantConfig {
    fn default() -> Self {
        Self {
            duration: 5.0,
            peak_scale: 5.0,
            steps: 3,
            step_interval: 0.15,
            force_multiplier: 2.0,
            knockback_multiplier: 0.5,
        }
    }
}

/// Power-up spawner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupConfig {
    /// Kinds to pick from; empty disables spawning
    pub kinds: Vec<PowerupKind>,
    /// Wait before each spawn attempt (seconds)
    pub delay_between_spawns: f32,
    /// Time an uncollected power-up stays on the floor (seconds)
    pub lifetime: f32,
    /// Spawn area width (X)
    pub arena_width: f32,
    /// Spawn area length (Z)
    pub arena_length: f32,
    /// Height of the arena floor
    pub floor_y: f32,
    /// Offset above the floor
    pub y_offset: f32,
    /// Trigger radius of a power-up
    pub pickup_radius: f32,
}

impl Default for PowerupConfig {
    fn default() -> Self {
        Self {
            kinds: vec![PowerupKind::Giant],
            delay_between_spawns: 7.0,
            lifetime: 5.0,
            arena_width: 10.0,
            arena_length: 10.0,
            floor_y: 0.0,
            y_offset: 0.01,
            pickup_radius: 0.6,
        }
    }
}

/// Player movement on the ice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Force applied along the input direction
    pub move_force: f32,
    /// Input force is only applied below this speed
    pub max_speed: f32,
    /// Velocity multiplier per tick
    pub friction: f32,
    /// Turn rate towards the input direction
    pub rotation_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_force: 10.0,
            max_speed: 5.0,
            friction: 0.98,
            rotation_speed: 10.0,
        }
    }
}

/// Reference arena geometry (used by `ArenaPhysics`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Radius of the circular platform at y = 0
    pub platform_radius: f32,
    /// Bodies below this height are in the death zone
    pub kill_plane_y: f32,
    /// Collision radius of a normal-sized player
    pub player_radius: f32,
    /// Downward acceleration off the platform
    pub gravity: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            platform_radius: 6.0,
            kill_plane_y: -5.0,
            player_radius: 0.5,
            gravity: 9.81,
        }
    }
}

// =============================================================================
// MATCH CONFIG
// =============================================================================

/// Complete match configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Round and match length
    pub rounds: RoundConfig,
    /// Knockback tuning
    pub push: PushConfig,
    /// Respawn mode timings
    pub respawn: RespawnConfig,
    /// Giant-mode effect
    pub giant: GiantConfig,
    /// Power-up spawner
    pub powerups: PowerupConfig,
    /// Movement
    pub movement: MovementConfig,
    /// Arena geometry
    pub arena: ArenaConfig,
    /// Explicit spawn slots, assigned positionally
    pub spawn_points: Vec<Vec3>,
    /// Seed for power-up placement
    pub rng_seed: u64,
}

impl MatchConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: "must be a positive number" })
            }
        }
        fn non_negative(value: f32, field: &'static str) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason: "must not be negative" })
            }
        }

        if self.rounds.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "rounds.max_rounds",
                reason: "must be at least 1",
            });
        }
        non_negative(self.rounds.round_end_delay, "rounds.round_end_delay")?;

        positive(self.push.base_push_force, "push.base_push_force")?;
        non_negative(self.push.push_cooldown, "push.push_cooldown")?;
        non_negative(self.push.upward_lift, "push.upward_lift")?;
        positive(self.push.giant_threshold, "push.giant_threshold")?;
        positive(self.push.giant_attacker_bonus, "push.giant_attacker_bonus")?;
        positive(self.push.giant_defender_resistance, "push.giant_defender_resistance")?;

        non_negative(self.respawn.respawn_delay, "respawn.respawn_delay")?;
        non_negative(self.respawn.invulnerability_time, "respawn.invulnerability_time")?;
        positive(self.respawn.flash_interval, "respawn.flash_interval")?;

        non_negative(self.giant.duration, "giant.duration")?;
        positive(self.giant.peak_scale, "giant.peak_scale")?;
        positive(self.giant.step_interval, "giant.step_interval")?;
        positive(self.giant.force_multiplier, "giant.force_multiplier")?;
        positive(self.giant.knockback_multiplier, "giant.knockback_multiplier")?;
        if self.giant.steps == 0 {
            return Err(ConfigError::Invalid {
                field: "giant.steps",
                reason: "must be at least 1",
            });
        }

        positive(self.powerups.delay_between_spawns, "powerups.delay_between_spawns")?;
        positive(self.powerups.lifetime, "powerups.lifetime")?;
        positive(self.powerups.pickup_radius, "powerups.pickup_radius")?;

        positive(self.arena.player_radius, "arena.player_radius")?;
        positive(self.arena.platform_radius, "arena.platform_radius")?;

        if !(self.movement.friction > 0.0 && self.movement.friction <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "movement.friction",
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }

    /// Push cooldown in ticks.
    pub fn push_cooldown_ticks(&self) -> Tick {
        seconds_to_ticks(self.push.push_cooldown)
    }

    /// Round-end delay in ticks.
    pub fn round_end_delay_ticks(&self) -> Tick {
        seconds_to_ticks(self.rounds.round_end_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        MatchConfig::default().validate().unwrap();
    }

    #[test]
    fn test_win_threshold() {
        let mut rounds = RoundConfig::default();
        rounds.max_rounds = 5;
        assert_eq!(rounds.win_threshold(), 3);
        rounds.max_rounds = 4;
        assert_eq!(rounds.win_threshold(), 2);
        rounds.max_rounds = 1;
        assert_eq!(rounds.win_threshold(), 1);
    }

    #[test]
    fn test_partial_json() {
        let config = MatchConfig::from_json_str(
            r#"{
                "rounds": { "max_rounds": 3, "mode": "respawn" },
                "spawn_points": [[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]]
            }"#,
        )
        .unwrap();

        assert_eq!(config.rounds.max_rounds, 3);
        assert_eq!(config.rounds.mode, EliminationMode::Respawn);
        assert_eq!(config.rounds.round_end_delay, 3.0);
        assert_eq!(config.push, PushConfig::default());
        assert_eq!(config.spawn_points, vec![Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = MatchConfig::from_json_str(r#"{ "rounds": { "max_rounds": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "rounds.max_rounds", .. }));

        let err = MatchConfig::from_json_str(r#"{ "push": { "base_push_force": -1.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "push.base_push_force", .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = MatchConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_tick_conversions() {
        let config = MatchConfig::default();
        assert_eq!(config.push_cooldown_ticks(), 30);
        assert_eq!(config.round_end_delay_ticks(), 180);
    }
}
