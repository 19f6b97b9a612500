//! Giant Mode
//!
//! Timed size-up effect granted by the giant power-up. The player grows to
//! the peak scale in a few discrete steps, holds there for the configured
//! duration with boosted push force and reduced knockback, then shrinks back
//! in the same number of steps. The last shrink step restores baseline size,
//! force and knockback exactly.
//!
//! Each step reschedules the player's `GiantMode` key, so a round reset or
//! respawn stops the effect by cancelling that key.

use tracing::{debug, info};

use crate::core::math::lerp;
use crate::game::controller::MatchController;
use crate::game::events::MatchEventData;
use crate::game::player::PlayerId;
use crate::game::presentation::Easing;
use crate::game::sequence::{SequenceKey, SequenceKind, SequenceStep};

/// Where a giant-mode sequence is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GiantPhase {
    /// Growing; `step` of `steps` (1-based)
    Grow {
        /// Step number
        step: u32,
    },
    /// Peak reached: modifiers switch on and the hold starts.
    Hold,
    /// Shrinking; `step` of `steps` (1-based)
    Shrink {
        /// Step number
        step: u32,
    },
}

/// Size at a grow step.
pub fn grow_scale(step: u32, steps: u32, peak: f32) -> f32 {
    let steps = steps.max(1);
    lerp(1.0, peak, step.min(steps) as f32 / steps as f32)
}

/// Size at a shrink step; the last one is exactly 1.0.
pub fn shrink_scale(step: u32, steps: u32, peak: f32) -> f32 {
    let steps = steps.max(1);
    if step >= steps {
        1.0
    } else {
        lerp(peak, 1.0, step as f32 / steps as f32)
    }
}

fn key(id: PlayerId) -> SequenceKey {
    SequenceKey::for_player(id, SequenceKind::GiantMode)
}

/// Start (or restart) giant mode for a player.
///
/// A player already in giant mode starts over from the first grow step with
/// the modifiers dropped back to baseline until the peak is reached again.
/// Returns false if the player is not in play.
pub fn begin_giant_mode(ctl: &mut MatchController, id: PlayerId) -> bool {
    let Some(agent) = ctl.players.get_mut(&id) else {
        return false;
    };
    if !agent.is_in_play() {
        return false;
    }

    agent.push_force = agent.base_push_force();
    agent.knockback_multiplier = 1.0;

    if ctl.scheduler.cancel(key(id)) {
        debug!(player = %id, "giant mode restarted");
    }
    advance_giant(ctl, id, GiantPhase::Grow { step: 1 });
    true
}

/// Run one giant-mode step and schedule the next.
pub fn advance_giant(ctl: &mut MatchController, id: PlayerId, phase: GiantPhase) {
    if !ctl.players.contains_key(&id) {
        return;
    }

    let giant = ctl.config.giant.clone();
    let steps = giant.steps.max(1);

    match phase {
        GiantPhase::Grow { step } => {
            let scale = grow_scale(step, steps, giant.peak_scale);
            ctl.set_size(id, scale, giant.step_interval, Easing::OutBack);

            let next = if step < steps {
                GiantPhase::Grow { step: step + 1 }
            } else {
                GiantPhase::Hold
            };
            ctl.schedule_in(key(id), giant.step_interval, SequenceStep::Giant(next));
        }

        GiantPhase::Hold => {
            if let Some(agent) = ctl.players.get_mut(&id) {
                agent.push_force = agent.base_push_force() * giant.force_multiplier;
                agent.knockback_multiplier = giant.knockback_multiplier;
            }
            info!(player = %id, duration = giant.duration, "giant mode");
            ctl.emit(MatchEventData::GiantModeStarted { player: id });
            ctl.schedule_in(
                key(id),
                giant.duration,
                SequenceStep::Giant(GiantPhase::Shrink { step: 1 }),
            );
        }

        GiantPhase::Shrink { step } => {
            let scale = shrink_scale(step, steps, giant.peak_scale);
            ctl.set_size(id, scale, giant.step_interval, Easing::InQuad);

            if step < steps {
                ctl.schedule_in(
                    key(id),
                    giant.step_interval,
                    SequenceStep::Giant(GiantPhase::Shrink { step: step + 1 }),
                );
            } else {
                if let Some(agent) = ctl.players.get_mut(&id) {
                    agent.clear_modifiers();
                }
                debug!(player = %id, "giant mode over");
                ctl.emit(MatchEventData::GiantModeEnded { player: id });
            }
        }
    }
}

/// Stop giant mode immediately and drop back to baseline.
pub fn cancel_giant_mode(ctl: &mut MatchController, id: PlayerId) {
    ctl.scheduler.cancel(key(id));
    if let Some(agent) = ctl.players.get_mut(&id) {
        agent.clear_modifiers();
    }
    ctl.physics.set_scale(id, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::core::time::seconds_to_ticks;
    use crate::game::registry::{PlayerSpec, Registration};
    use crate::game::tick::tick_with_frames;
    use glam::Vec3;
    use std::collections::BTreeMap;

    const P1: PlayerId = PlayerId::new(1);
    const P2: PlayerId = PlayerId::new(2);

    fn controller() -> MatchController {
        let mut config = MatchConfig::default();
        config.powerups.kinds.clear();
        let reg = Registration::Explicit(vec![
            PlayerSpec::new("Player1").at(Vec3::new(-4.0, 0.0, 0.0)),
            PlayerSpec::new("Player2").at(Vec3::new(4.0, 0.0, 0.0)),
        ]);
        MatchController::with_arena_physics(config, reg).unwrap()
    }

    fn run(ctl: &mut MatchController, ticks: u32) {
        for _ in 0..ticks {
            tick_with_frames(ctl, &BTreeMap::new());
        }
    }

    #[test]
    fn test_scale_steps() {
        assert!((grow_scale(1, 3, 5.0) - 7.0 / 3.0).abs() < 1e-5);
        assert_eq!(grow_scale(3, 3, 5.0), 5.0);
        assert_eq!(shrink_scale(3, 3, 5.0), 1.0);
        assert!((shrink_scale(1, 3, 5.0) - 11.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_full_giant_cycle() {
        let mut ctl = controller();
        let interval = seconds_to_ticks(ctl.config().giant.step_interval);
        let hold = seconds_to_ticks(ctl.config().giant.duration);

        assert!(begin_giant_mode(&mut ctl, P1));
        // Grow steps 2 and 3, then the hold step at the peak
        run(&mut ctl, interval * 3);

        let p1 = ctl.player(P1).unwrap();
        assert_eq!(p1.size_scale, 5.0);
        assert_eq!(p1.push_force, 20.0);
        assert_eq!(p1.knockback_multiplier, 0.5);
        assert!(p1.is_giant(ctl.config().push.giant_threshold));

        run(&mut ctl, hold + interval * 2);
        let p1 = ctl.player(P1).unwrap();
        assert_eq!(p1.size_scale, 1.0);
        assert_eq!(p1.push_force, p1.base_push_force());
        assert_eq!(p1.knockback_multiplier, 1.0);
        assert!(!ctl
            .scheduler()
            .is_pending(SequenceKey::for_player(P1, SequenceKind::GiantMode)));
    }

    #[test]
    fn test_out_of_play_player_cannot_grow() {
        let mut ctl = controller();
        ctl.player_fell(P2);
        assert!(!begin_giant_mode(&mut ctl, P2));
    }

    #[test]
    fn test_cancel_restores_baseline() {
        let mut ctl = controller();
        begin_giant_mode(&mut ctl, P1);
        run(&mut ctl, 30);

        cancel_giant_mode(&mut ctl, P1);
        let p1 = ctl.player(P1).unwrap();
        assert_eq!(p1.size_scale, 1.0);
        assert_eq!(p1.push_force, 10.0);
        assert!(ctl.scheduler().is_empty());
    }
}
