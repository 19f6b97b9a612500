//! Respawn and Invulnerability
//!
//! In respawn mode a fallen player leaves the simulation, waits out the
//! respawn delay, then comes back on its spawn point with baseline modifiers
//! and a short invulnerability window. While the window runs the player's
//! renderers flash on the flash interval; visibility is always restored when
//! the window closes.

use tracing::{debug, info};

use crate::core::time::{seconds_to_ticks, Tick};
use crate::game::controller::MatchController;
use crate::game::events::MatchEventData;
use crate::game::giant::cancel_giant_mode;
use crate::game::player::PlayerId;
use crate::game::presentation::{Easing, PresentationRequest};
use crate::game::sequence::{SequenceKey, SequenceKind, SequenceStep};

/// Take a fallen player out and schedule its return.
pub fn begin_respawn(ctl: &mut MatchController, id: PlayerId) {
    ctl.set_active(id, false);
    let delay = ctl.config.respawn.respawn_delay;
    let due = ctl.schedule_in(
        SequenceKey::for_player(id, SequenceKind::Respawn),
        delay,
        SequenceStep::Respawn,
    );
    debug!(player = %id, due, "respawn scheduled");
}

/// Bring a player back at its spawn point.
pub fn complete_respawn(ctl: &mut MatchController, id: PlayerId) {
    if ctl.players.get(&id).map_or(true, |p| p.alive) {
        return;
    }

    cancel_giant_mode(ctl, id);
    let Some(spawn) = ctl.place_at_spawn(id) else {
        return;
    };
    if let Some(agent) = ctl.players.get_mut(&id) {
        agent.alive = true;
        agent.last_attacker = None;
    }
    ctl.set_active(id, true);
    ctl.fx.push(PresentationRequest::AnimateSize {
        player: id,
        target: 1.0,
        duration: 0.0,
        easing: Easing::Linear,
    });
    ctl.fx.push(PresentationRequest::RespawnEffect { position: spawn });

    info!(player = %id, "player respawned");
    ctl.emit(MatchEventData::PlayerRespawned { player: id, position: spawn });

    begin_invulnerability(ctl, id);
}

/// Open an invulnerability window and start the visibility flash.
pub fn begin_invulnerability(ctl: &mut MatchController, id: PlayerId) {
    let window = seconds_to_ticks(ctl.config.respawn.invulnerability_time);
    if window == 0 {
        return;
    }

    let now = ctl.tick;
    let ends_at = now.saturating_add(window);
    let Some(agent) = ctl.players.get_mut(&id) else {
        return;
    };
    agent.invulnerable = true;
    agent.invulnerable_until = Some(ends_at);

    ctl.scheduler.schedule(
        SequenceKey::for_player(id, SequenceKind::Invulnerability),
        ends_at,
        SequenceStep::EndInvulnerability,
    );

    flash_step(ctl, id, ends_at);
}

/// Close the invulnerability window.
pub fn end_invulnerability(ctl: &mut MatchController, id: PlayerId) {
    let Some(agent) = ctl.players.get_mut(&id) else {
        return;
    };
    agent.invulnerable = false;
    agent.invulnerable_until = None;
    debug!(player = %id, "invulnerability ended");
    ctl.emit(MatchEventData::InvulnerabilityEnded { player: id });
}

/// Toggle visibility, or force it back on once the window is over.
pub fn flash_step(ctl: &mut MatchController, id: PlayerId, ends_at: Tick) {
    let Some(visible) = ctl.players.get(&id).map(|p| p.visible) else {
        return;
    };

    let now = ctl.tick;
    if now >= ends_at {
        ctl.set_visible(id, true);
        return;
    }

    ctl.set_visible(id, !visible);

    let interval = seconds_to_ticks(ctl.config.respawn.flash_interval).max(1);
    let next = now.saturating_add(interval).min(ends_at);
    ctl.scheduler.schedule(
        SequenceKey::for_player(id, SequenceKind::Flash),
        next,
        SequenceStep::FlashToggle { ends_at },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EliminationMode, MatchConfig};
    use crate::game::controller::MatchPhase;
    use crate::game::giant::begin_giant_mode;
    use crate::game::knockback::PushRejection;
    use crate::game::registry::{PlayerSpec, Registration};
    use crate::game::tick::tick_with_frames;
    use glam::{Quat, Vec3};
    use std::collections::BTreeMap;

    const P1: PlayerId = PlayerId::new(1);
    const P2: PlayerId = PlayerId::new(2);

    fn controller() -> MatchController {
        let mut config = MatchConfig::default();
        config.powerups.kinds.clear();
        config.rounds.mode = EliminationMode::Respawn;
        let reg = Registration::Explicit(vec![
            PlayerSpec::new("Player1").at(Vec3::new(-2.0, 0.0, 0.0)),
            PlayerSpec::new("Player2").at(Vec3::new(2.0, 0.0, 0.0)),
        ]);
        MatchController::with_arena_physics(config, reg).unwrap()
    }

    fn run(ctl: &mut MatchController, ticks: u32) {
        for _ in 0..ticks {
            tick_with_frames(ctl, &BTreeMap::new());
        }
    }

    #[test]
    fn test_respawn_sequence() {
        let mut ctl = controller();
        ctl.physics_mut().set_transform(P2, Vec3::new(9.0, -8.0, 0.0), Quat::IDENTITY);

        assert!(ctl.player_fell(P2));
        assert_eq!(ctl.state(), MatchPhase::RoundActive);
        let p2 = ctl.player(P2).unwrap();
        assert!(!p2.alive && !p2.active);

        // 2 s respawn delay
        run(&mut ctl, 119);
        assert!(!ctl.player(P2).unwrap().alive);
        run(&mut ctl, 1);

        let p2 = ctl.player(P2).unwrap();
        assert!(p2.alive && p2.active && p2.invulnerable);
        assert_eq!(ctl.physics().position(P2).map(|p| p.x), Some(2.0));

        // Flash: first toggle hides the player immediately
        assert!(!p2.visible);

        // Pushes and falls are ignored during the window
        ctl.physics_mut().set_transform(P1, Vec3::new(1.4, 0.0, 0.0), Quat::IDENTITY);
        assert_eq!(
            ctl.resolve_push(P1, P2, Vec3::ZERO),
            Err(PushRejection::DefenderInvulnerable)
        );
        assert!(!ctl.player_fell(P2));

        // 1 s window
        run(&mut ctl, 60);
        let p2 = ctl.player(P2).unwrap();
        assert!(!p2.invulnerable);
        assert!(p2.visible);
        assert_eq!(p2.invulnerable_until, None);
    }

    #[test]
    fn test_flash_toggles_on_interval() {
        let mut ctl = controller();
        ctl.player_fell(P1);
        run(&mut ctl, 120);
        assert!(!ctl.player(P1).unwrap().visible);

        run(&mut ctl, 6);
        assert!(ctl.player(P1).unwrap().visible);
        run(&mut ctl, 6);
        assert!(!ctl.player(P1).unwrap().visible);
    }

    #[test]
    fn test_respawn_clears_giant_mode() {
        let mut ctl = controller();
        begin_giant_mode(&mut ctl, P1);
        run(&mut ctl, 30);
        assert_eq!(ctl.player(P1).unwrap().size_scale, 5.0);

        ctl.player_fell(P1);
        run(&mut ctl, 120);

        let p1 = ctl.player(P1).unwrap();
        assert!(p1.alive);
        assert_eq!(p1.size_scale, 1.0);
        assert_eq!(p1.push_force, p1.base_push_force());
        assert_eq!(p1.knockback_multiplier, 1.0);
    }

    #[test]
    fn test_respawn_counts_falls_not_rounds() {
        let mut ctl = controller();
        ctl.player_fell(P1);
        run(&mut ctl, 200);
        ctl.player_fell(P1);

        assert_eq!(ctl.player(P1).unwrap().falls, 2);
        assert_eq!(ctl.current_round(), 1);
        assert!(ctl.scores().values().all(|s| *s == 0));
    }
}
