//! Power-ups
//!
//! At most one power-up is on the field at a time. The spawner tries every
//! `delay_between_spawns` seconds; a spawned power-up sits on a random point
//! of the floor rectangle for `lifetime` seconds and is either collected by
//! the first player to touch it or expires. The next attempt is scheduled
//! `delay_between_spawns` after the expiry time.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::controller::{MatchController, MatchPhase};
use crate::game::events::MatchEventData;
use crate::game::giant::begin_giant_mode;
use crate::game::physics::RegionKind;
use crate::game::player::PlayerId;
use crate::game::presentation::PresentationRequest;
use crate::game::sequence::{SequenceKey, SequenceKind, SequenceStep};

/// What a power-up does when collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    /// Timed size-up with boosted push force
    Giant,
}

/// A power-up on the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Powerup {
    /// Unique within the match
    pub id: u32,
    /// Effect
    pub kind: PowerupKind,
    /// World position
    pub position: Vec3,
}

/// Power-up slot plus id allocation.
#[derive(Clone, Debug, Default)]
pub struct PowerupField {
    current: Option<Powerup>,
    next_id: u32,
}

impl PowerupField {
    /// Empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Power-up on the field, if any.
    pub fn current(&self) -> Option<&Powerup> {
        self.current.as_ref()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

const SPAWN_KEY: SequenceKey = SequenceKey::for_arena(SequenceKind::PowerupSpawn);
const EXPIRE_KEY: SequenceKey = SequenceKey::for_arena(SequenceKind::PowerupExpire);

/// Schedule the first spawn attempt. Nothing is scheduled when no kinds are
/// configured.
pub fn start_spawner(ctl: &mut MatchController) {
    if ctl.config.powerups.kinds.is_empty() {
        return;
    }
    let delay = ctl.config.powerups.delay_between_spawns;
    ctl.schedule_in(SPAWN_KEY, delay, SequenceStep::SpawnPowerup);
}

/// Spawn a power-up if the field is empty, then schedule the next attempt.
pub fn spawn_step(ctl: &mut MatchController) {
    let cfg = ctl.config.powerups.clone();

    let Some(&kind) = ctl.rng.choose(&cfg.kinds) else {
        return;
    };

    if ctl.powerups.current.is_some() {
        ctl.schedule_in(SPAWN_KEY, cfg.delay_between_spawns, SequenceStep::SpawnPowerup);
        return;
    }

    let position = ctl.rng.random_point_on_floor(
        cfg.arena_width,
        cfg.arena_length,
        cfg.floor_y + cfg.y_offset,
    );
    let id = ctl.powerups.allocate_id();
    ctl.powerups.current = Some(Powerup { id, kind, position });

    ctl.physics.add_trigger(RegionKind::Powerup(id), position, cfg.pickup_radius);
    ctl.fx.push(PresentationRequest::SpawnPickup { id, position });
    debug!(id, ?kind, ?position, "power-up spawned");
    ctl.emit(MatchEventData::PowerupSpawned { id, kind, position });

    ctl.schedule_in(EXPIRE_KEY, cfg.lifetime, SequenceStep::ExpirePowerup { id });
    ctl.schedule_in(
        SPAWN_KEY,
        cfg.lifetime + cfg.delay_between_spawns,
        SequenceStep::SpawnPowerup,
    );
}

/// Remove an uncollected power-up.
pub fn expire_step(ctl: &mut MatchController, id: u32) {
    if ctl.powerups.current.map(|p| p.id) != Some(id) {
        return;
    }
    remove_current(ctl);
    debug!(id, "power-up expired");
    ctl.emit(MatchEventData::PowerupExpired { id });
}

/// A player touched power-up `id`. The first toucher takes it.
pub fn try_collect(ctl: &mut MatchController, id: u32, player: PlayerId) -> bool {
    let Some(powerup) = ctl.powerups.current.filter(|p| p.id == id) else {
        return false;
    };
    if matches!(ctl.phase, MatchPhase::MatchOver { .. }) {
        return false;
    }
    if !ctl.players.get(&player).is_some_and(|p| p.is_in_play()) {
        return false;
    }

    remove_current(ctl);
    ctl.scheduler.cancel(EXPIRE_KEY);
    info!(id, player = %player, kind = ?powerup.kind, "power-up collected");
    ctl.emit(MatchEventData::PowerupCollected { id, kind: powerup.kind, player });

    match powerup.kind {
        PowerupKind::Giant => {
            begin_giant_mode(ctl, player);
        }
    }
    true
}

/// Remove whatever is on the field without an event and drop the pending
/// expiry.
pub fn clear_field(ctl: &mut MatchController) {
    ctl.scheduler.cancel(EXPIRE_KEY);
    ctl.scheduler.cancel(SPAWN_KEY);
    if ctl.powerups.current.is_some() {
        remove_current(ctl);
    }
}

fn remove_current(ctl: &mut MatchController) {
    if let Some(powerup) = ctl.powerups.current.take() {
        ctl.physics.remove_trigger(RegionKind::Powerup(powerup.id));
        ctl.fx.push(PresentationRequest::DespawnPickup { id: powerup.id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::core::time::seconds_to_ticks;
    use crate::game::registry::{PlayerSpec, Registration};
    use crate::game::tick::tick_with_frames;
    use glam::Quat;
    use std::collections::BTreeMap;

    const P1: PlayerId = PlayerId::new(1);
    const P2: PlayerId = PlayerId::new(2);

    fn controller(seed: u64) -> MatchController {
        let mut config = MatchConfig::default();
        config.rng_seed = seed;
        let reg = Registration::Explicit(vec![
            PlayerSpec::new("Player1").at(Vec3::new(-5.0, 0.0, 0.0)),
            PlayerSpec::new("Player2").at(Vec3::new(5.0, 0.0, 0.0)),
        ]);
        MatchController::with_arena_physics(config, reg).unwrap()
    }

    fn run(ctl: &mut MatchController, ticks: u32) -> Vec<MatchEventData> {
        let mut out = Vec::new();
        for _ in 0..ticks {
            out.extend(tick_with_frames(ctl, &BTreeMap::new()).events.into_iter().map(|e| e.data));
        }
        out
    }

    #[test]
    fn test_spawn_then_expire() {
        let mut ctl = controller(7);
        let delay = seconds_to_ticks(7.0);
        let lifetime = seconds_to_ticks(5.0);

        run(&mut ctl, delay - 1);
        assert!(ctl.active_powerup().is_none());

        let events = run(&mut ctl, 1);
        let spawned = ctl.active_powerup().copied();
        let Some(powerup) = spawned else {
            // A player standing on the spawn point picked it up the same tick
            assert!(events.iter().any(|e| matches!(e, MatchEventData::PowerupCollected { .. })));
            return;
        };
        assert!(powerup.position.x.abs() <= 5.0 && powerup.position.z.abs() <= 5.0);
        assert!((powerup.position.y - 0.01).abs() < 1e-6);

        // Move the players out of reach so nobody collects it
        ctl.physics_mut().set_transform(P1, Vec3::new(-20.0, 0.0, 0.0), Quat::IDENTITY);
        ctl.physics_mut().set_transform(P2, Vec3::new(20.0, 0.0, 0.0), Quat::IDENTITY);
        ctl.set_active(P1, false);
        ctl.set_active(P2, false);

        let events = run(&mut ctl, lifetime);
        assert!(events.contains(&MatchEventData::PowerupExpired { id: powerup.id }));
        assert!(ctl.active_powerup().is_none());

        // Next attempt `delay` after the expiry
        assert_eq!(
            ctl.scheduler().due_tick(SPAWN_KEY),
            Some(delay + lifetime + delay)
        );
    }

    #[test]
    fn test_first_toucher_collects() {
        let mut ctl = controller(3);
        run(&mut ctl, seconds_to_ticks(7.0));
        let Some(powerup) = ctl.active_powerup().copied() else {
            return;
        };

        assert!(try_collect(&mut ctl, powerup.id, P2));
        assert!(!try_collect(&mut ctl, powerup.id, P1));
        assert!(ctl.active_powerup().is_none());
        assert!(!ctl.scheduler().is_pending(EXPIRE_KEY));
        assert!(ctl
            .scheduler()
            .is_pending(SequenceKey::for_player(P2, SequenceKind::GiantMode)));
    }

    #[test]
    fn test_collect_through_physics_trigger() {
        let mut ctl = controller(11);
        run(&mut ctl, seconds_to_ticks(7.0));
        let Some(powerup) = ctl.active_powerup().copied() else {
            return;
        };

        ctl.physics_mut()
            .set_transform(P1, Vec3::new(powerup.position.x, 0.0, powerup.position.z), Quat::IDENTITY);
        let events = run(&mut ctl, 1);

        assert!(events.contains(&MatchEventData::PowerupCollected {
            id: powerup.id,
            kind: PowerupKind::Giant,
            player: P1,
        }));
        assert!(ctl.player(P1).unwrap().size_scale > 1.0);
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let mut a = controller(42);
        let mut b = controller(42);
        run(&mut a, 420);
        run(&mut b, 420);
        assert_eq!(a.active_powerup(), b.active_powerup());
    }

    #[test]
    fn test_no_kinds_no_spawner() {
        let mut config = MatchConfig::default();
        config.powerups.kinds.clear();
        let reg = Registration::Explicit(vec![PlayerSpec::new("Player1"), PlayerSpec::new("Player2")]);
        let mut ctl = MatchController::with_arena_physics(config, reg).unwrap();

        assert!(!ctl.scheduler().is_pending(SPAWN_KEY));
        run(&mut ctl, 1000);
        assert!(ctl.active_powerup().is_none());
    }
}
