//! Match Tick
//!
//! One fixed step of the match, in this order:
//!
//! 1. advance the clock
//! 2. fire scheduled sequence steps that are due
//! 3. apply player movement and ice friction
//! 4. step the physics collaborator
//! 5. route its notifications: contacts to knockback, the death zone to
//!    elimination, pickup triggers to power-up collection
//! 6. drain events and presentation requests
//!
//! Everything iterates in player-id order so a replay with the same inputs
//! and seed produces the same events.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::core::math::flat_direction;
use crate::core::time::TICK_DT;
use crate::game::controller::{MatchController, MatchPhase};
use crate::game::events::{MatchEvent, MatchEventData};
use crate::game::input::{InputFrame, RawInput};
use crate::game::physics::{PhysicsNotification, RegionKind};
use crate::game::player::PlayerId;
use crate::game::powerup::try_collect;
use crate::game::presentation::PresentationRequest;

/// Input magnitude below which a player keeps its facing.
const TURN_THRESHOLD: f32 = 0.1;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, sorted
    pub events: Vec<MatchEvent>,
    /// Requests for the presentation layer
    pub presentation: Vec<PresentationRequest>,
    /// A round was decided this tick
    pub round_ended: bool,
    /// The match ended this tick
    pub match_ended: bool,
    /// Match winner, once there is one
    pub winner: Option<PlayerId>,
}

/// Run one tick, reading each player's input source from a device snapshot.
pub fn tick(ctl: &mut MatchController, raw: &RawInput) -> TickResult {
    let frames = ctl.sample_inputs(raw);
    tick_with_frames(ctl, &frames)
}

/// Run one tick with already-sampled inputs (BTreeMap for deterministic
/// order). Players missing from `inputs` stand still.
pub fn tick_with_frames(ctl: &mut MatchController, inputs: &BTreeMap<PlayerId, InputFrame>) -> TickResult {
    ctl.advance_clock();
    ctl.run_due_sequences();

    apply_movement(ctl, inputs);
    apply_friction(ctl);

    let notifications = ctl.physics.step(TICK_DT);
    route_notifications(ctl, notifications);

    let events = ctl.take_events();
    let round_ended = events
        .iter()
        .any(|e| matches!(e.data, MatchEventData::RoundEnded { .. }));
    let match_ended = events
        .iter()
        .any(|e| matches!(e.data, MatchEventData::MatchOver { .. }));

    TickResult {
        events,
        presentation: ctl.take_presentation(),
        round_ended,
        match_ended,
        winner: ctl.winner(),
    }
}

/// Push in-play players along their input and turn them toward it. Input is
/// ignored outside an active round.
fn apply_movement(ctl: &mut MatchController, inputs: &BTreeMap<PlayerId, InputFrame>) {
    if ctl.phase != MatchPhase::RoundActive {
        return;
    }

    let movement = ctl.config.movement.clone();
    let turn = (movement.rotation_speed * TICK_DT).clamp(0.0, 1.0);

    for (id, frame) in inputs {
        if !ctl.players.get(id).is_some_and(|p| p.is_in_play()) {
            continue;
        }

        let input = frame.move_direction();
        if input.length() < TURN_THRESHOLD {
            continue;
        }
        let direction = flat_direction(input).normalize_or_zero();

        let speed = ctl.physics.velocity(*id).map_or(0.0, |v| v.length());
        if speed < movement.max_speed {
            ctl.physics.add_force(*id, direction * movement.move_force);
        }

        if let Some(current) = ctl.physics.orientation(*id) {
            let target = Quat::from_rotation_arc(Vec3::Z, direction);
            ctl.physics.set_orientation(*id, current.slerp(target, turn));
        }
    }
}

/// Ice friction on the horizontal velocity of every active body.
fn apply_friction(ctl: &mut MatchController) {
    let friction = ctl.config.movement.friction;
    let active: Vec<PlayerId> = ctl
        .players
        .values()
        .filter(|p| p.active)
        .map(|p| p.id)
        .collect();

    for id in active {
        if let Some(v) = ctl.physics.velocity(id) {
            ctl.physics
                .set_velocity(id, Vec3::new(v.x * friction, v.y, v.z * friction));
        }
    }
}

fn route_notifications(ctl: &mut MatchController, notifications: Vec<PhysicsNotification>) {
    let mut fallen = Vec::new();

    for note in notifications {
        match note {
            PhysicsNotification::Contact { a, b, point } => ctl.handle_contact(a, b, point),
            PhysicsNotification::RegionEntered { body, region: RegionKind::DeathZone } => {
                fallen.push(body);
            }
            PhysicsNotification::RegionEntered { body, region: RegionKind::Powerup(id) } => {
                try_collect(ctl, id, body);
            }
        }
    }

    if !fallen.is_empty() {
        ctl.players_fell(&fallen);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::game::input::Key;
    use crate::game::registry::{DiscoveredObject, PlayerSpec, Registration};

    const P1: PlayerId = PlayerId::new(1);
    const P2: PlayerId = PlayerId::new(2);

    fn config() -> MatchConfig {
        let mut config = MatchConfig::default();
        config.powerups.kinds.clear();
        config
    }

    fn controller() -> MatchController {
        let reg = Registration::Explicit(vec![
            PlayerSpec::new("Player1").at(Vec3::new(-2.0, 0.0, 0.0)),
            PlayerSpec::new("Player2").at(Vec3::new(2.0, 0.0, 0.0)),
        ]);
        MatchController::with_arena_physics(config(), reg).unwrap()
    }

    #[test]
    fn test_keyboard_moves_player() {
        let mut ctl = controller();
        let mut raw = RawInput::new();
        raw.press(Key::D);

        for _ in 0..30 {
            tick(&mut ctl, &raw);
        }

        let p1 = ctl.physics().position(P1).unwrap();
        assert!(p1.x > -2.0);
        // Player 2 is bound to the arrows and stays put
        assert_eq!(ctl.physics().position(P2).unwrap().x, 2.0);
        // Turned toward +X
        let facing = ctl.physics().orientation(P1).unwrap() * Vec3::Z;
        assert!(facing.x > 0.5);
    }

    #[test]
    fn test_speed_capped() {
        let mut ctl = controller();
        let mut inputs = BTreeMap::new();
        inputs.insert(P1, InputFrame::from_vec2(glam::Vec2::new(0.0, 1.0)));

        let mut max_speed: f32 = 0.0;
        for _ in 0..120 {
            tick_with_frames(&mut ctl, &inputs);
            let v = ctl.physics().velocity(P1).unwrap();
            max_speed = max_speed.max(Vec3::new(v.x, 0.0, v.z).length());
        }
        let limit = ctl.config().movement.max_speed;
        assert!(max_speed < limit + ctl.config().movement.move_force * TICK_DT + 1e-3);
    }

    #[test]
    fn test_friction_slows_sliding_player() {
        let mut ctl = controller();
        ctl.physics_mut().set_velocity(P1, Vec3::new(0.0, 0.0, 3.0));

        tick_with_frames(&mut ctl, &BTreeMap::new());
        let v = ctl.physics().velocity(P1).unwrap();
        assert!((v.z - 3.0 * 0.98).abs() < 1e-5);
    }

    #[test]
    fn test_push_off_the_edge_wins_round() {
        let mut ctl = controller();
        // Player 1 charges into player 2
        let mut inputs = BTreeMap::new();
        inputs.insert(P1, InputFrame::from_vec2(glam::Vec2::new(1.0, 0.0)));

        let mut winner = None;
        let mut pushes = 0;
        for _ in 0..600 {
            let result = tick_with_frames(&mut ctl, &inputs);
            pushes += result
                .events
                .iter()
                .filter(|e| matches!(e.data, MatchEventData::PushResolved { attacker: P1, .. }))
                .count();
            if result.round_ended {
                winner = result.events.iter().find_map(|e| match e.data {
                    MatchEventData::RoundEnded { winner, .. } => winner,
                    _ => None,
                });
                break;
            }
        }

        assert!(pushes >= 1);
        assert_eq!(winner, Some(P1));
        assert_eq!(ctl.score(P1), 1);
        assert_eq!(
            ctl.player(P2).unwrap().falls,
            1
        );
    }

    #[test]
    fn test_no_movement_outside_active_round() {
        let mut ctl = controller();
        ctl.player_fell(P2);

        let mut inputs = BTreeMap::new();
        inputs.insert(P1, InputFrame::from_vec2(glam::Vec2::new(1.0, 0.0)));
        tick_with_frames(&mut ctl, &inputs);

        assert_eq!(ctl.physics().position(P1), Some(Vec3::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_tagged_match_is_deterministic() {
        fn run() -> Vec<MatchEvent> {
            let mut config = MatchConfig::default();
            config.rng_seed = 99;
            let reg = Registration::Tagged(vec![
                DiscoveredObject::player("Player2", Vec3::new(2.0, 0.0, 0.0)),
                DiscoveredObject::player("Player1", Vec3::new(-2.0, 0.0, 0.0)),
            ]);
            let mut ctl = MatchController::with_arena_physics(config, reg).unwrap();
            let mut raw = RawInput::new();
            raw.press(Key::D).press(Key::Left);

            let mut events = Vec::new();
            for _ in 0..900 {
                events.extend(tick(&mut ctl, &raw).events);
            }
            events
        }

        let (a, b) = (run(), run());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.data, y.data);
        }
    }
}
