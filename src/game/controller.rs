//! Match Controller
//!
//! Owns the round/match state machine and every player agent. It is the
//! only place elimination, scoring and resets happen:
//!
//! ```text
//! RoundActive ──(alive ≤ 1)──► RoundEnding ──(winner reaches threshold)──► MatchOver
//!      ▲                           │
//!      └──(round-end delay, reset)─┘          request_match_restart() from anywhere
//! ```
//!
//! Delayed work (round-end delay, respawns, flashing, giant mode, power-up
//! spawning) is scheduled on a keyed `Scheduler` and fired from the tick
//! loop, so a reset simply cancels whatever is pending.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use tracing::{debug, info, trace, warn};

use crate::config::{EliminationMode, MatchConfig};
use crate::core::rng::DeterministicRng;
use crate::core::time::{seconds_to_ticks, Tick};
use crate::game::events::{MatchEvent, MatchEventData};
use crate::game::giant::advance_giant;
use crate::game::input::{InputFrame, RawInput};
use crate::game::knockback::{apply_knockback, evaluate_push, Knockback, PushRejection};
use crate::game::physics::{ArenaPhysics, PhysicsBackend};
use crate::game::player::{PlayerAgent, PlayerId, Pushable};
use crate::game::powerup::{self, PowerupField};
use crate::game::presentation::{Easing, PresentationQueue, PresentationRequest, TextSlot};
use crate::game::registry::{self, MatchError, Registration};
use crate::game::respawn;
use crate::game::sequence::{SequenceKey, SequenceKind, SequenceOwner, SequenceStep, Scheduler};

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Round/match state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// Players are fighting; eliminations count.
    RoundActive,
    /// Round decided, waiting out the round-end delay.
    RoundEnding {
        /// Round winner, `None` for a draw
        winner: Option<PlayerId>,
    },
    /// Someone reached the win threshold. Only a restart leaves this state.
    MatchOver {
        /// Match winner
        winner: PlayerId,
    },
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Authoritative match state plus its collaborators.
pub struct MatchController {
    pub(crate) config: MatchConfig,
    pub(crate) tick: Tick,
    pub(crate) phase: MatchPhase,
    pub(crate) current_round: u32,
    pub(crate) scores: BTreeMap<PlayerId, u32>,
    pub(crate) players: BTreeMap<PlayerId, PlayerAgent>,
    pub(crate) scheduler: Scheduler,
    pub(crate) physics: Box<dyn PhysicsBackend>,
    pub(crate) powerups: PowerupField,
    pub(crate) rng: DeterministicRng,
    pub(crate) fx: PresentationQueue,
    pub(crate) pending_events: Vec<MatchEvent>,
}

impl MatchController {
    /// Register players, place their bodies and start round 1.
    pub fn new(
        config: MatchConfig,
        registration: Registration,
        mut physics: Box<dyn PhysicsBackend>,
    ) -> Result<Self, MatchError> {
        config.validate()?;
        let roster = registry::resolve(registration, &config.spawn_points)?;

        let mut players = BTreeMap::new();
        let mut scores = BTreeMap::new();
        for entry in roster {
            physics.insert_body(entry.id, entry.spawn);
            let agent = PlayerAgent::new(
                entry.id,
                entry.label,
                entry.spawn,
                config.push.base_push_force,
                entry.input,
            );
            debug!(player = %entry.id, label = %agent.label, spawn = ?entry.spawn, "registered player");
            players.insert(entry.id, agent);
            scores.insert(entry.id, 0);
        }

        let mut ctl = Self {
            rng: DeterministicRng::new(config.rng_seed),
            config,
            tick: 0,
            phase: MatchPhase::RoundActive,
            current_round: 1,
            scores,
            players,
            scheduler: Scheduler::new(),
            physics,
            powerups: PowerupField::new(),
            fx: PresentationQueue::new(),
            pending_events: Vec::new(),
        };

        info!(
            players = ctl.players.len(),
            max_rounds = ctl.config.rounds.max_rounds,
            mode = ?ctl.config.rounds.mode,
            "match created"
        );
        ctl.reset_round();
        ctl.announce_round();
        ctl.update_score_text();
        Ok(ctl)
    }

    /// Same as `new`, on the built-in arena solver.
    pub fn with_arena_physics(config: MatchConfig, registration: Registration) -> Result<Self, MatchError> {
        let physics = Box::new(ArenaPhysics::new(config.arena.clone()));
        Self::new(config, registration, physics)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Ticks simulated so far.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Round/match state.
    pub fn state(&self) -> MatchPhase {
        self.phase
    }

    /// Current round number (1-based).
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Round wins per player.
    pub fn scores(&self) -> &BTreeMap<PlayerId, u32> {
        &self.scores
    }

    /// One player's round wins.
    pub fn score(&self, id: PlayerId) -> u32 {
        self.scores.get(&id).copied().unwrap_or(0)
    }

    /// Wins needed to take the match.
    pub fn win_threshold(&self) -> u32 {
        self.config.rounds.win_threshold()
    }

    /// Players still alive this round.
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Is a round being played right now?
    pub fn is_round_in_progress(&self) -> bool {
        self.phase == MatchPhase::RoundActive
    }

    /// Match winner, once decided.
    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            MatchPhase::MatchOver { winner } => Some(winner),
            _ => None,
        }
    }

    /// All players, in id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerAgent> {
        self.players.values()
    }

    /// One player.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerAgent> {
        self.players.get(&id)
    }

    /// The physics collaborator.
    pub fn physics(&self) -> &dyn PhysicsBackend {
        self.physics.as_ref()
    }

    /// The physics collaborator, for hosts that place bodies themselves.
    pub fn physics_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.physics.as_mut()
    }

    /// Active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Pending timed sequences.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Power-up currently on the field.
    pub fn active_powerup(&self) -> Option<&powerup::Powerup> {
        self.powerups.current()
    }

    /// Presentation requests queued since the last drain.
    pub fn pending_presentation(&self) -> &[PresentationRequest] {
        self.fx.pending()
    }

    // =========================================================================
    // CONTROL SURFACE
    // =========================================================================

    /// A player reached the death zone.
    ///
    /// Ignored (returns false) unless a round is being played, the player is
    /// alive and it is not invulnerable. In rounds mode the player is out
    /// until the next reset and the round may end; in respawn mode it comes
    /// back after the respawn delay.
    pub fn player_fell(&mut self, id: PlayerId) -> bool {
        self.players_fell(&[id]) == 1
    }

    /// Several players reached the death zone during the same step.
    ///
    /// All of them are eliminated before the round outcome is evaluated, so
    /// the last players falling together make a draw. Returns how many falls
    /// counted.
    pub fn players_fell(&mut self, ids: &[PlayerId]) -> usize {
        let eliminated = ids.iter().filter(|id| self.eliminate(**id)).count();
        if eliminated > 0 && self.config.rounds.mode == EliminationMode::Rounds {
            self.evaluate_round_end();
        }
        eliminated
    }

    fn eliminate(&mut self, id: PlayerId) -> bool {
        if self.phase != MatchPhase::RoundActive {
            trace!(player = %id, phase = ?self.phase, "fall ignored outside active round");
            return false;
        }

        let now = self.tick;
        let round = self.current_round;
        let Some(agent) = self.players.get_mut(&id) else {
            warn!(player = %id, "fall reported for unknown player");
            return false;
        };
        if !agent.alive {
            return false;
        }
        if agent.invulnerable || agent.declares_invulnerable(now) {
            trace!(player = %id, "fall ignored while invulnerable");
            return false;
        }

        agent.alive = false;
        agent.falls += 1;
        let knocked_out_by = agent.last_attacker.take();

        if let Some(killer) = knocked_out_by.and_then(|k| self.players.get_mut(&k)) {
            killer.knockouts += 1;
        }

        info!(round, player = %id, by = ?knocked_out_by, "player eliminated");
        self.emit(MatchEventData::PlayerEliminated {
            victim: id,
            knocked_out_by,
            round,
        });

        match self.config.rounds.mode {
            EliminationMode::Rounds => self.deactivate(id),
            EliminationMode::Respawn => respawn::begin_respawn(self, id),
        }
        true
    }

    /// Zero all scores and start over from round 1. Allowed from any state;
    /// every pending sequence is cancelled.
    pub fn request_match_restart(&mut self) {
        info!(round = self.current_round, phase = ?self.phase, "match restart requested");

        self.scheduler.cancel_all();
        for score in self.scores.values_mut() {
            *score = 0;
        }
        for agent in self.players.values_mut() {
            agent.knockouts = 0;
            agent.falls = 0;
        }
        self.current_round = 1;
        self.phase = MatchPhase::RoundActive;

        self.emit(MatchEventData::MatchRestarted);
        self.reset_round();
        self.announce_round();
        self.update_score_text();
        self.fx.text(TextSlot::Banner, "");
    }

    /// Resolve `attacker` pushing `defender` at a contact point.
    ///
    /// On success the defender's velocity is replaced by the impulse, the
    /// attacker's cooldown starts and the defender remembers who hit it.
    pub fn resolve_push(
        &mut self,
        attacker: PlayerId,
        defender: PlayerId,
        contact_point: Vec3,
    ) -> Result<Knockback, PushRejection> {
        let now = self.tick;
        let (Some(a), Some(d)) = (self.players.get(&attacker), self.players.get(&defender)) else {
            return Err(PushRejection::OutOfPlay);
        };
        let (Some(pa), Some(pd)) = (self.physics.position(attacker), self.physics.position(defender)) else {
            return Err(PushRejection::OutOfPlay);
        };

        let knockback = evaluate_push(a, d, pa, pd, now, &self.config.push).inspect_err(|reason| {
            trace!(%attacker, %defender, %reason, "push rejected");
        })?;

        apply_knockback(self.physics.as_mut(), &knockback);
        if let Some(a) = self.players.get_mut(&attacker) {
            a.last_push_tick = Some(now);
        }
        if let Some(d) = self.players.get_mut(&defender) {
            d.last_attacker = Some(attacker);
        }

        self.fx.push(PresentationRequest::Shockwave { position: contact_point });
        self.fx.push(PresentationRequest::CameraShake {
            intensity: self.config.push.camera_shake_intensity,
        });

        debug!(%attacker, %defender, magnitude = knockback.magnitude, "push resolved");
        self.emit(MatchEventData::PushResolved {
            attacker,
            defender,
            magnitude: knockback.magnitude,
            impulse: knockback.impulse,
        });
        Ok(knockback)
    }

    /// Resolve a contact both ways (`a` pushing `b`, then `b` pushing `a`).
    pub fn handle_contact(&mut self, a: PlayerId, b: PlayerId, point: Vec3) {
        let _ = self.resolve_push(a, b, point);
        let _ = self.resolve_push(b, a, point);
    }

    /// Sample every in-play player's input source.
    pub fn sample_inputs(&self, raw: &RawInput) -> BTreeMap<PlayerId, InputFrame> {
        self.players
            .values()
            .filter(|p| p.is_in_play())
            .map(|p| (p.id, p.input.sample(raw)))
            .collect()
    }

    /// Take the events emitted since the last call, sorted.
    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        events.sort();
        events
    }

    /// Take the presentation requests queued since the last call.
    pub fn take_presentation(&mut self) -> Vec<PresentationRequest> {
        self.fx.take()
    }

    // =========================================================================
    // TICK INTERNALS
    // =========================================================================

    pub(crate) fn advance_clock(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Fire every scheduled step due at the current tick.
    pub(crate) fn run_due_sequences(&mut self) {
        while let Some((key, step)) = self.scheduler.pop_due(self.tick) {
            trace!(tick = self.tick, ?key, ?step, "sequence step");
            self.run_step(key, step);
        }
    }

    fn run_step(&mut self, key: SequenceKey, step: SequenceStep) {
        match (key.owner, step) {
            (_, SequenceStep::RoundReset) => self.start_next_round(),
            (_, SequenceStep::SpawnPowerup) => powerup::spawn_step(self),
            (_, SequenceStep::ExpirePowerup { id }) => powerup::expire_step(self, id),
            (SequenceOwner::Player(id), SequenceStep::Respawn) => respawn::complete_respawn(self, id),
            (SequenceOwner::Player(id), SequenceStep::EndInvulnerability) => {
                respawn::end_invulnerability(self, id)
            }
            (SequenceOwner::Player(id), SequenceStep::FlashToggle { ends_at }) => {
                respawn::flash_step(self, id, ends_at)
            }
            (SequenceOwner::Player(id), SequenceStep::Giant(phase)) => advance_giant(self, id, phase),
            (owner, step) => warn!(?owner, ?step, "sequence step with mismatched owner dropped"),
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    pub(crate) fn emit(&mut self, data: MatchEventData) {
        self.pending_events.push(MatchEvent::new(self.tick, data));
    }

    /// Schedule a step `delay` seconds from now, at the earliest next tick.
    pub(crate) fn schedule_in(&mut self, key: SequenceKey, delay: f32, step: SequenceStep) -> Tick {
        let due = self.tick.saturating_add(seconds_to_ticks(delay).max(1));
        self.scheduler.schedule(key, due, step);
        due
    }

    pub(crate) fn set_visible(&mut self, id: PlayerId, visible: bool) {
        if let Some(agent) = self.players.get_mut(&id) {
            agent.visible = visible;
        }
        self.fx.push(PresentationRequest::SetVisible { player: id, visible });
    }

    pub(crate) fn set_active(&mut self, id: PlayerId, active: bool) {
        if let Some(agent) = self.players.get_mut(&id) {
            agent.active = active;
        }
        self.physics.set_active(id, active);
        self.fx.push(PresentationRequest::SetActive { player: id, active });
    }

    fn deactivate(&mut self, id: PlayerId) {
        self.set_active(id, false);
    }

    /// Set a player's size everywhere (agent, collision shape, renderer).
    pub(crate) fn set_size(&mut self, id: PlayerId, scale: f32, duration: f32, easing: Easing) {
        if let Some(agent) = self.players.get_mut(&id) {
            agent.size_scale = scale;
        }
        self.physics.set_scale(id, scale);
        self.fx.push(PresentationRequest::AnimateSize {
            player: id,
            target: scale,
            duration,
            easing,
        });
    }

    /// Put a player back on its spawn point at rest.
    pub(crate) fn place_at_spawn(&mut self, id: PlayerId) -> Option<Vec3> {
        let spawn = self.players.get(&id)?.spawn_position();
        self.physics.set_transform(id, spawn, Quat::IDENTITY);
        self.physics.zero_velocity(id);
        Some(spawn)
    }

    // =========================================================================
    // ROUND FLOW
    // =========================================================================

    fn evaluate_round_end(&mut self) {
        if self.phase != MatchPhase::RoundActive {
            return;
        }

        let alive: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect();

        match alive.as_slice() {
            [] => self.end_round(None),
            [winner] => self.end_round(Some(*winner)),
            _ => {}
        }
    }

    /// Score a decided round, then either finish the match or schedule the
    /// reset. A decisive round moves the round counter on immediately; a
    /// draw replays the same round.
    fn end_round(&mut self, winner: Option<PlayerId>) {
        let round = self.current_round;
        self.phase = MatchPhase::RoundEnding { winner };
        info!(round, winner = ?winner, "round ended");
        self.emit(MatchEventData::RoundEnded { round, winner });

        let Some(winner) = winner else {
            self.fx.text(TextSlot::Banner, "Draw!");
            self.schedule_in(
                SequenceKey::for_match(SequenceKind::RoundReset),
                self.config.rounds.round_end_delay,
                SequenceStep::RoundReset,
            );
            return;
        };

        let score = self.scores.entry(winner).or_insert(0);
        *score += 1;
        let score = *score;
        self.current_round += 1;
        self.update_score_text();

        if score >= self.win_threshold() {
            self.finish_match(winner);
            return;
        }

        self.fx.text(
            TextSlot::Banner,
            format!("Player {} wins round {round}!", winner.number()),
        );
        self.schedule_in(
            SequenceKey::for_match(SequenceKind::RoundReset),
            self.config.rounds.round_end_delay,
            SequenceStep::RoundReset,
        );
    }

    fn finish_match(&mut self, winner: PlayerId) {
        self.phase = MatchPhase::MatchOver { winner };

        // The field freezes; only a restart brings it back.
        self.scheduler.cancel_owner(SequenceOwner::Arena);
        powerup::clear_field(self);

        let scores: Vec<(PlayerId, u32)> = self.scores.iter().map(|(id, s)| (*id, *s)).collect();
        info!(winner = %winner, ?scores, "match over");
        self.fx.text(
            TextSlot::Banner,
            format!("Player {} wins the match!", winner.number()),
        );
        self.emit(MatchEventData::MatchOver { winner, scores });
    }

    fn start_next_round(&mut self) {
        if !matches!(self.phase, MatchPhase::RoundEnding { .. }) {
            debug!(phase = ?self.phase, "stale round reset ignored");
            return;
        }
        self.phase = MatchPhase::RoundActive;
        self.reset_round();
        self.announce_round();
        self.fx.text(TextSlot::Banner, "");
    }

    /// Put every player back on its spawn point with baseline state and
    /// restart the power-up field.
    fn reset_round(&mut self) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            self.scheduler.cancel_owner(SequenceOwner::Player(id));
            if let Some(agent) = self.players.get_mut(&id) {
                agent.reset_for_round();
            }
            self.place_at_spawn(id);
            self.physics.set_active(id, true);
            self.physics.set_scale(id, 1.0);
            self.fx.push(PresentationRequest::SetActive { player: id, active: true });
            self.fx.push(PresentationRequest::SetVisible { player: id, visible: true });
            self.fx.push(PresentationRequest::AnimateSize {
                player: id,
                target: 1.0,
                duration: 0.0,
                easing: Easing::Linear,
            });
        }

        powerup::clear_field(self);
        powerup::start_spawner(self);
        debug!(round = self.current_round, "round reset");
    }

    fn announce_round(&mut self) {
        let round = self.current_round;
        self.fx.text(TextSlot::Round, format!("Round {round}"));
        self.emit(MatchEventData::RoundStarted { round });
    }

    fn update_score_text(&mut self) {
        let line = self
            .scores
            .iter()
            .map(|(id, score)| format!("P{}: {score}", id.number()))
            .collect::<Vec<_>>()
            .join("  ");
        self.fx.text(TextSlot::Score, line);
    }
}

// =============================================================================
// TESTS
// =============================================================================
