//! Timed Sequences
//!
//! Delayed and periodic behaviour (round-end delay, respawn delay,
//! invulnerability flash, giant mode, power-up spawner) is a set of
//! scheduled steps keyed by `(owner, kind)`. A key holds at most one pending
//! step: scheduling again replaces it, and a multi-step sequence advances by
//! rescheduling its own key from the step handler. Cancelling a key (or
//! everything a player owns) is how resets invalidate stale continuations.

use std::collections::BTreeMap;

use tracing::trace;

use crate::core::time::Tick;
use crate::game::giant::GiantPhase;
use crate::game::player::PlayerId;

/// Who a sequence belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SequenceOwner {
    /// Round/match flow
    Match,
    /// Arena props (power-up spawner)
    Arena,
    /// A single player
    Player(PlayerId),
}

/// Which sequence of its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SequenceKind {
    /// Delay between a decided round and the next reset
    RoundReset,
    /// Next power-up spawn attempt
    PowerupSpawn,
    /// Uncollected power-up timing out
    PowerupExpire,
    /// Fallen player waiting to come back
    Respawn,
    /// End of an invulnerability window
    Invulnerability,
    /// Visibility flash loop
    Flash,
    /// Giant-mode grow/hold/shrink
    GiantMode,
}

/// Scheduler key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceKey {
    /// Owner
    pub owner: SequenceOwner,
    /// Kind
    pub kind: SequenceKind,
}

impl SequenceKey {
    /// Key for a match-level sequence.
    pub const fn for_match(kind: SequenceKind) -> Self {
        Self { owner: SequenceOwner::Match, kind }
    }

    /// Key for an arena sequence.
    pub const fn for_arena(kind: SequenceKind) -> Self {
        Self { owner: SequenceOwner::Arena, kind }
    }

    /// Key for a player's sequence.
    pub const fn for_player(player: PlayerId, kind: SequenceKind) -> Self {
        Self { owner: SequenceOwner::Player(player), kind }
    }
}

/// What to do when a scheduled step comes due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SequenceStep {
    /// Reset all players and start the next round.
    RoundReset,
    /// Try to spawn a power-up.
    SpawnPowerup,
    /// Remove an uncollected power-up.
    ExpirePowerup {
        /// Power-up id
        id: u32,
    },
    /// Bring a fallen player back.
    Respawn,
    /// Clear invulnerability.
    EndInvulnerability,
    /// Toggle visibility, or force visible once `ends_at` is reached.
    FlashToggle {
        /// End of the flash window
        ends_at: Tick,
    },
    /// Advance giant mode.
    Giant(GiantPhase),
}

#[derive(Clone, Debug)]
struct Scheduled {
    due: Tick,
    step: SequenceStep,
}

/// Pending steps keyed by `(owner, kind)`.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    entries: BTreeMap<SequenceKey, Scheduled>,
}

impl Scheduler {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `step` at `due`, replacing whatever the key had pending.
    ///
    /// Returns the replaced step, if any.
    pub fn schedule(&mut self, key: SequenceKey, due: Tick, step: SequenceStep) -> Option<SequenceStep> {
        trace!(?key, due, ?step, "schedule");
        self.entries
            .insert(key, Scheduled { due, step })
            .map(|old| old.step)
    }

    /// Drop a pending step. Returns whether one was pending.
    pub fn cancel(&mut self, key: SequenceKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Drop everything an owner has pending. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: SequenceOwner) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.owner != owner);
        before - self.entries.len()
    }

    /// Drop everything.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Is a step pending for this key?
    pub fn is_pending(&self, key: SequenceKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// When the key's pending step is due.
    pub fn due_tick(&self, key: SequenceKey) -> Option<Tick> {
        self.entries.get(&key).map(|s| s.due)
    }

    /// The key's pending step.
    pub fn pending_step(&self, key: SequenceKey) -> Option<SequenceStep> {
        self.entries.get(&key).map(|s| s.step)
    }

    /// Number of pending steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing pending?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the earliest step due at or before `now`.
    ///
    /// Ties break by key order. Taking one step at a time lets a handler
    /// cancel or reschedule other keys before they are looked at.
    pub fn pop_due(&mut self, now: Tick) -> Option<(SequenceKey, SequenceStep)> {
        let key = self
            .entries
            .iter()
            .filter(|(_, s)| s.due <= now)
            .min_by_key(|(key, s)| (s.due, **key))
            .map(|(key, _)| *key)?;

        self.entries.remove(&key).map(|s| (key, s.step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> PlayerId {
        PlayerId::new(n)
    }

    #[test]
    fn test_one_step_per_key() {
        let mut sched = Scheduler::new();
        let key = SequenceKey::for_player(p(1), SequenceKind::Respawn);

        assert!(sched.schedule(key, 10, SequenceStep::Respawn).is_none());
        assert_eq!(sched.schedule(key, 20, SequenceStep::Respawn), Some(SequenceStep::Respawn));
        assert_eq!(sched.len(), 1);
        assert_eq!(sched.due_tick(key), Some(20));
    }

    #[test]
    fn test_pop_due_order() {
        let mut sched = Scheduler::new();
        let k1 = SequenceKey::for_player(p(2), SequenceKind::Flash);
        let k2 = SequenceKey::for_player(p(1), SequenceKind::Flash);
        let k3 = SequenceKey::for_match(SequenceKind::RoundReset);

        sched.schedule(k1, 5, SequenceStep::FlashToggle { ends_at: 60 });
        sched.schedule(k2, 5, SequenceStep::FlashToggle { ends_at: 60 });
        sched.schedule(k3, 3, SequenceStep::RoundReset);

        assert!(sched.pop_due(2).is_none());
        assert_eq!(sched.pop_due(10).map(|(k, _)| k), Some(k3));
        // Same due tick: key order (player 1 before player 2)
        assert_eq!(sched.pop_due(10).map(|(k, _)| k), Some(k2));
        assert_eq!(sched.pop_due(10).map(|(k, _)| k), Some(k1));
        assert!(sched.is_empty());
    }

    #[test]
    fn test_cancel_owner() {
        let mut sched = Scheduler::new();
        sched.schedule(SequenceKey::for_player(p(1), SequenceKind::Respawn), 5, SequenceStep::Respawn);
        sched.schedule(
            SequenceKey::for_player(p(1), SequenceKind::GiantMode),
            5,
            SequenceStep::Giant(GiantPhase::Hold),
        );
        sched.schedule(SequenceKey::for_player(p(2), SequenceKind::Respawn), 5, SequenceStep::Respawn);

        assert_eq!(sched.cancel_owner(SequenceOwner::Player(p(1))), 2);
        assert_eq!(sched.len(), 1);
        assert!(sched.is_pending(SequenceKey::for_player(p(2), SequenceKind::Respawn)));

        assert!(sched.cancel(SequenceKey::for_player(p(2), SequenceKind::Respawn)));
        assert!(!sched.cancel(SequenceKey::for_player(p(2), SequenceKind::Respawn)));
    }

    #[test]
    fn test_cancelled_step_never_fires() {
        let mut sched = Scheduler::new();
        let key = SequenceKey::for_player(p(1), SequenceKind::GiantMode);
        sched.schedule(key, 5, SequenceStep::Giant(GiantPhase::Shrink { step: 1 }));
        sched.cancel_all();
        assert!(sched.pop_due(1000).is_none());
    }
}
