//! Match Events
//!
//! Everything observable that happened during a tick, for logs, UI glue and
//! replay comparison. Events sort by tick, then priority, then player.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::game::player::PlayerId;
use crate::game::powerup::PowerupKind;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Eliminations first
    Elimination = 0,
    /// Round and match outcomes
    Outcome = 1,
    /// Knockback
    Push = 2,
    /// Respawn, invulnerability and giant-mode sequence steps
    Sequence = 3,
    /// Power-up field changes
    Powerup = 4,
    /// Lowest priority
    Other = 255,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MatchEventData {
    /// A push landed.
    PushResolved {
        attacker: PlayerId,
        defender: PlayerId,
        magnitude: f32,
        impulse: Vec3,
    },

    /// A player fell out of the round.
    PlayerEliminated {
        victim: PlayerId,
        knocked_out_by: Option<PlayerId>,
        round: u32,
    },

    /// Round decided; `winner == None` is a draw.
    RoundEnded {
        round: u32,
        winner: Option<PlayerId>,
    },

    /// A round began (first round, next round or draw replay).
    RoundStarted { round: u32 },

    /// Someone reached the win threshold.
    MatchOver {
        winner: PlayerId,
        scores: Vec<(PlayerId, u32)>,
    },

    /// Scores and rounds were reset by request.
    MatchRestarted,

    /// A player came back after falling (respawn mode).
    PlayerRespawned { player: PlayerId, position: Vec3 },

    /// A player's invulnerability window closed.
    InvulnerabilityEnded { player: PlayerId },

    /// A player reached giant size.
    GiantModeStarted { player: PlayerId },

    /// A player is back to normal size.
    GiantModeEnded { player: PlayerId },

    /// A power-up appeared.
    PowerupSpawned {
        id: u32,
        kind: PowerupKind,
        position: Vec3,
    },

    /// A player picked up a power-up.
    PowerupCollected {
        id: u32,
        kind: PowerupKind,
        player: PlayerId,
    },

    /// A power-up timed out uncollected.
    PowerupExpired { id: u32 },
}

/// A match event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Tick when event occurred
    pub tick: Tick,

    /// Processing priority
    pub priority: EventPriority,

    /// Player involved (for tie-breaking)
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: MatchEventData,
}

impl MatchEvent {
    /// Create a new event; priority and player are derived from the payload.
    pub fn new(tick: Tick, data: MatchEventData) -> Self {
        use MatchEventData::*;

        let (priority, player_id) = match &data {
            PlayerEliminated { victim, .. } => (EventPriority::Elimination, Some(*victim)),
            RoundEnded { winner, .. } => (EventPriority::Outcome, *winner),
            RoundStarted { .. } | MatchRestarted => (EventPriority::Outcome, None),
            MatchOver { winner, .. } => (EventPriority::Outcome, Some(*winner)),
            PushResolved { attacker, .. } => (EventPriority::Push, Some(*attacker)),
            PlayerRespawned { player, .. }
            | InvulnerabilityEnded { player }
            | GiantModeStarted { player }
            | GiantModeEnded { player } => (EventPriority::Sequence, Some(*player)),
            PowerupCollected { player, .. } => (EventPriority::Powerup, Some(*player)),
            PowerupSpawned { .. } | PowerupExpired { .. } => (EventPriority::Powerup, None),
        };

        Self {
            tick,
            priority,
            player_id,
            data,
        }
    }
}

impl PartialEq for MatchEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.player_id == other.player_id
    }
}

impl Eq for MatchEvent {}

impl PartialOrd for MatchEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatchEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then player_id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.player_id.cmp(&other.player_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let p1 = PlayerId::new(1);
        let p2 = PlayerId::new(2);

        let elim1 = MatchEvent::new(10, MatchEventData::PlayerEliminated {
            victim: p1,
            knocked_out_by: None,
            round: 1,
        });
        let push = MatchEvent::new(10, MatchEventData::PushResolved {
            attacker: p1,
            defender: p2,
            magnitude: 10.0,
            impulse: Vec3::X,
        });
        let elim2 = MatchEvent::new(10, MatchEventData::PlayerEliminated {
            victim: p2,
            knocked_out_by: Some(p1),
            round: 1,
        });
        let later = MatchEvent::new(11, MatchEventData::RoundStarted { round: 2 });

        // Same tick: elimination before push
        assert!(elim1 < push);
        // Same tick and priority: lower player first
        assert!(elim1 < elim2);
        // Tick dominates
        assert!(push < later);
    }

    #[test]
    fn test_draw_has_no_player() {
        let draw = MatchEvent::new(5, MatchEventData::RoundEnded { round: 2, winner: None });
        assert_eq!(draw.priority, EventPriority::Outcome);
        assert_eq!(draw.player_id, None);
    }
}
