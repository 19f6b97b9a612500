//! Player Registration
//!
//! Turns whatever the host hands over (an explicit list, or every scene
//! object it found) into numbered players with spawn points.
//!
//! Player numbers come from the label: the longest run of digits wins
//! ("Player12" → 12, "P1_Red_007" → 7). Labels without digits, a zero or a
//! number that is already taken fall back to the next free number in
//! discovery order. Spawn point `i` goes to the `i`-th entry of an explicit
//! list, or to the `i`-th tagged player by number; when there are fewer
//! spawn points than players the registered position is used.

use std::collections::BTreeSet;

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::game::input::InputSource;
use crate::game::player::PlayerId;

/// Tag that marks scene objects as players.
pub const PLAYER_TAG: &str = "Player";

/// A match needs at least this many players.
pub const MIN_PLAYERS: usize = 2;

/// Errors when setting up a match.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Fewer than two players registered.
    #[error("a match needs at least 2 players, found {found}")]
    NotEnoughPlayers {
        /// Players found
        found: usize,
    },

    /// Configuration failed validation.
    #[error("invalid match config: {0}")]
    Config(#[from] ConfigError),
}

/// One explicitly listed player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSpec {
    /// Label; its digits pick the player number
    pub label: String,
    /// Where the body starts if no spawn point is configured for it
    pub position: Option<Vec3>,
    /// Input binding; defaults by player number
    pub input: Option<InputSource>,
}

impl PlayerSpec {
    /// Player with only a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            position: None,
            input: None,
        }
    }

    /// Set the starting position.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the input binding.
    pub fn with_input(mut self, input: InputSource) -> Self {
        self.input = Some(input);
        self
    }
}

/// A scene object found by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredObject {
    /// Object tag; only `PLAYER_TAG` objects become players
    pub tag: String,
    /// Object name
    pub label: String,
    /// Current world position
    pub position: Vec3,
}

impl DiscoveredObject {
    /// Object tagged as a player.
    pub fn player(label: impl Into<String>, position: Vec3) -> Self {
        Self {
            tag: PLAYER_TAG.to_string(),
            label: label.into(),
            position,
        }
    }
}

/// How players are supplied.
#[derive(Clone, Debug)]
pub enum Registration {
    /// Listed by the host
    Explicit(Vec<PlayerSpec>),
    /// Discovered in the scene by tag
    Tagged(Vec<DiscoveredObject>),
}

/// A numbered player ready to be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredPlayer {
    /// Player number
    pub id: PlayerId,
    /// Original label
    pub label: String,
    /// Spawn point for the whole match
    pub spawn: Vec3,
    /// Input binding
    pub input: InputSource,
}

/// Player number from a label: the longest run of ASCII digits, first one on
/// a tie. `None` if there are no digits or the number overflows.
pub fn parse_player_number(label: &str) -> Option<u32> {
    let mut best: Option<&str> = None;
    let mut start = None;

    for (i, c) in label.char_indices().chain(std::iter::once((label.len(), ' '))) {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                let run = &label[s..i];
                if best.map_or(true, |b| run.len() > b.len()) {
                    best = Some(run);
                }
                start = None;
            }
            _ => {}
        }
    }

    best.and_then(|digits| digits.parse().ok())
}

/// Number, place and bind every player.
pub fn resolve(registration: Registration, spawn_points: &[Vec3]) -> Result<Vec<RegisteredPlayer>, MatchError> {
    // Explicit lists hand out spawn slots by position; tagged players get
    // them by number.
    let positional = matches!(registration, Registration::Explicit(_));

    // (label, fallback position, explicit input) in discovery order
    let entries: Vec<(String, Option<Vec3>, Option<InputSource>)> = match registration {
        Registration::Explicit(specs) => specs
            .into_iter()
            .map(|s| (s.label, s.position, s.input))
            .collect(),
        Registration::Tagged(objects) => objects
            .into_iter()
            .filter(|o| o.tag == PLAYER_TAG)
            .map(|o| (o.label, Some(o.position), None))
            .collect(),
    };

    if entries.len() < MIN_PLAYERS {
        return Err(MatchError::NotEnoughPlayers { found: entries.len() });
    }

    let ids = assign_numbers(entries.iter().map(|(label, _, _)| label.as_str()));

    let mut players: Vec<RegisteredPlayer> = entries
        .into_iter()
        .zip(ids)
        .map(|((label, position, input), id)| RegisteredPlayer {
            id,
            input: input.unwrap_or_else(|| InputSource::default_for(id)),
            label,
            spawn: position.unwrap_or(Vec3::ZERO),
        })
        .collect();

    if positional {
        assign_spawns(&mut players, spawn_points);
        players.sort_by_key(|p| p.id);
    } else {
        players.sort_by_key(|p| p.id);
        assign_spawns(&mut players, spawn_points);
    }

    for player in &players {
        debug!(player = %player.id, label = %player.label, spawn = ?player.spawn, "player resolved");
    }

    Ok(players)
}

/// Spawn point `i` to the `i`-th player in slice order.
fn assign_spawns(players: &mut [RegisteredPlayer], spawn_points: &[Vec3]) {
    for (slot, player) in players.iter_mut().enumerate() {
        match spawn_points.get(slot) {
            Some(point) => player.spawn = *point,
            None if !spawn_points.is_empty() => {
                warn!(player = %player.id, "no spawn point for player, using its registered position");
            }
            None => {}
        }
    }
}

fn assign_numbers<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<PlayerId> {
    let parsed: Vec<Option<u32>> = labels.map(parse_player_number).collect();

    let mut taken = BTreeSet::new();
    let mut numbers: Vec<Option<u32>> = parsed
        .iter()
        .map(|n| match n {
            Some(n) if *n > 0 && taken.insert(*n) => Some(*n),
            _ => None,
        })
        .collect();

    let mut next = 1;
    for slot in numbers.iter_mut().filter(|n| n.is_none()) {
        while taken.contains(&next) {
            next += 1;
        }
        taken.insert(next);
        *slot = Some(next);
    }

    numbers
        .into_iter()
        .map(|n| PlayerId::new(n.unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player_number() {
        assert_eq!(parse_player_number("Player1"), Some(1));
        assert_eq!(parse_player_number("Player12"), Some(12));
        assert_eq!(parse_player_number("P1_Red_007"), Some(7));
        assert_eq!(parse_player_number("12_and_34"), Some(12));
        assert_eq!(parse_player_number("Player"), None);
        assert_eq!(parse_player_number(""), None);
        assert_eq!(parse_player_number("99999999999999"), None);
    }

    #[test]
    fn test_tagged_registration_orders_by_number() {
        let objects = vec![
            DiscoveredObject::player("Player2", Vec3::new(3.0, 0.0, 0.0)),
            DiscoveredObject {
                tag: "Prop".into(),
                label: "Crate1".into(),
                position: Vec3::ZERO,
            },
            DiscoveredObject::player("Player1", Vec3::new(-3.0, 0.0, 0.0)),
        ];
        let spawns = [Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)];

        let players = resolve(Registration::Tagged(objects), &spawns).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].id, PlayerId::new(1));
        assert_eq!(players[0].spawn, spawns[0]);
        assert_eq!(players[1].id, PlayerId::new(2));
        assert_eq!(players[1].spawn, spawns[1]);
        assert_eq!(players[1].input, InputSource::arrows());
    }

    #[test]
    fn test_duplicate_and_missing_numbers_fall_back() {
        let specs = vec![
            PlayerSpec::new("Player2"),
            PlayerSpec::new("Blue"),
            PlayerSpec::new("Player2_copy"),
            PlayerSpec::new("Player0"),
        ];
        let players = resolve(Registration::Explicit(specs), &[]).unwrap();
        let ids: Vec<(String, u32)> = players.iter().map(|p| (p.label.clone(), p.id.number())).collect();

        assert_eq!(
            ids,
            vec![
                ("Blue".to_string(), 1),
                ("Player2".to_string(), 2),
                ("Player2_copy".to_string(), 3),
                ("Player0".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_spawn_fallback_to_position() {
        let specs = vec![
            PlayerSpec::new("Player1").at(Vec3::new(1.0, 0.0, 1.0)),
            PlayerSpec::new("Player2").at(Vec3::new(-1.0, 0.0, -1.0)),
            PlayerSpec::new("Player3"),
        ];
        let players = resolve(Registration::Explicit(specs), &[Vec3::new(0.0, 0.0, 4.0)]).unwrap();

        assert_eq!(players[0].spawn, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(players[1].spawn, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(players[2].spawn, Vec3::ZERO);
    }

    #[test]
    fn test_explicit_spawns_follow_list_order() {
        let specs = vec![PlayerSpec::new("Player2"), PlayerSpec::new("Player1")];
        let spawns = [Vec3::new(-3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];

        let players = resolve(Registration::Explicit(specs), &spawns).unwrap();

        // Still sorted and numbered by label
        assert_eq!(players[0].id, PlayerId::new(1));
        assert_eq!(players[0].label, "Player1");
        assert_eq!(players[1].id, PlayerId::new(2));
        assert_eq!(players[1].label, "Player2");
        // First listed spec takes the first slot
        assert_eq!(players[1].spawn, spawns[0]);
        assert_eq!(players[0].spawn, spawns[1]);
    }

    #[test]
    fn test_not_enough_players() {
        let objects = vec![DiscoveredObject::player("Player1", Vec3::ZERO)];
        assert!(matches!(
            resolve(Registration::Tagged(objects), &[]),
            Err(MatchError::NotEnoughPlayers { found: 1 })
        ));
    }

    #[test]
    fn test_explicit_input_kept() {
        let joystick = InputSource::VirtualJoystick { index: 4, dead_zone: 0.2 };
        let specs = vec![
            PlayerSpec::new("Player1").with_input(joystick.clone()),
            PlayerSpec::new("Player2"),
        ];
        let players = resolve(Registration::Explicit(specs), &[]).unwrap();
        assert_eq!(players[0].input, joystick);
        assert_eq!(players[1].input, InputSource::arrows());
    }
}
