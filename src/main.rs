//! Knockout Arena
//!
//! Headless demo: runs a match on the built-in arena solver with scripted
//! players that chase each other, and logs what happens.
//!
//! Usage: `knockout-arena [config.json]`. Log verbosity follows `RUST_LOG`
//! (default `info`).

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use knockout_arena::{
    game::{
        events::MatchEventData,
        input::InputFrame,
        registry::DiscoveredObject,
        tick::tick_with_frames,
        MatchController,
    },
    MatchConfig, PlayerId, Registration, TICK_RATE, VERSION,
};

/// Give up after ten minutes of simulated play.
const MAX_TICKS: u32 = 10 * 60 * TICK_RATE;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Knockout Arena v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = match std::env::args().nth(1) {
        Some(path) => MatchConfig::from_path(&path).with_context(|| format!("loading config from {path}"))?,
        None => MatchConfig::default(),
    };

    demo_match(config)
}

/// Two tagged players charging at each other until someone takes the match.
fn demo_match(config: MatchConfig) -> Result<()> {
    info!("=== Starting Demo Match ===");
    info!(
        "Best of {} ({} wins needed), mode {:?}, seed {}",
        config.rounds.max_rounds,
        config.rounds.win_threshold(),
        config.rounds.mode,
        config.rng_seed
    );

    let registration = Registration::Tagged(vec![
        DiscoveredObject::player("Player1", Vec3::new(-2.0, 0.0, 0.0)),
        DiscoveredObject::player("Player2", Vec3::new(2.0, 0.0, 0.0)),
    ]);
    let mut ctl = MatchController::with_arena_physics(config, registration).context("setting up match")?;

    let mut total_events = 0;
    for t in 0..MAX_TICKS {
        let inputs = chase_inputs(&ctl);
        let result = tick_with_frames(&mut ctl, &inputs);
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                MatchEventData::PushResolved { attacker, defender, magnitude, .. } => {
                    info!("Tick {}: {} pushed {} ({:.1})", event.tick, attacker, defender, magnitude);
                }
                MatchEventData::PlayerEliminated { victim, knocked_out_by, round } => {
                    info!("Tick {}: {} fell in round {} (by {:?})", event.tick, victim, round, knocked_out_by);
                }
                MatchEventData::RoundEnded { round, winner: Some(winner) } => {
                    info!("Round {} won by {}", round, winner);
                }
                MatchEventData::RoundEnded { round, winner: None } => {
                    info!("Round {} is a draw", round);
                }
                MatchEventData::PowerupCollected { player, kind, .. } => {
                    info!("Tick {}: {} picked up {:?}", event.tick, player, kind);
                }
                _ => {}
            }
        }

        if result.match_ended {
            info!("Match ended at tick {}", t);
            break;
        }
    }

    info!("=== Match Results ===");
    match ctl.winner() {
        Some(winner) => info!("Winner: {}", winner),
        None => warn!("No winner after {} ticks", MAX_TICKS),
    }
    for player in ctl.players() {
        info!(
            "{} ({}): {} rounds, {} knockouts, {} falls",
            player.id,
            player.label,
            ctl.score(player.id),
            player.knockouts,
            player.falls
        );
    }
    info!("Total events: {}", total_events);

    Ok(())
}

/// Every in-play player steers toward the nearest other in-play player.
fn chase_inputs(ctl: &MatchController) -> BTreeMap<PlayerId, InputFrame> {
    let positions: Vec<(PlayerId, Vec3)> = ctl
        .players()
        .filter(|p| p.is_in_play())
        .filter_map(|p| ctl.physics().position(p.id).map(|pos| (p.id, pos)))
        .collect();

    positions
        .iter()
        .filter_map(|(id, pos)| {
            let target = positions
                .iter()
                .filter(|(other, _)| other != id)
                .min_by(|a, b| pos.distance_squared(a.1).total_cmp(&pos.distance_squared(b.1)))?;
            let to = target.1 - *pos;
            Some((*id, InputFrame::from_vec2(Vec2::new(to.x, to.z).normalize_or_zero())))
        })
        .collect()
}
