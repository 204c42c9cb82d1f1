//! Headless match loop that wires the spawner to the world.

use std::{fmt, time::Duration};

use log::{debug, info, warn};
use rampart_core::{Command, Event, Outcome};
use rampart_system_spawning::Spawning;
use rampart_world::{self as world, query, World};
use serde::Serialize;

use crate::scenario::Scenario;

/// Summary of a finished (or abandoned) match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct MatchReport {
    /// Terminal result; `None` when the tick cap was hit first.
    pub(crate) outcome: Option<Outcome>,
    /// Number of ticks simulated.
    pub(crate) ticks: u64,
    /// Simulated seconds.
    pub(crate) elapsed_secs: f32,
    /// Enemies destroyed by towers.
    pub(crate) killed: u32,
    /// Enemies that reached the goal.
    pub(crate) leaked: u32,
    /// Lives left at the end.
    pub(crate) lives: u32,
    /// Lives at match start.
    pub(crate) max_lives: u32,
    /// Coins left at the end.
    pub(crate) coins: u32,
    /// Towers standing at the end.
    pub(crate) towers: usize,
    /// Projectiles launched over the whole match.
    pub(crate) shots_fired: u32,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Some(Outcome::Victory) => "victory",
            Some(Outcome::Defeat) => "defeat",
            None => "unfinished",
        };
        writeln!(
            f,
            "{outcome} after {} ticks ({:.1}s)",
            self.ticks, self.elapsed_secs
        )?;
        writeln!(f, "  killed      {}", self.killed)?;
        writeln!(f, "  leaked      {}", self.leaked)?;
        writeln!(f, "  lives       {}/{}", self.lives, self.max_lives)?;
        writeln!(f, "  coins       {}", self.coins)?;
        writeln!(f, "  towers      {}", self.towers)?;
        write!(f, "  shots fired {}", self.shots_fired)
    }
}

/// Plays `scenario` until the match ends or `max_ticks` ticks have elapsed.
pub(crate) fn run(scenario: &Scenario, dt: Duration, max_ticks: u64) -> MatchReport {
    let mut world = World::new(scenario.rules.clone());
    let mut spawning = Spawning::new(scenario.waves.clone());
    let mut events = Vec::new();
    let mut commands = Vec::new();

    world::apply(
        &mut world,
        Command::SetTotalEnemies {
            count: spawning.total_enemies(),
        },
        &mut events,
    );
    for placement in &scenario.towers {
        world::apply(
            &mut world,
            Command::PlaceTower {
                kind: placement.kind,
                cell: placement.cell,
            },
            &mut events,
        );
    }
    for event in &events {
        if let Event::TowerPlacementRejected { kind, cell, reason } = event {
            warn!("could not place {kind:?} at {cell:?}: {reason}");
        }
    }
    events.clear();

    let mut ticks = 0u64;
    let mut shots_fired = 0u32;
    while !query::is_over(&world) && ticks < max_ticks {
        commands.clear();
        spawning.handle(&events, &mut commands);
        events.clear();

        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events);
        }
        world::apply(&mut world, Command::Tick { dt }, &mut events);
        ticks += 1;

        shots_fired += events
            .iter()
            .filter(|event| matches!(event, Event::ProjectileFired { .. }))
            .count() as u32;
        debug!(
            "tick {ticks}: {} events, {} enemies in flight",
            events.len(),
            spawning.in_flight()
        );
    }

    let report = MatchReport {
        outcome: query::outcome(&world),
        ticks,
        elapsed_secs: dt.as_secs_f32() * ticks as f32,
        killed: query::killed_count(&world),
        leaked: query::leaked_count(&world),
        lives: query::lives(&world),
        max_lives: query::max_lives(&world),
        coins: query::coins(&world),
        towers: query::tower_view(&world).iter().count(),
        shots_fired,
    };
    match report.outcome {
        Some(outcome) => info!("match finished with {outcome:?} after {ticks} ticks"),
        None => warn!("match still running after {max_ticks} ticks"),
    }
    report
}
