#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that walks a wave plan and emits enemy spawn commands.

use std::time::Duration;

use rampart_core::{Command, EnemyKind, Event};
use serde::Deserialize;

/// A run of identical enemies released at a fixed cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct SpawnGroup {
    /// Archetype spawned by the group.
    pub kind: EnemyKind,
    /// Number of enemies in the group.
    pub count: u32,
    /// Milliseconds between consecutive spawns.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl SpawnGroup {
    /// Creates a group releasing `count` enemies of `kind`, one per `interval`.
    #[must_use]
    pub fn new(kind: EnemyKind, count: u32, interval: Duration) -> Self {
        Self {
            kind,
            count,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Time between consecutive spawns.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

const fn default_interval_ms() -> u64 {
    1_000
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    groups: Vec<SpawnGroup>,
    max_in_flight: Option<u32>,
}

impl Config {
    /// Creates a new configuration releasing the provided groups in order.
    #[must_use]
    pub fn new(groups: Vec<SpawnGroup>) -> Self {
        Self {
            groups,
            max_in_flight: None,
        }
    }

    /// Caps how many spawned enemies may be alive at once.
    #[must_use]
    pub fn with_max_in_flight(mut self, limit: u32) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Groups released by the plan, in order.
    #[must_use]
    pub fn groups(&self) -> &[SpawnGroup] {
        &self.groups
    }

    /// Total number of enemies the plan will release.
    #[must_use]
    pub fn total_enemies(&self) -> u32 {
        self.groups
            .iter()
            .fold(0u32, |total, group| total.saturating_add(group.count))
    }
}

/// Pure system that deterministically emits spawn commands from a wave plan.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    group_index: usize,
    spawned_in_group: u32,
    accumulator: Duration,
    in_flight: u32,
    announced: bool,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut spawning = Self {
            config,
            group_index: 0,
            spawned_in_group: 0,
            accumulator: Duration::ZERO,
            in_flight: 0,
            announced: false,
        };
        spawning.skip_empty_groups();
        spawning
    }

    /// Total number of enemies the plan will release.
    #[must_use]
    pub fn total_enemies(&self) -> u32 {
        self.config.total_enemies()
    }

    /// Number of spawned enemies that have neither died nor reached the goal.
    #[must_use]
    pub const fn in_flight(&self) -> u32 {
        self.in_flight
    }

    /// Reports whether every group of the plan has been released.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.group_index >= self.config.groups.len()
    }

    /// Consumes world events and emits spawn commands for elapsed intervals.
    ///
    /// `Command::SetAllEnemiesSpawned` is emitted exactly once, on the call
    /// that finds the plan exhausted.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::EnemyKilled { .. } | Event::EnemyReachedGoal { .. } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                }
                _ => {}
            }
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);

        while let Some(group) = self.current_group() {
            if self.at_capacity() {
                self.accumulator = self.accumulator.min(group.interval());
                break;
            }

            if self.accumulator < group.interval() {
                break;
            }

            self.accumulator -= group.interval();
            out.push(Command::SpawnEnemy { kind: group.kind });
            self.in_flight = self.in_flight.saturating_add(1);
            self.spawned_in_group += 1;
            if self.spawned_in_group >= group.count {
                self.group_index += 1;
                self.spawned_in_group = 0;
                self.skip_empty_groups();
            }
        }

        if self.is_exhausted() && !self.announced {
            self.announced = true;
            out.push(Command::SetAllEnemiesSpawned);
        }
    }

    fn current_group(&self) -> Option<SpawnGroup> {
        self.config.groups.get(self.group_index).copied()
    }

    fn at_capacity(&self) -> bool {
        self.config
            .max_in_flight
            .is_some_and(|limit| self.in_flight >= limit)
    }

    fn skip_empty_groups(&mut self) {
        while self
            .current_group()
            .is_some_and(|group| group.count == 0)
        {
            self.group_index += 1;
        }
    }
}
