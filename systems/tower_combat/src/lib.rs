#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that advances tower firing cadence from targeting data.

use rampart_core::{TowerCadence, TowerTarget, TowerView};

/// Tower combat system that decides which towers are ready to fire.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<TowerCadence>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a cadence update for every tower that currently holds a target.
    ///
    /// Cooldowns only run down while a tower is tracking an enemy; a tower is
    /// ready once its cooldown reaches zero. Resetting the cooldown after a
    /// successful shot is left to the caller.
    pub fn handle(
        &mut self,
        dt: f32,
        towers: &TowerView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<TowerCadence>,
    ) {
        if tower_targets.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            if target.enemy.is_none() {
                continue;
            }

            if let Some(snapshot) = towers.get(target.tower) {
                let cooldown = snapshot.cooldown - dt;
                self.scratch.push(TowerCadence {
                    tower: target.tower,
                    cooldown,
                    ready: cooldown <= 0.0,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::{CellCoord, EnemyId, SlotKey, TowerId, TowerKind, TowerSnapshot, Vec2};

    #[test]
    fn idle_towers_keep_their_cooldown() {
        let mut system = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![snapshot(1, 0.4)]);
        let mut out = Vec::new();

        system.handle(0.5, &towers, &[target(1, None)], &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn readiness_follows_cooldown() {
        let mut system = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![snapshot(2, 0.0), snapshot(5, 1.0)]);
        let targets = vec![target(2, Some(4)), target(5, Some(1))];
        let mut out = Vec::new();

        system.handle(0.5, &towers, &targets, &mut out);

        assert_eq!(
            out,
            vec![
                TowerCadence {
                    tower: TowerId::new(2),
                    cooldown: -0.5,
                    ready: true,
                },
                TowerCadence {
                    tower: TowerId::new(5),
                    cooldown: 0.5,
                    ready: false,
                },
            ],
        );
    }

    #[test]
    fn missing_towers_are_skipped() {
        let mut system = TowerCombat::new();
        let towers = TowerView::from_snapshots(vec![snapshot(8, 0.0)]);
        let targets = vec![target(42, Some(3)), target(8, Some(2))];
        let mut out = Vec::new();

        system.handle(0.1, &towers, &targets, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tower, TowerId::new(8));
    }

    #[test]
    fn one_second_delay_fires_twice_over_three_half_second_ticks() {
        let mut system = TowerCombat::new();
        let shoot_delay = 1.0;
        let mut cooldown = 0.0;
        let mut shots = 0;

        for _ in 0..3 {
            let towers = TowerView::from_snapshots(vec![snapshot(1, cooldown)]);
            let mut out = Vec::new();
            system.handle(0.5, &towers, &[target(1, Some(1))], &mut out);

            let cadence = out[0];
            cooldown = if cadence.ready {
                shots += 1;
                shoot_delay
            } else {
                cadence.cooldown
            };
        }

        assert_eq!(shots, 2);
    }

    fn snapshot(tower: u32, cooldown: f32) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(tower),
            kind: TowerKind::Basic,
            cell: CellCoord::new(tower, 0),
            position: Vec2::ZERO,
            power: 1,
            range: 2.0,
            shoot_delay: 1.0,
            cooldown,
            level: 0,
            max_level: 3,
            target: None,
        }
    }

    fn target(tower: u32, enemy: Option<u32>) -> TowerTarget {
        TowerTarget {
            tower: TowerId::new(tower),
            enemy: enemy.map(|index| EnemyId::from_slot(SlotKey::new(index, 0))),
        }
    }
}
