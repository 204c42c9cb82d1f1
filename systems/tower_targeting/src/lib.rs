#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use rampart_core::{EnemyId, EnemyView, Faction, TowerSnapshot, TowerTarget, TowerView};
use rampart_system_spatial_query::{SpatialEntry, SpatialQuery};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    enemy_workspace: Vec<SpatialEntry<EnemyId>>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes one targeting decision per tower for the provided snapshots.
    ///
    /// A tower keeps its current target while that enemy is still active and
    /// no farther than the tower's range. Otherwise it picks the nearest
    /// active enemy strictly inside its range; equidistant enemies resolve to
    /// the one registered first. The output buffer is cleared before
    /// populating it with the latest decisions.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<TowerTarget>) {
        out.clear();
        self.prepare_enemy_workspace(enemies);

        let query = SpatialQuery::new(&self.enemy_workspace);
        for tower in towers.iter() {
            let enemy = retained_target(tower, enemies).or_else(|| {
                query
                    .nearest_within(tower.position, tower.range, Faction::Invader)
                    .map(|(enemy, _)| enemy)
            });

            out.push(TowerTarget {
                tower: tower.id,
                enemy,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());

        for snapshot in enemies.iter() {
            if snapshot.health.is_dead() {
                continue;
            }

            self.enemy_workspace.push(SpatialEntry {
                id: snapshot.id,
                position: snapshot.position,
                faction: Faction::Invader,
            });
        }
    }
}

fn retained_target(tower: &TowerSnapshot, enemies: &EnemyView) -> Option<EnemyId> {
    let current = enemies.get(tower.target?)?;
    if current.health.is_dead() {
        return None;
    }

    (current.position.distance(tower.position) <= tower.range).then_some(current.id)
}
