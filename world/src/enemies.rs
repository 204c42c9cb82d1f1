//! Enemy runtime state and waypoint traversal.

use std::sync::Arc;

use rampart_core::{EnemyArchetype, EnemyId, EnemyKind, EnemySnapshot, Health, Vec2};

use crate::pool::Poolable;

/// Result of advancing an enemy for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stride {
    /// The enemy moved or switched to its next waypoint.
    Travelling,
    /// The enemy stepped past its final waypoint.
    ReachedGoal,
    /// The enemy has no route to walk.
    Stranded,
}

/// Runtime state of a pooled enemy instance.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) kind: EnemyKind,
    pub(crate) position: Vec2,
    pub(crate) health: Health,
    pub(crate) coin_reward: u32,
    pub(crate) pooled: bool,
    move_speed: f32,
    route: Arc<[Vec2]>,
    path_index: usize,
    target_position: Vec2,
    registered: bool,
}

impl Enemy {
    /// Builds a fresh instance from its archetype.
    pub(crate) fn from_archetype(archetype: &EnemyArchetype) -> Self {
        Self {
            kind: archetype.kind,
            position: Vec2::ZERO,
            health: Health::new(archetype.effective_health()),
            coin_reward: archetype.coin_reward,
            pooled: archetype.pooled,
            move_speed: archetype.effective_speed(),
            route: Arc::from(Vec::new()),
            path_index: 0,
            target_position: Vec2::ZERO,
            registered: false,
        }
    }

    pub(crate) const fn is_registered(&self) -> bool {
        self.registered
    }

    /// Places the enemy at the start of `route` and aims it at the second waypoint.
    ///
    /// Returns `false` when the route is too short to walk; the enemy is still
    /// registered but stays where it is.
    pub(crate) fn register(&mut self, route: Arc<[Vec2]>) -> bool {
        self.registered = true;
        if let Some(start) = route.first() {
            self.position = *start;
        }
        self.target_position = self.position;

        let walkable = route.len() >= 2;
        if walkable {
            self.path_index = 1;
            self.target_position = route[1];
        } else {
            self.path_index = 0;
        }
        self.route = route;
        walkable
    }

    /// Advances the enemy along its route for `dt` seconds.
    ///
    /// Within one tick the enemy either moves toward its current waypoint or,
    /// when already closer than `arrival_epsilon`, switches to the next one.
    pub(crate) fn stride(&mut self, dt: f32, arrival_epsilon: f32) -> Stride {
        if self.route.len() < 2 {
            return Stride::Stranded;
        }

        if self.position.distance(self.target_position) < arrival_epsilon {
            self.path_index += 1;
            return match self.route.get(self.path_index) {
                Some(next) => {
                    self.target_position = *next;
                    Stride::Travelling
                }
                None => Stride::ReachedGoal,
            };
        }

        self.position = move_towards(self.position, self.target_position, self.move_speed * dt);
        Stride::Travelling
    }

    pub(crate) fn snapshot(&self, id: EnemyId) -> EnemySnapshot {
        EnemySnapshot {
            id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            path_index: self.path_index,
        }
    }
}

impl Poolable for Enemy {
    fn activate(&mut self, position: Vec2) {
        self.position = position;
        self.target_position = position;
        self.health.restore();
        self.path_index = 0;
        self.registered = false;
    }

    fn deactivate(&mut self) {
        self.registered = false;
        self.route = Arc::from(Vec::new());
    }
}

/// Moves `from` toward `to` by at most `max_step` without overshooting.
fn move_towards(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        to
    } else {
        from + delta / distance * max_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grunt() -> Enemy {
        Enemy::from_archetype(&EnemyArchetype {
            kind: EnemyKind::Grunt,
            max_health: 3,
            move_speed: 1.0,
            coin_reward: 1,
            pooled: true,
            prewarm: 0,
        })
    }

    fn route(points: &[(f32, f32)]) -> Arc<[Vec2]> {
        points.iter().map(|(x, y)| Vec2::new(*x, *y)).collect()
    }

    #[test]
    fn registration_starts_at_first_waypoint() {
        let mut enemy = grunt();
        assert!(enemy.register(route(&[(1.0, 1.0), (4.0, 1.0)])));
        assert_eq!(enemy.position, Vec2::new(1.0, 1.0));
        assert_eq!(enemy.target_position, Vec2::new(4.0, 1.0));
        assert_eq!(enemy.path_index, 1);
    }

    #[test]
    fn short_route_leaves_enemy_stranded() {
        let mut enemy = grunt();
        assert!(!enemy.register(route(&[(2.0, 2.0)])));
        assert!(enemy.is_registered());
        assert_eq!(enemy.stride(1.0, 0.1), Stride::Stranded);
        assert_eq!(enemy.position, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn movement_never_overshoots_the_waypoint() {
        let mut enemy = grunt();
        assert!(enemy.register(route(&[(0.0, 0.0), (1.5, 0.0), (1.5, 3.0)])));

        assert_eq!(enemy.stride(1.0, 0.1), Stride::Travelling);
        assert_eq!(enemy.position, Vec2::new(1.0, 0.0));
        assert_eq!(enemy.stride(1.0, 0.1), Stride::Travelling);
        assert_eq!(enemy.position, Vec2::new(1.5, 0.0));

        assert_eq!(enemy.stride(1.0, 0.1), Stride::Travelling);
        assert_eq!(enemy.path_index, 2);
        assert_eq!(enemy.position, Vec2::new(1.5, 0.0));
    }

    #[test]
    fn stepping_past_the_last_waypoint_reaches_goal() {
        let mut enemy = grunt();
        assert!(enemy.register(route(&[(0.0, 0.0), (0.5, 0.0)])));
        assert_eq!(enemy.stride(1.0, 0.1), Stride::Travelling);
        assert_eq!(enemy.stride(1.0, 0.1), Stride::ReachedGoal);
    }

    #[test]
    fn reactivation_restores_health() {
        let mut enemy = grunt();
        let _ = enemy.health.take_damage(3);
        enemy.deactivate();
        enemy.activate(Vec2::ONE);
        assert_eq!(enemy.health.current(), 3);
        assert!(!enemy.is_registered());
        assert_eq!(enemy.position, Vec2::ONE);
    }
}
