//! Projectile runtime state.

use rampart_core::{EnemyId, ProjectileId, ProjectileKind, ProjectileSnapshot, Vec2};

use crate::{pool::Poolable, towers::TowerState};

/// Runtime state of a pooled projectile instance.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) kind: ProjectileKind,
    pub(crate) position: Vec2,
    pub(crate) heading: f32,
    pub(crate) target: Option<EnemyId>,
    pub(crate) power: u32,
    pub(crate) splash_radius: f32,
    speed: f32,
    impact_radius: f32,
}

impl Projectile {
    pub(crate) fn new(kind: ProjectileKind, impact_radius: f32) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            heading: 0.0,
            target: None,
            power: 0,
            splash_radius: 0.0,
            speed: 0.0,
            impact_radius,
        }
    }

    /// Loads the firing tower's current stats and locks onto `target`.
    pub(crate) fn arm(&mut self, tower: &TowerState, target: EnemyId) {
        self.power = tower.power;
        self.speed = tower.projectile_speed;
        self.splash_radius = tower.splash_radius;
        self.target = Some(target);
    }

    pub(crate) fn snapshot(&self, id: ProjectileId) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id,
            kind: self.kind,
            position: self.position,
            heading: self.heading,
            target: self.target,
            power: self.power,
            speed: self.speed,
            splash_radius: self.splash_radius,
            impact_radius: self.impact_radius,
        }
    }
}

impl Poolable for Projectile {
    fn activate(&mut self, position: Vec2) {
        self.position = position;
        self.heading = 0.0;
        self.target = None;
    }

    fn deactivate(&mut self) {
        self.target = None;
    }
}
