//! Archetype catalogs and match rules supplied as configuration data.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of one-time upgrade options a tower archetype may offer.
pub const MAX_UPGRADE_OPTIONS: usize = 3;

/// Types of towers that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Balanced single-target tower.
    Basic,
    /// Fast-firing, low-damage tower.
    Rapid,
    /// Slow tower whose shells deal area damage.
    Cannon,
    /// Long-range, high-damage tower.
    Sniper,
}

/// Types of enemies that can walk the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Baseline enemy.
    Grunt,
    /// Fragile, fast enemy.
    Runner,
    /// Slow enemy with a large health pool.
    Brute,
}

/// Types of projectiles towers can launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Light single-target projectile.
    Arrow,
    /// Heavy projectile, usually paired with splash damage.
    Shell,
    /// Long-range projectile.
    Bolt,
}

/// Base statistics of a tower archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerArchetype {
    /// Archetype described by this entry.
    pub kind: TowerKind,
    /// Coins charged when the tower is placed.
    pub purchase_cost: u32,
    /// Damage dealt by each projectile.
    pub power: u32,
    /// Targeting range in world units.
    pub range: f32,
    /// Delay between shots in seconds.
    pub shoot_delay: f32,
    /// Projectile travel speed in world units per second.
    pub projectile_speed: f32,
    /// Area damage radius; zero means single-target.
    pub splash_radius: f32,
    /// Projectile archetype launched by the tower.
    pub projectile: Option<ProjectileKind>,
    /// Number of classic upgrades the tower accepts.
    pub max_level: u32,
    /// Factor applied to power on each classic upgrade.
    pub power_multiplier: f32,
    /// Factor applied to range on each classic upgrade.
    pub range_multiplier: f32,
    /// Factor applied to the shoot delay on each classic upgrade.
    pub delay_multiplier: f32,
    /// Growth factor of the classic upgrade cost per level.
    pub cost_multiplier: f32,
    /// One-time upgrade options offered by the archetype.
    pub options: Vec<UpgradeOption>,
}

impl Default for TowerArchetype {
    fn default() -> Self {
        Self {
            kind: TowerKind::Basic,
            purchase_cost: 10,
            power: 1,
            range: 1.0,
            shoot_delay: 1.0,
            projectile_speed: 5.0,
            splash_radius: 0.0,
            projectile: None,
            max_level: 3,
            power_multiplier: 1.5,
            range_multiplier: 1.12,
            delay_multiplier: 0.9,
            cost_multiplier: 1.7,
            options: Vec::new(),
        }
    }
}

/// Priced one-time modifier offered by a tower archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeOption {
    /// Label presented to the player.
    pub name: String,
    /// Coins charged when the option is applied.
    pub cost: u32,
    /// Factor applied to power.
    pub power_multiplier: f32,
    /// Factor applied to range.
    pub range_multiplier: f32,
    /// Factor applied to the shoot delay.
    pub delay_multiplier: f32,
    /// Replacement splash radius, if the option changes it.
    pub splash_radius: Option<f32>,
    /// Archetype the tower turns into, if the option replaces it.
    pub replace_with: Option<TowerKind>,
}

impl Default for UpgradeOption {
    fn default() -> Self {
        Self {
            name: String::new(),
            cost: 0,
            power_multiplier: 1.0,
            range_multiplier: 1.0,
            delay_multiplier: 1.0,
            splash_radius: None,
            replace_with: None,
        }
    }
}

/// Base statistics of an enemy archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyArchetype {
    /// Archetype described by this entry.
    pub kind: EnemyKind,
    /// Health at spawn; values below one are raised to one.
    pub max_health: u32,
    /// Walking speed in world units per second; values below 0.01 are raised to 0.01.
    pub move_speed: f32,
    /// Coins credited when the enemy is killed.
    pub coin_reward: u32,
    /// Whether dead or leaked instances return to a pool instead of being destroyed.
    pub pooled: bool,
    /// Instances parked in the pool when the match starts; ignored when unpooled.
    pub prewarm: u32,
}

impl EnemyArchetype {
    /// Health at spawn after clamping.
    #[must_use]
    pub fn effective_health(&self) -> u32 {
        self.max_health.max(1)
    }

    /// Walking speed after clamping.
    #[must_use]
    pub fn effective_speed(&self) -> f32 {
        self.move_speed.max(0.01)
    }
}

impl Default for EnemyArchetype {
    fn default() -> Self {
        Self {
            kind: EnemyKind::Grunt,
            max_health: 1,
            move_speed: 1.0,
            coin_reward: 1,
            pooled: true,
            prewarm: 0,
        }
    }
}

/// Base statistics of a projectile archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileArchetype {
    /// Archetype described by this entry.
    pub kind: ProjectileKind,
    /// Contact distance at which the projectile strikes its target.
    pub impact_radius: f32,
    /// Instances parked in the pool when the match starts.
    pub prewarm: u32,
}

impl Default for ProjectileArchetype {
    fn default() -> Self {
        Self {
            kind: ProjectileKind::Arrow,
            impact_radius: 0.2,
            prewarm: 0,
        }
    }
}

/// Rules and archetype catalogs for a single match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Lives at match start.
    pub max_lives: u32,
    /// Coins at match start.
    pub start_coins: u32,
    /// Enemies the match expects before the spawner reports its own total.
    pub total_enemies: u32,
    /// Distance below which an enemy counts as having reached its waypoint.
    pub arrival_epsilon: f32,
    /// Lower bound of a tower's shoot delay after upgrades.
    pub min_shoot_delay: f32,
    /// Side length of a placement cell in world units.
    pub cell_size: f32,
    /// Waypoints walked by every enemy; needs at least two entries.
    pub path: Vec<Vec2>,
    /// Tower archetype catalog.
    pub towers: Vec<TowerArchetype>,
    /// Enemy archetype catalog.
    pub enemies: Vec<EnemyArchetype>,
    /// Projectile archetype catalog.
    pub projectiles: Vec<ProjectileArchetype>,
}

impl MatchConfig {
    /// Looks up the archetype of the provided tower kind.
    #[must_use]
    pub fn tower(&self, kind: TowerKind) -> Option<&TowerArchetype> {
        self.towers.iter().find(|archetype| archetype.kind == kind)
    }

    /// Looks up the archetype of the provided enemy kind.
    #[must_use]
    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyArchetype> {
        self.enemies.iter().find(|archetype| archetype.kind == kind)
    }

    /// Looks up the archetype of the provided projectile kind.
    #[must_use]
    pub fn projectile(&self, kind: ProjectileKind) -> Option<&ProjectileArchetype> {
        self.projectiles
            .iter()
            .find(|archetype| archetype.kind == kind)
    }

    /// Checks catalogs for duplicates, dangling references and nonsensical values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.len() < 2 {
            return Err(ConfigError::PathTooShort(self.path.len()));
        }
        if self.cell_size <= 0.0 {
            return Err(ConfigError::NonPositive("cell_size"));
        }
        if self.arrival_epsilon <= 0.0 {
            return Err(ConfigError::NonPositive("arrival_epsilon"));
        }
        if self.min_shoot_delay <= 0.0 {
            return Err(ConfigError::NonPositive("min_shoot_delay"));
        }

        let mut projectiles = BTreeSet::new();
        for archetype in &self.projectiles {
            if !projectiles.insert(archetype.kind) {
                return Err(ConfigError::DuplicateProjectile(archetype.kind));
            }
        }

        let mut enemies = BTreeSet::new();
        for archetype in &self.enemies {
            if !enemies.insert(archetype.kind) {
                return Err(ConfigError::DuplicateEnemy(archetype.kind));
            }
        }

        let mut towers = BTreeSet::new();
        for archetype in &self.towers {
            if !towers.insert(archetype.kind) {
                return Err(ConfigError::DuplicateTower(archetype.kind));
            }
            if archetype.shoot_delay <= 0.0 {
                return Err(ConfigError::NonPositive("shoot_delay"));
            }
            if archetype.projectile_speed <= 0.0 {
                return Err(ConfigError::NonPositive("projectile_speed"));
            }
            if archetype.options.len() > MAX_UPGRADE_OPTIONS {
                return Err(ConfigError::TooManyOptions {
                    tower: archetype.kind,
                    count: archetype.options.len(),
                });
            }
            if let Some(projectile) = archetype.projectile {
                if self.projectile(projectile).is_none() {
                    return Err(ConfigError::UnknownProjectile {
                        tower: archetype.kind,
                        projectile,
                    });
                }
            }
        }

        for archetype in &self.towers {
            for option in &archetype.options {
                if let Some(replacement) = option.replace_with {
                    if !towers.contains(&replacement) {
                        return Err(ConfigError::UnknownReplacement {
                            tower: archetype.kind,
                            replacement,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_lives: 3,
            start_coins: 5,
            total_enemies: 15,
            arrival_epsilon: 0.1,
            min_shoot_delay: 0.05,
            cell_size: 1.0,
            path: vec![
                Vec2::new(0.0, 2.5),
                Vec2::new(8.0, 2.5),
                Vec2::new(8.0, 6.5),
                Vec2::new(16.0, 6.5),
            ],
            towers: vec![
                TowerArchetype {
                    range: 2.5,
                    projectile: Some(ProjectileKind::Arrow),
                    options: vec![
                        UpgradeOption {
                            name: "Sharpened tips".to_owned(),
                            cost: 8,
                            power_multiplier: 2.0,
                            ..UpgradeOption::default()
                        },
                        UpgradeOption {
                            name: "Siege conversion".to_owned(),
                            cost: 15,
                            replace_with: Some(TowerKind::Cannon),
                            ..UpgradeOption::default()
                        },
                    ],
                    ..TowerArchetype::default()
                },
                TowerArchetype {
                    kind: TowerKind::Cannon,
                    purchase_cost: 20,
                    power: 2,
                    range: 2.0,
                    shoot_delay: 2.0,
                    projectile_speed: 3.0,
                    splash_radius: 1.0,
                    projectile: Some(ProjectileKind::Shell),
                    ..TowerArchetype::default()
                },
            ],
            enemies: vec![
                EnemyArchetype {
                    max_health: 3,
                    ..EnemyArchetype::default()
                },
                EnemyArchetype {
                    kind: EnemyKind::Runner,
                    max_health: 2,
                    move_speed: 2.0,
                    ..EnemyArchetype::default()
                },
            ],
            projectiles: vec![
                ProjectileArchetype::default(),
                ProjectileArchetype {
                    kind: ProjectileKind::Shell,
                    impact_radius: 0.3,
                    ..ProjectileArchetype::default()
                },
            ],
        }
    }
}

/// Problems detected while validating a [`MatchConfig`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The waypoint path has fewer than two points.
    #[error("path needs at least two waypoints, found {0}")]
    PathTooShort(usize),
    /// A value that must be strictly positive was not.
    #[error("`{0}` must be greater than zero")]
    NonPositive(&'static str),
    /// Two tower entries share a kind.
    #[error("tower archetype {0:?} is defined more than once")]
    DuplicateTower(TowerKind),
    /// Two enemy entries share a kind.
    #[error("enemy archetype {0:?} is defined more than once")]
    DuplicateEnemy(EnemyKind),
    /// Two projectile entries share a kind.
    #[error("projectile archetype {0:?} is defined more than once")]
    DuplicateProjectile(ProjectileKind),
    /// A tower references an undefined projectile.
    #[error("tower {tower:?} fires undefined projectile {projectile:?}")]
    UnknownProjectile {
        /// Tower holding the reference.
        tower: TowerKind,
        /// Projectile that is not defined.
        projectile: ProjectileKind,
    },
    /// An upgrade option references an undefined tower.
    #[error(
        "tower {tower:?} offers a replacement by undefined tower {replacement:?}"
    )]
    UnknownReplacement {
        /// Tower offering the option.
        tower: TowerKind,
        /// Replacement that is not defined.
        replacement: TowerKind,
    },
    /// A tower offers more options than a panel can hold.
    #[error("tower {tower:?} offers {count} upgrade options")]
    TooManyOptions {
        /// Tower offering the options.
        tower: TowerKind,
        /// Number of options offered.
        count: usize,
    },
}
