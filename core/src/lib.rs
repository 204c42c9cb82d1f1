#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rampart simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command batches or plain data.

mod config;
mod health;

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{
    ConfigError, EnemyArchetype, EnemyKind, MatchConfig, ProjectileArchetype, ProjectileKind,
    TowerArchetype, TowerKind, UpgradeOption, MAX_UPGRADE_OPTIONS,
};
pub use health::{CoinPurse, DamageOutcome, Health};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the waypoint path walked by newly registered enemies.
    ConfigurePath {
        /// Ordered waypoints; the first is the spawn point, the last is the goal.
        waypoints: Vec<Vec2>,
    },
    /// Declares how many enemies the match will spawn in total.
    SetTotalEnemies {
        /// Total number of enemies the spawner intends to produce.
        count: u32,
    },
    /// Acquires an enemy of the given archetype from its pool and registers it.
    SpawnEnemy {
        /// Archetype of the enemy to spawn.
        kind: EnemyKind,
    },
    /// Registers an already acquired enemy with the active roster.
    RegisterEnemy {
        /// Handle of the enemy to register.
        enemy: EnemyId,
    },
    /// Signals that the spawner has exhausted its wave plan.
    SetAllEnemiesSpawned,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests purchase and placement of a tower inside the provided cell.
    PlaceTower {
        /// Archetype of tower to construct.
        kind: TowerKind,
        /// Grid cell the tower will occupy.
        cell: CellCoord,
    },
    /// Requests a classic level upgrade for a tower.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
    },
    /// Requests a one-time upgrade option for a tower.
    ApplyUpgradeOption {
        /// Identifier of the tower to modify.
        tower: TowerId,
        /// Index of the option within the tower archetype's option list.
        option: usize,
    },
    /// Requests that a tower be sold for a partial refund.
    SellTower {
        /// Identifier of the tower to sell.
        tower: TowerId,
    },
    /// Spends coins on behalf of an external purchase.
    SpendCoins {
        /// Number of coins to deduct.
        amount: u32,
    },
    /// Credits coins to the match balance.
    AddCoins {
        /// Number of coins to add.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy instance was acquired from its pool.
    EnemySpawned {
        /// Handle assigned to the enemy for this activation.
        enemy: EnemyId,
        /// Archetype of the spawned enemy.
        kind: EnemyKind,
    },
    /// Confirms that an enemy joined the active roster.
    EnemyRegistered {
        /// Handle of the registered enemy.
        enemy: EnemyId,
        /// Position the enemy starts from.
        position: Vec2,
    },
    /// Reports damage applied to an enemy that survived the hit.
    EnemyDamaged {
        /// Handle of the damaged enemy.
        enemy: EnemyId,
        /// Damage dealt by the hit.
        amount: u32,
        /// Health remaining after the hit.
        remaining: u32,
    },
    /// Reports that an enemy died and paid out its reward.
    EnemyKilled {
        /// Handle of the enemy that died.
        enemy: EnemyId,
        /// Coins credited for the kill.
        reward: u32,
    },
    /// Reports that an enemy walked past its final waypoint.
    EnemyReachedGoal {
        /// Handle of the enemy that leaked.
        enemy: EnemyId,
    },
    /// Reports that a tower locked onto a new target.
    TargetAcquired {
        /// Tower that acquired the target.
        tower: TowerId,
        /// Enemy selected as the target.
        enemy: EnemyId,
    },
    /// Reports that a tower dropped its target.
    TargetLost {
        /// Tower that lost its target.
        tower: TowerId,
    },
    /// Confirms that a tower launched a projectile.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Handle of the launched projectile.
        projectile: ProjectileId,
        /// Enemy the projectile homes onto.
        target: EnemyId,
    },
    /// Reports that a projectile struck its target.
    ProjectileImpacted {
        /// Handle of the projectile that struck.
        projectile: ProjectileId,
        /// Enemy that was struck.
        target: EnemyId,
        /// Location of the impact.
        position: Vec2,
        /// Indicates whether the impact dealt area damage.
        splash: bool,
    },
    /// Reports that a projectile deactivated without effect.
    ProjectileExpired {
        /// Handle of the projectile that expired.
        projectile: ProjectileId,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Archetype of tower that was placed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Archetype requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower advanced a level.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached by the tower.
        level: u32,
        /// Coins spent on the upgrade.
        cost: u32,
    },
    /// Confirms that a one-time upgrade option was applied.
    UpgradeOptionApplied {
        /// Identifier of the modified tower.
        tower: TowerId,
        /// Index of the applied option.
        option: usize,
        /// Archetype of the tower after the option took effect.
        kind: TowerKind,
    },
    /// Reports that an upgrade request was rejected.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted by the request.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a tower was sold and removed.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Cell vacated by the tower.
        cell: CellCoord,
        /// Coins refunded to the player.
        refund: u32,
    },
    /// Reports that a sell request was rejected.
    TowerSaleRejected {
        /// Identifier of the tower targeted by the request.
        tower: TowerId,
        /// Specific reason the sale failed.
        reason: SellError,
    },
    /// Announces the new coin balance.
    CoinsChanged {
        /// Balance after the change.
        coins: u32,
    },
    /// Reports that a coin spend request could not be covered.
    CoinSpendRejected {
        /// Specific reason the spend failed.
        reason: CoinError,
    },
    /// Announces the new number of remaining lives.
    LivesChanged {
        /// Lives remaining after the change.
        lives: u32,
    },
    /// Announces that the match reached its terminal state.
    MatchEnded {
        /// Final result of the match.
        outcome: Outcome,
    },
}

/// Terminal result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every enemy was dealt with before lives ran out.
    Victory,
    /// Lives were exhausted.
    Defeat,
}

impl Outcome {
    /// Reports whether the outcome is a win.
    #[must_use]
    pub const fn is_win(self) -> bool {
        matches!(self, Self::Victory)
    }
}

/// Allegiance tag used to filter spatial queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Faction {
    /// Enemies walking the path.
    Invader,
}

/// Generational index into a slot arena.
///
/// The generation changes every time the slot's instance is released or
/// destroyed, so a key captured during one activation never resolves to a
/// later one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    /// Creates a key from its raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Position of the slot inside the arena.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Activation counter the key was issued for.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Handle addressing one activation of a pooled enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(SlotKey);

impl EnemyId {
    /// Wraps an arena key as an enemy handle.
    #[must_use]
    pub const fn from_slot(slot: SlotKey) -> Self {
        Self(slot)
    }

    /// Retrieves the underlying arena key.
    #[must_use]
    pub const fn slot(&self) -> SlotKey {
        self.0
    }
}

/// Handle addressing one activation of a pooled projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(SlotKey);

impl ProjectileId {
    /// Wraps an arena key as a projectile handle.
    #[must_use]
    pub const fn from_slot(slot: SlotKey) -> Self {
        Self(slot)
    }

    /// Retrieves the underlying arena key.
    #[must_use]
    pub const fn slot(&self) -> SlotKey {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single placement cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// World-space center of the cell for the provided cell size.
    #[must_use]
    pub fn center(self, cell_size: f32) -> Vec2 {
        Vec2::new(
            (self.column as f32 + 0.5) * cell_size,
            (self.row as f32 + 0.5) * cell_size,
        )
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Archetype of the enemy.
    pub kind: EnemyKind,
    /// Current world-space position.
    pub position: Vec2,
    /// Health state of the enemy.
    pub health: Health,
    /// Index of the waypoint the enemy is walking toward.
    pub path_index: usize,
}

/// Read-only snapshot describing the active enemy roster.
///
/// Unlike the tower view, snapshots keep roster order: registration order is
/// the iteration order that breaks distance ties during targeting.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from snapshots already in roster order.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<EnemySnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for the provided enemy.
    #[must_use]
    pub fn get(&self, enemy: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == enemy)
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Archetype currently backing the tower.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// World-space position the tower fires from.
    pub position: Vec2,
    /// Damage dealt by each projectile.
    pub power: u32,
    /// Targeting range in world units.
    pub range: f32,
    /// Delay between shots in seconds.
    pub shoot_delay: f32,
    /// Seconds remaining before the tower may fire again.
    pub cooldown: f32,
    /// Current upgrade level.
    pub level: u32,
    /// Maximum upgrade level.
    pub max_level: u32,
    /// Enemy currently targeted, if any.
    pub target: Option<EnemyId>,
}

/// Read-only snapshot describing all towers placed in the match.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for the provided tower.
    #[must_use]
    pub fn get(&self, tower: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&tower, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }
}

/// Targeting decision computed for a single tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower the decision applies to.
    pub tower: TowerId,
    /// Enemy the tower should track, or `None` when nothing qualifies.
    pub enemy: Option<EnemyId>,
}

/// Firing cadence computed for a single tower with a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerCadence {
    /// Tower the cadence applies to.
    pub tower: TowerId,
    /// Cooldown after subtracting the elapsed time; may be negative.
    pub cooldown: f32,
    /// Indicates whether the tower should attempt a shot this tick.
    pub ready: bool,
}

/// Result of advancing a single projectile for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlightOutcome {
    /// The projectile moved toward its target without reaching it.
    Advanced {
        /// Projectile that moved.
        projectile: ProjectileId,
        /// Position after the move.
        position: Vec2,
        /// Facing angle after the move, in radians.
        heading: f32,
    },
    /// The projectile came within contact distance of its target.
    Impact {
        /// Projectile that struck.
        projectile: ProjectileId,
        /// Enemy that was struck.
        target: EnemyId,
        /// Position of the projectile at contact.
        position: Vec2,
    },
    /// The projectile's target is no longer active.
    TargetLost {
        /// Projectile left without a target.
        projectile: ProjectileId,
    },
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Handle of the projectile.
    pub id: ProjectileId,
    /// Archetype of the projectile.
    pub kind: ProjectileKind,
    /// Current world-space position.
    pub position: Vec2,
    /// Facing angle in radians, measured from the positive x axis.
    pub heading: f32,
    /// Enemy the projectile homes onto, cleared once resolved.
    pub target: Option<EnemyId>,
    /// Damage dealt on impact.
    pub power: u32,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Area damage radius; zero means single-target.
    pub splash_radius: f32,
    /// Contact distance at which the projectile strikes its target.
    pub impact_radius: f32,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell already hosts a tower.
    #[error("cell is already occupied")]
    Occupied,
    /// The requested archetype is missing from the configuration.
    #[error("tower archetype is not configured")]
    UnknownKind,
    /// The player cannot afford the tower.
    #[error("tower costs {required} coins but only {available} are available")]
    InsufficientCoins {
        /// Purchase cost of the tower.
        required: u32,
        /// Balance at the time of the request.
        available: u32,
    },
}

/// Reasons an upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("tower does not exist")]
    MissingTower,
    /// The tower already reached its maximum level.
    #[error("tower is already at its maximum level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("upgrade costs {required} coins but only {available} are available")]
    InsufficientCoins {
        /// Cost of the upgrade.
        required: u32,
        /// Balance at the time of the request.
        available: u32,
    },
    /// The option index does not name a configured option.
    #[error("upgrade option {0} does not exist")]
    OptionOutOfRange(usize),
    /// The option was already applied to this tower.
    #[error("upgrade option {0} was already applied")]
    OptionAlreadyApplied(usize),
    /// The option replaces the tower with an archetype missing from the configuration.
    #[error("replacement tower archetype is not configured")]
    UnknownKind,
}

/// Reasons a sell request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SellError {
    /// No tower with the provided identifier exists.
    #[error("tower does not exist")]
    MissingTower,
}

/// Reasons a coin spend may fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum CoinError {
    /// The balance does not cover the requested amount.
    #[error("requested {required} coins but only {available} are available")]
    Insufficient {
        /// Amount requested.
        required: u32,
        /// Balance at the time of the request.
        available: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, CoinError, EnemyId, EnemyKind, EnemySnapshot, EnemyView, Health, SlotKey,
        TowerId, TowerKind, TowerSnapshot, TowerView, UpgradeError, Vec2,
    };

    fn enemy(index: u32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::from_slot(SlotKey::new(index, 0)),
            kind: EnemyKind::Grunt,
            position: Vec2::ZERO,
            health: Health::new(3),
            path_index: 1,
        }
    }

    fn tower(id: u32) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::Basic,
            cell: CellCoord::new(id, 0),
            position: Vec2::ZERO,
            power: 1,
            range: 1.0,
            shoot_delay: 1.0,
            cooldown: 0.0,
            level: 0,
            max_level: 3,
            target: None,
        }
    }

    #[test]
    fn cell_center_scales_with_cell_size() {
        let cell = CellCoord::new(2, 3);
        assert_eq!(cell.center(1.0), Vec2::new(2.5, 3.5));
        assert_eq!(cell.center(2.0), Vec2::new(5.0, 7.0));
    }

    #[test]
    fn enemy_view_preserves_roster_order() {
        let view = EnemyView::from_snapshots(vec![enemy(5), enemy(1), enemy(3)]);
        let order: Vec<u32> = view
            .iter()
            .map(|snapshot| snapshot.id.slot().index())
            .collect();
        assert_eq!(order, vec![5, 1, 3]);
        assert!(view.get(EnemyId::from_slot(SlotKey::new(1, 0))).is_some());
        assert!(view.get(EnemyId::from_slot(SlotKey::new(1, 1))).is_none());
    }

    #[test]
    fn tower_view_sorts_and_looks_up_by_id() {
        let view = TowerView::from_snapshots(vec![tower(4), tower(2), tower(9)]);
        let order: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(order, vec![2, 4, 9]);
        assert_eq!(
            view.get(TowerId::new(9)).map(|s| s.cell),
            Some(CellCoord::new(9, 0))
        );
        assert!(view.get(TowerId::new(3)).is_none());
    }

    #[test]
    fn error_messages_name_the_shortfall() {
        let coin = CoinError::Insufficient {
            required: 10,
            available: 4,
        };
        assert_eq!(
            coin.to_string(),
            "requested 10 coins but only 4 are available"
        );
        assert_eq!(
            UpgradeError::OptionAlreadyApplied(2).to_string(),
            "upgrade option 2 was already applied"
        );
    }
}
