#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative match state for Rampart.
//!
//! The world owns every enemy, tower and projectile of a match together with
//! the lives, coins and win bookkeeping. It mutates only through [`apply`] and
//! exposes read-only access through [`query`].

mod enemies;
pub mod pool;
mod projectiles;
mod towers;

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use log::{debug, error, info, trace, warn};
use rampart_core::{
    CellCoord, CoinError, CoinPurse, Command, DamageOutcome, EnemyId, EnemyKind, Event, Faction,
    FlightOutcome, MatchConfig, Outcome, PlacementError, ProjectileId, ProjectileKind, SellError,
    TowerCadence, TowerId, TowerKind, TowerTarget, UpgradeError, Vec2, MAX_UPGRADE_OPTIONS,
};
use rampart_system_projectile_flight::ProjectileFlight;
use rampart_system_spatial_query::{SpatialEntry, SpatialQuery};
use rampart_system_tower_combat::TowerCombat;
use rampart_system_tower_targeting::TowerTargeting;

use enemies::{Enemy, Stride};
use pool::ObjectPool;
use projectiles::Projectile;
use towers::{TowerRegistry, TowerState};

/// Represents the authoritative state of a single match.
#[derive(Debug)]
pub struct World {
    config: MatchConfig,
    path: Arc<[Vec2]>,
    enemies: ObjectPool<EnemyKind, Enemy>,
    roster: Vec<EnemyId>,
    projectiles: ObjectPool<ProjectileKind, Projectile>,
    towers: TowerRegistry,
    occupancy: BTreeSet<CellCoord>,
    purse: CoinPurse,
    lives: u32,
    killed: u32,
    leaked: u32,
    total_enemies: u32,
    all_spawned: bool,
    outcome: Option<Outcome>,
    systems: Systems,
}

#[derive(Debug)]
struct Systems {
    targeting: TowerTargeting,
    combat: TowerCombat,
    flight: ProjectileFlight,
    targets: Vec<TowerTarget>,
    cadence: Vec<TowerCadence>,
    flights: Vec<FlightOutcome>,
    roster_copy: Vec<EnemyId>,
}

impl Systems {
    fn new() -> Self {
        Self {
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            flight: ProjectileFlight::new(),
            targets: Vec::new(),
            cadence: Vec::new(),
            flights: Vec::new(),
            roster_copy: Vec::new(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl World {
    /// Creates a match governed by the provided rules and archetype catalogs.
    ///
    /// An inconsistent configuration is reported but still accepted; the
    /// affected towers never fire and enemies without a walkable path stay put.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        if let Err(problem) = config.validate() {
            warn!("match configuration is inconsistent: {problem}");
        }

        let mut world = Self {
            path: config.path.iter().copied().collect(),
            enemies: ObjectPool::new(),
            roster: Vec::new(),
            projectiles: ObjectPool::new(),
            towers: TowerRegistry::new(),
            occupancy: BTreeSet::new(),
            purse: CoinPurse::new(config.start_coins),
            lives: config.max_lives,
            killed: 0,
            leaked: 0,
            total_enemies: config.total_enemies,
            all_spawned: false,
            outcome: None,
            systems: Systems::new(),
            config,
        };
        world.prewarm_pools();
        world
    }

    fn prewarm_pools(&mut self) {
        for archetype in &self.config.enemies {
            if archetype.prewarm == 0 {
                continue;
            }
            if !archetype.pooled {
                warn!(
                    "{:?} enemies are not pooled; prewarm ignored",
                    archetype.kind
                );
                continue;
            }
            let count = archetype.prewarm as usize;
            self.enemies
                .prewarm(archetype.kind, count, || Enemy::from_archetype(archetype));
            debug!("prewarmed {count} {:?} enemies", archetype.kind);
        }

        for archetype in &self.config.projectiles {
            if archetype.prewarm == 0 {
                continue;
            }
            let count = archetype.prewarm as usize;
            let (kind, radius) = (archetype.kind, archetype.impact_radius);
            self.projectiles
                .prewarm(kind, count, || Projectile::new(kind, radius));
            debug!("prewarmed {count} {kind:?} projectiles");
        }
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            debug!("ignoring {kind:?} spawn: match is over");
            return;
        }

        let Some(archetype) = self.config.enemy(kind) else {
            error!("enemy archetype {kind:?} is not configured");
            return;
        };

        let start = self.path.first().copied().unwrap_or(Vec2::ZERO);
        let slot = self
            .enemies
            .acquire(kind, start, || Enemy::from_archetype(archetype));
        let enemy = EnemyId::from_slot(slot);
        out_events.push(Event::EnemySpawned { enemy, kind });
        self.register_enemy(enemy, out_events);
    }

    fn register_enemy(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        let route = Arc::clone(&self.path);
        let Some(instance) = self.enemies.get_mut(enemy.slot()) else {
            warn!(
                "cannot register {enemy:?}: handle does not address an active enemy"
            );
            return;
        };

        if instance.is_registered() {
            trace!("{enemy:?} is already registered");
            return;
        }

        if !instance.register(route) {
            warn!(
                "{enemy:?} registered on a path with fewer than two waypoints; it will not move"
            );
        }

        let position = instance.position;
        self.roster.push(enemy);
        debug!("registered {enemy:?} at {position}");
        out_events.push(Event::EnemyRegistered { enemy, position });
    }

    fn place_tower(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), PlacementError> {
        let archetype = self
            .config
            .tower(kind)
            .ok_or(PlacementError::UnknownKind)?;
        if self.occupancy.contains(&cell) {
            return Err(PlacementError::Occupied);
        }

        let coins = self.purse.spend(archetype.purchase_cost).map_err(
            |CoinError::Insufficient {
                 required,
                 available,
             }| PlacementError::InsufficientCoins {
                required,
                available,
            },
        )?;

        if archetype.projectile.is_none() {
            warn!(
                "{kind:?} tower has no projectile archetype bound; it will never fire"
            );
        }

        let cell_size = self.config.cell_size;
        let tower = self
            .towers
            .insert(|id| TowerState::new(id, cell, cell_size, archetype));
        let _ = self.occupancy.insert(cell);

        info!("placed {kind:?} tower {} at {cell:?}", tower.get());
        out_events.push(Event::CoinsChanged { coins });
        out_events.push(Event::TowerPlaced { tower, kind, cell });
        Ok(())
    }

    fn upgrade_tower(
        &mut self,
        tower: TowerId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), UpgradeError> {
        let state = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)?;
        let archetype = self
            .config
            .tower(state.kind)
            .ok_or(UpgradeError::UnknownKind)?;
        let cost = state
            .upgrade_cost(archetype)
            .ok_or(UpgradeError::MaxLevel)?;

        let coins = self.purse.spend(cost).map_err(
            |CoinError::Insufficient {
                 required,
                 available,
             }| UpgradeError::InsufficientCoins {
                required,
                available,
            },
        )?;
        state.apply_level_upgrade(archetype, self.config.min_shoot_delay);

        info!(
            "tower {} upgraded to level {} for {cost} coins",
            tower.get(),
            state.level
        );
        out_events.push(Event::CoinsChanged { coins });
        out_events.push(Event::TowerUpgraded {
            tower,
            level: state.level,
            cost,
        });
        Ok(())
    }

    fn apply_upgrade_option(
        &mut self,
        tower: TowerId,
        option: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<(), UpgradeError> {
        let state = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)?;
        let archetype = self
            .config
            .tower(state.kind)
            .ok_or(UpgradeError::UnknownKind)?;
        // Only the first MAX_UPGRADE_OPTIONS entries can be marked as applied.
        let upgrade = archetype
            .options
            .get(option)
            .filter(|_| option < MAX_UPGRADE_OPTIONS)
            .ok_or(UpgradeError::OptionOutOfRange(option))?;
        if state.option_applied(option) {
            return Err(UpgradeError::OptionAlreadyApplied(option));
        }

        let replacement = match upgrade.replace_with {
            Some(kind) => Some(self.config.tower(kind).ok_or(UpgradeError::UnknownKind)?),
            None => None,
        };

        let coins = self.purse.spend(upgrade.cost).map_err(
            |CoinError::Insufficient {
                 required,
                 available,
             }| UpgradeError::InsufficientCoins {
                required,
                available,
            },
        )?;

        match replacement {
            Some(replacement) => {
                info!(
                    "tower {} converted from {:?} to {:?} by \"{}\"",
                    tower.get(),
                    state.kind,
                    replacement.kind,
                    upgrade.name
                );
                state.reset_to(replacement);
            }
            None => {
                info!("tower {} received \"{}\"", tower.get(), upgrade.name);
                state.apply_option(option, upgrade, self.config.min_shoot_delay);
            }
        }

        out_events.push(Event::CoinsChanged { coins });
        out_events.push(Event::UpgradeOptionApplied {
            tower,
            option,
            kind: state.kind,
        });
        Ok(())
    }

    fn sell_tower(&mut self, tower: TowerId, out_events: &mut Vec<Event>) -> Result<(), SellError> {
        let state = self.towers.remove(tower).ok_or(SellError::MissingTower)?;
        let _ = self.occupancy.remove(&state.cell);
        let refund = state.sell_price();
        let coins = self.purse.deposit(refund);

        info!("sold tower {} for {refund} coins", tower.get());
        out_events.push(Event::CoinsChanged { coins });
        out_events.push(Event::TowerSold {
            tower,
            cell: state.cell,
            refund,
        });
        Ok(())
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            trace!("tick skipped: match is over");
            return;
        }

        out_events.push(Event::TimeAdvanced { dt });

        let seconds = dt.as_secs_f32();
        self.advance_towers(seconds, out_events);
        self.advance_projectiles(seconds, out_events);
        self.advance_enemies(seconds, out_events);
        self.sweep_roster();
        self.evaluate_victory(out_events);
    }

    fn advance_towers(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let towers = query::tower_view(self);
        let enemies = query::enemy_view(self);
        let systems = &mut self.systems;

        systems
            .targeting
            .handle(&towers, &enemies, &mut systems.targets);
        for decision in &systems.targets {
            let Some(state) = self.towers.get_mut(decision.tower) else {
                continue;
            };
            if state.target == decision.enemy {
                continue;
            }

            state.target = decision.enemy;
            match decision.enemy {
                Some(enemy) => out_events.push(Event::TargetAcquired {
                    tower: decision.tower,
                    enemy,
                }),
                None => out_events.push(Event::TargetLost {
                    tower: decision.tower,
                }),
            }
        }

        systems.cadence.clear();
        systems
            .combat
            .handle(dt, &towers, &systems.targets, &mut systems.cadence);
        for cadence in &systems.cadence {
            let Some(state) = self.towers.get_mut(cadence.tower) else {
                continue;
            };
            state.cooldown = cadence.cooldown;
            if !cadence.ready {
                continue;
            }
            if let Some(target) = state.target {
                fire(
                    &self.config,
                    &mut self.projectiles,
                    state,
                    target,
                    out_events,
                );
            }
        }
    }

    fn advance_projectiles(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let snapshots = query::projectile_view(self);
        if snapshots.is_empty() {
            return;
        }

        let enemies = query::enemy_view(self);
        let systems = &mut self.systems;
        systems
            .flight
            .handle(dt, &snapshots, &enemies, &mut systems.flights);

        let outcomes = std::mem::take(&mut systems.flights);
        for outcome in &outcomes {
            match *outcome {
                FlightOutcome::Advanced {
                    projectile,
                    position,
                    heading,
                } => {
                    if let Some(instance) = self.projectiles.get_mut(projectile.slot()) {
                        instance.position = position;
                        instance.heading = heading;
                    }
                }
                FlightOutcome::Impact {
                    projectile,
                    target,
                    position,
                } => self.impact(projectile, target, position, out_events),
                FlightOutcome::TargetLost { projectile } => {
                    self.expire_projectile(projectile, out_events);
                }
            }
        }
        self.systems.flights = outcomes;
    }

    fn impact(
        &mut self,
        projectile: ProjectileId,
        target: EnemyId,
        position: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let Some((kind, power, splash_radius)) = self
            .projectiles
            .get(projectile.slot())
            .map(|instance| (instance.kind, instance.power, instance.splash_radius))
        else {
            return;
        };

        // An earlier projectile may have killed the target during this tick.
        if !self.enemies.is_live(target.slot()) {
            self.expire_projectile(projectile, out_events);
            return;
        }

        let _ = self.projectiles.release(kind, projectile.slot());
        let splash = splash_radius > 0.0;
        out_events.push(Event::ProjectileImpacted {
            projectile,
            target,
            position,
            splash,
        });

        if splash {
            self.splash(position, splash_radius, power, out_events);
        } else {
            self.damage_enemy(target, power, out_events);
        }
    }

    fn expire_projectile(&mut self, projectile: ProjectileId, out_events: &mut Vec<Event>) {
        let Some(kind) = self
            .projectiles
            .get(projectile.slot())
            .map(|instance| instance.kind)
        else {
            return;
        };

        if self.projectiles.release(kind, projectile.slot()) {
            trace!("{projectile:?} expired without effect");
            out_events.push(Event::ProjectileExpired { projectile });
        }
    }

    /// Damages every active enemy within `radius` of `center`.
    ///
    /// Victims are collected before any damage is dealt, so enemies dying
    /// mid-sweep never disturb the iteration.
    fn splash(&mut self, center: Vec2, radius: f32, power: u32, out_events: &mut Vec<Event>) {
        let entries: Vec<SpatialEntry<EnemyId>> = self
            .roster
            .iter()
            .filter_map(|enemy| {
                self.enemies
                    .get(enemy.slot())
                    .map(|instance| SpatialEntry {
                        id: *enemy,
                        position: instance.position,
                        faction: Faction::Invader,
                    })
            })
            .collect();
        let victims: Vec<EnemyId> = SpatialQuery::new(&entries)
            .within_radius(center, radius, Faction::Invader)
            .collect();

        debug!("splash at {center} caught {} enemies", victims.len());
        for enemy in victims {
            self.damage_enemy(enemy, power, out_events);
        }
    }

    fn damage_enemy(&mut self, enemy: EnemyId, amount: u32, out_events: &mut Vec<Event>) {
        let Some(instance) = self.enemies.get_mut(enemy.slot()) else {
            return;
        };

        match instance.health.take_damage(amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Wounded { remaining } => out_events.push(Event::EnemyDamaged {
                enemy,
                amount,
                remaining,
            }),
            DamageOutcome::Killed => {
                let reward = instance.coin_reward;
                self.retire_enemy(enemy);
                self.killed = self.killed.saturating_add(1);
                let coins = self.purse.deposit(reward);

                debug!("{enemy:?} killed, {reward} coins awarded");
                out_events.push(Event::EnemyKilled { enemy, reward });
                out_events.push(Event::CoinsChanged { coins });
            }
        }
    }

    fn advance_enemies(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let epsilon = self.config.arrival_epsilon;
        let mut roster = std::mem::take(&mut self.systems.roster_copy);
        roster.clear();
        roster.extend_from_slice(&self.roster);

        for enemy in &roster {
            if self.outcome.is_some() {
                break;
            }

            let Some(instance) = self.enemies.get_mut(enemy.slot()) else {
                continue;
            };
            if instance.stride(dt, epsilon) == Stride::ReachedGoal {
                self.leak(*enemy, out_events);
            }
        }

        self.systems.roster_copy = roster;
    }

    fn leak(&mut self, enemy: EnemyId, out_events: &mut Vec<Event>) {
        self.retire_enemy(enemy);
        self.leaked = self.leaked.saturating_add(1);
        self.lives = self.lives.saturating_sub(1);

        debug!("{enemy:?} reached the goal, {} lives left", self.lives);
        out_events.push(Event::EnemyReachedGoal { enemy });
        out_events.push(Event::LivesChanged { lives: self.lives });

        if self.lives == 0 {
            self.finish(Outcome::Defeat, out_events);
        }
    }

    /// Returns a dead or leaked enemy to its pool, or drops it when unpooled.
    fn retire_enemy(&mut self, enemy: EnemyId) {
        let Some((kind, pooled)) = self
            .enemies
            .get(enemy.slot())
            .map(|instance| (instance.kind, instance.pooled))
        else {
            return;
        };

        if pooled {
            let _ = self.enemies.release(kind, enemy.slot());
        } else {
            let _ = self.enemies.destroy(enemy.slot());
        }
    }

    fn sweep_roster(&mut self) {
        let enemies = &self.enemies;
        self.roster.retain(|enemy| enemies.is_live(enemy.slot()));
    }

    fn has_active_enemies(&self) -> bool {
        self.roster
            .iter()
            .any(|enemy| self.enemies.is_live(enemy.slot()))
    }

    fn evaluate_victory(&mut self, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }

        let cleared = self.all_spawned && !self.has_active_enemies();
        let quota_met = self.total_enemies > 0 && self.killed >= self.total_enemies;
        if cleared || quota_met {
            self.finish(Outcome::Victory, out_events);
        }
    }

    fn finish(&mut self, outcome: Outcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }

        self.outcome = Some(outcome);
        info!(
            "match ended in {outcome:?}: {} killed, {} leaked, {} lives left",
            self.killed, self.leaked, self.lives
        );
        out_events.push(Event::MatchEnded { outcome });
    }
}

/// Launches a projectile from `tower` at `target` and restarts the tower's cooldown.
///
/// A tower without a usable projectile archetype keeps its cooldown expired
/// and tries again on the next tick.
fn fire(
    config: &MatchConfig,
    projectiles: &mut ObjectPool<ProjectileKind, Projectile>,
    tower: &mut TowerState,
    target: EnemyId,
    out_events: &mut Vec<Event>,
) {
    let Some(kind) = tower.projectile else {
        debug!(
            "tower {} is ready but has no projectile bound",
            tower.id.get()
        );
        return;
    };
    let Some(archetype) = config.projectile(kind) else {
        error!("projectile archetype {kind:?} is not configured");
        return;
    };

    let slot = projectiles.acquire(kind, tower.position, || {
        Projectile::new(kind, archetype.impact_radius)
    });
    if let Some(instance) = projectiles.get_mut(slot) {
        instance.arm(tower, target);
    }
    tower.cooldown = tower.shoot_delay;

    let projectile = ProjectileId::from_slot(slot);
    trace!(
        "tower {} fired {projectile:?} at {target:?}",
        tower.id.get()
    );
    out_events.push(Event::ProjectileFired {
        tower: tower.id,
        projectile,
        target,
    });
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigurePath { waypoints } => {
            if waypoints.len() < 2 {
                warn!(
                    "path has {} waypoint(s); enemies need at least two to move",
                    waypoints.len()
                );
            }
            world.path = waypoints.into();
        }
        Command::SetTotalEnemies { count } => {
            world.total_enemies = count;
        }
        Command::SpawnEnemy { kind } => world.spawn_enemy(kind, out_events),
        Command::RegisterEnemy { enemy } => world.register_enemy(enemy, out_events),
        Command::SetAllEnemiesSpawned => {
            world.all_spawned = true;
            world.evaluate_victory(out_events);
        }
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PlaceTower { kind, cell } => {
            if let Err(reason) = world.place_tower(kind, cell, out_events) {
                debug!("placement of {kind:?} at {cell:?} rejected: {reason}");
                out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            }
        }
        Command::UpgradeTower { tower } => {
            if let Err(reason) = world.upgrade_tower(tower, out_events) {
                debug!("upgrade of tower {} rejected: {reason}", tower.get());
                out_events.push(Event::TowerUpgradeRejected { tower, reason });
            }
        }
        Command::ApplyUpgradeOption { tower, option } => {
            if let Err(reason) = world.apply_upgrade_option(tower, option, out_events) {
                debug!(
                    "option {option} for tower {} rejected: {reason}",
                    tower.get()
                );
                out_events.push(Event::TowerUpgradeRejected { tower, reason });
            }
        }
        Command::SellTower { tower } => {
            if let Err(reason) = world.sell_tower(tower, out_events) {
                debug!("sale of tower {} rejected: {reason}", tower.get());
                out_events.push(Event::TowerSaleRejected { tower, reason });
            }
        }
        Command::SpendCoins { amount } => match world.purse.spend(amount) {
            Ok(coins) => out_events.push(Event::CoinsChanged { coins }),
            Err(reason) => out_events.push(Event::CoinSpendRejected { reason }),
        },
        Command::AddCoins { amount } => {
            let coins = world.purse.deposit(amount);
            out_events.push(Event::CoinsChanged { coins });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use rampart_core::{
        CellCoord, EnemyId, EnemyKind, EnemyView, MatchConfig, Outcome, ProjectileId,
        ProjectileKind, ProjectileSnapshot, TowerId, TowerKind, TowerView, Vec2,
    };

    /// Current coin balance.
    #[must_use]
    pub fn coins(world: &World) -> u32 {
        world.purse.balance()
    }

    /// Lives remaining.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Lives the match started with.
    #[must_use]
    pub fn max_lives(world: &World) -> u32 {
        world.config.max_lives
    }

    /// Number of enemies killed by towers.
    #[must_use]
    pub fn killed_count(world: &World) -> u32 {
        world.killed
    }

    /// Number of enemies that reached the goal.
    #[must_use]
    pub fn leaked_count(world: &World) -> u32 {
        world.leaked
    }

    /// Number of enemies the match expects to spawn in total.
    #[must_use]
    pub fn total_enemies(world: &World) -> u32 {
        world.total_enemies
    }

    /// Reports whether the spawner announced that no more enemies will come.
    #[must_use]
    pub fn all_enemies_spawned(world: &World) -> bool {
        world.all_spawned
    }

    /// Reports whether the match reached a terminal state.
    #[must_use]
    pub fn is_over(world: &World) -> bool {
        world.outcome.is_some()
    }

    /// Terminal result of the match, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<Outcome> {
        world.outcome
    }

    /// Reports whether the match ended in victory.
    #[must_use]
    pub fn is_win(world: &World) -> bool {
        world.outcome.is_some_and(Outcome::is_win)
    }

    /// Rules and archetype catalogs governing the match.
    #[must_use]
    pub fn config(world: &World) -> &MatchConfig {
        &world.config
    }

    /// Waypoints walked by newly registered enemies.
    #[must_use]
    pub fn path(world: &World) -> &[Vec2] {
        &world.path
    }

    /// Captures a read-only view of the towers placed in the match.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Captures a read-only view of the active enemy roster in registration order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .roster
                .iter()
                .filter_map(|enemy| {
                    world
                        .enemies
                        .get(enemy.slot())
                        .map(|instance| instance.snapshot(*enemy))
                })
                .collect(),
        )
    }

    /// Captures every projectile currently in flight.
    #[must_use]
    pub fn projectile_view(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter_active()
            .map(|(slot, projectile)| projectile.snapshot(ProjectileId::from_slot(slot)))
            .collect()
    }

    /// Purchase cost of a tower archetype, if configured.
    #[must_use]
    pub fn tower_cost(world: &World, kind: TowerKind) -> Option<u32> {
        world.config.tower(kind).map(|tower| tower.purchase_cost)
    }

    /// Cost of the next level upgrade for a tower; `None` when missing or maxed out.
    #[must_use]
    pub fn upgrade_cost(world: &World, tower: TowerId) -> Option<u32> {
        let state = world.towers.get(tower)?;
        let archetype = world.config.tower(state.kind)?;
        state.upgrade_cost(archetype)
    }

    /// Coins refunded if the tower were sold now.
    #[must_use]
    pub fn sell_price(world: &World, tower: TowerId) -> Option<u32> {
        world.towers.get(tower).map(|state| state.sell_price())
    }

    /// Remaining health of an active enemy as a fraction in `[0, 1]`.
    #[must_use]
    pub fn enemy_health_percent(world: &World, enemy: EnemyId) -> Option<f32> {
        world
            .enemies
            .get(enemy.slot())
            .map(|instance| instance.health.percent())
    }

    /// Reports whether a tower occupies the cell.
    #[must_use]
    pub fn is_cell_occupied(world: &World, cell: CellCoord) -> bool {
        world.occupancy.contains(&cell)
    }

    /// Number of deactivated enemies of `kind` parked for reuse.
    #[must_use]
    pub fn pooled_enemies(world: &World, kind: EnemyKind) -> usize {
        world.enemies.free_count(kind)
    }

    /// Number of deactivated projectiles of `kind` parked for reuse.
    #[must_use]
    pub fn pooled_projectiles(world: &World, kind: ProjectileKind) -> usize {
        world.projectiles.free_count(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::{EnemyArchetype, ProjectileArchetype, TowerArchetype, UpgradeOption};

    const HALF_SECOND: Duration = Duration::from_millis(500);
    const ONE_SECOND: Duration = Duration::from_secs(1);

    fn straight_path_config() -> MatchConfig {
        MatchConfig {
            start_coins: 100,
            path: vec![Vec2::new(0.0, 0.5), Vec2::new(20.0, 0.5)],
            ..MatchConfig::default()
        }
    }

    fn spawn(world: &mut World, kind: EnemyKind) -> EnemyId {
        let mut events = Vec::new();
        apply(world, Command::SpawnEnemy { kind }, &mut events);
        events
            .iter()
            .find_map(|event| match event {
                Event::EnemySpawned { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .expect("spawn emits EnemySpawned")
    }

    fn place(world: &mut World, kind: TowerKind, cell: CellCoord) -> TowerId {
        let mut events = Vec::new();
        apply(world, Command::PlaceTower { kind, cell }, &mut events);
        events
            .iter()
            .find_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(*tower),
                _ => None,
            })
            .expect("placement succeeds")
    }

    fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, Command::Tick { dt }, &mut events);
        events
    }

    #[test]
    fn overkill_pays_the_reward_exactly_once() {
        let mut config = straight_path_config();
        config.enemies = vec![EnemyArchetype {
            max_health: 10,
            coin_reward: 3,
            ..EnemyArchetype::default()
        }];
        let mut world = World::new(config);
        let enemy = spawn(&mut world, EnemyKind::Grunt);

        let mut events = Vec::new();
        world.damage_enemy(enemy, 4, &mut events);
        world.damage_enemy(enemy, 7, &mut events);
        world.damage_enemy(enemy, 7, &mut events);

        assert_eq!(
            events,
            vec![
                Event::EnemyDamaged {
                    enemy,
                    amount: 4,
                    remaining: 6
                },
                Event::EnemyKilled { enemy, reward: 3 },
                Event::CoinsChanged { coins: 103 },
            ]
        );
        assert_eq!(query::killed_count(&world), 1);
        assert_eq!(query::coins(&world), 103);
        assert_eq!(query::enemy_health_percent(&world, enemy), None);
    }

    #[test]
    fn tower_fires_twice_over_three_half_second_ticks() {
        let mut config = straight_path_config();
        config.enemies = vec![EnemyArchetype {
            max_health: 100,
            move_speed: 0.01,
            ..EnemyArchetype::default()
        }];
        config.towers = vec![TowerArchetype {
            range: 5.0,
            shoot_delay: 1.0,
            projectile_speed: 0.01,
            projectile: Some(ProjectileKind::Arrow),
            ..TowerArchetype::default()
        }];
        let mut world = World::new(config);
        let _ = place(&mut world, TowerKind::Basic, CellCoord::new(0, 1));
        let _ = spawn(&mut world, EnemyKind::Grunt);

        let shots = (0..3)
            .flat_map(|_| tick(&mut world, HALF_SECOND))
            .filter(|event| matches!(event, Event::ProjectileFired { .. }))
            .count();
        assert_eq!(shots, 2);
    }

    #[test]
    fn classic_upgrade_charges_geometric_cost() {
        let mut world = World::new(straight_path_config());
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(3, 3));
        assert_eq!(query::upgrade_cost(&world, tower), Some(10));

        let mut events = Vec::new();
        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        assert_eq!(
            events,
            vec![
                Event::CoinsChanged { coins: 80 },
                Event::TowerUpgraded {
                    tower,
                    level: 1,
                    cost: 10
                },
            ]
        );
        assert_eq!(query::upgrade_cost(&world, tower), Some(17));

        let snapshot = *query::tower_view(&world)
            .get(tower)
            .expect("tower is placed");
        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.power, 2);
        assert!((snapshot.shoot_delay - 0.9).abs() < 1e-6);
    }

    #[test]
    fn upgrade_without_coins_changes_nothing() {
        let mut config = straight_path_config();
        config.start_coins = 15;
        let mut world = World::new(config);
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(3, 3));

        let mut events = Vec::new();
        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        assert_eq!(
            events,
            vec![Event::TowerUpgradeRejected {
                tower,
                reason: UpgradeError::InsufficientCoins {
                    required: 10,
                    available: 5
                },
            }]
        );
        assert_eq!(query::coins(&world), 5);
        assert_eq!(
            query::tower_view(&world).get(tower).map(|t| t.level),
            Some(0)
        );
    }

    #[test]
    fn leaking_enemy_costs_a_life_without_counting_as_a_kill() {
        let mut config = straight_path_config();
        config.path = vec![Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.0)];
        let mut world = World::new(config);
        let enemy = spawn(&mut world, EnemyKind::Grunt);

        let first = tick(&mut world, ONE_SECOND);
        assert!(!first
            .iter()
            .any(|event| matches!(event, Event::EnemyReachedGoal { .. })));

        let second = tick(&mut world, ONE_SECOND);
        assert!(second.contains(&Event::EnemyReachedGoal { enemy }));
        assert!(second.contains(&Event::LivesChanged { lives: 2 }));
        assert_eq!(query::lives(&world), 2);
        assert_eq!(query::killed_count(&world), 0);
        assert_eq!(query::leaked_count(&world), 1);
        assert!(query::enemy_view(&world).is_empty());
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Grunt), 1);
    }

    #[test]
    fn completing_the_spawn_plan_with_no_enemies_wins_immediately() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(&mut world, Command::SetAllEnemiesSpawned, &mut events);

        assert_eq!(
            events,
            vec![Event::MatchEnded {
                outcome: Outcome::Victory
            }]
        );
        assert!(query::is_over(&world));
        assert!(query::is_win(&world));
        assert!(tick(&mut world, ONE_SECOND).is_empty());
    }

    #[test]
    fn splash_damages_only_enemies_inside_the_radius() {
        let mut world = World::new(straight_path_config());
        let enemies: Vec<EnemyId> = (0..3)
            .map(|_| spawn(&mut world, EnemyKind::Grunt))
            .collect();
        for (enemy, x) in enemies.iter().zip([0.0, 1.5, 3.0]) {
            let instance = world
                .enemies
                .get_mut(enemy.slot())
                .expect("spawned enemy is active");
            instance.position = Vec2::new(x, 0.0);
        }

        let mut events = Vec::new();
        world.splash(Vec2::ZERO, 2.0, 1, &mut events);

        let damaged: Vec<EnemyId> = events
            .iter()
            .filter_map(|event| match event {
                Event::EnemyDamaged { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        assert_eq!(damaged, vec![enemies[0], enemies[1]]);
    }

    #[test]
    fn registering_twice_keeps_a_single_roster_entry() {
        let mut world = World::new(straight_path_config());
        let enemy = spawn(&mut world, EnemyKind::Grunt);

        let mut events = Vec::new();
        apply(&mut world, Command::RegisterEnemy { enemy }, &mut events);
        assert!(events.is_empty());
        assert_eq!(query::enemy_view(&world).len(), 1);
    }

    #[test]
    fn stale_handles_are_not_registered() {
        let mut world = World::new(straight_path_config());
        let enemy = spawn(&mut world, EnemyKind::Grunt);
        world.retire_enemy(enemy);
        world.sweep_roster();

        let mut events = Vec::new();
        apply(&mut world, Command::RegisterEnemy { enemy }, &mut events);
        assert!(events.is_empty());
        assert!(query::enemy_view(&world).is_empty());
    }

    #[test]
    fn pooled_enemies_are_reused_under_a_new_handle() {
        let mut world = World::new(straight_path_config());
        let first = spawn(&mut world, EnemyKind::Runner);
        let mut events = Vec::new();
        world.damage_enemy(first, 10, &mut events);
        world.sweep_roster();
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Runner), 1);

        let second = spawn(&mut world, EnemyKind::Runner);
        assert_eq!(second.slot().index(), first.slot().index());
        assert_ne!(second, first);
        assert_eq!(query::enemy_health_percent(&world, second), Some(1.0));
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Runner), 0);
    }

    #[test]
    fn unpooled_enemies_are_destroyed() {
        let mut config = straight_path_config();
        config.enemies = vec![EnemyArchetype {
            pooled: false,
            ..EnemyArchetype::default()
        }];
        let mut world = World::new(config);
        let enemy = spawn(&mut world, EnemyKind::Grunt);
        let mut events = Vec::new();
        world.damage_enemy(enemy, 1, &mut events);

        assert_eq!(query::pooled_enemies(&world, EnemyKind::Grunt), 0);
        assert_eq!(query::enemy_health_percent(&world, enemy), None);
    }

    #[test]
    fn last_life_lost_ends_the_match_in_defeat() {
        let mut config = straight_path_config();
        config.max_lives = 1;
        config.path = vec![Vec2::ZERO, Vec2::new(0.05, 0.0)];
        let mut world = World::new(config);
        let _ = spawn(&mut world, EnemyKind::Grunt);
        let _ = spawn(&mut world, EnemyKind::Grunt);

        let events = tick(&mut world, ONE_SECOND);

        let leaks = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyReachedGoal { .. }))
            .count();
        assert_eq!(leaks, 1);
        assert_eq!(
            events.last(),
            Some(&Event::MatchEnded {
                outcome: Outcome::Defeat
            })
        );
        assert_eq!(query::outcome(&world), Some(Outcome::Defeat));
        assert!(tick(&mut world, ONE_SECOND).is_empty());
    }

    #[test]
    fn placement_rejections_leave_coins_untouched() {
        let mut config = straight_path_config();
        config.start_coins = 12;
        let mut world = World::new(config);
        let cell = CellCoord::new(2, 2);
        let _ = place(&mut world, TowerKind::Basic, cell);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Sniper,
                cell: CellCoord::new(4, 4),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Basic,
                cell: CellCoord::new(5, 5),
            },
            &mut events,
        );

        let reasons: Vec<PlacementError> = events
            .iter()
            .filter_map(|event| match event {
                Event::TowerPlacementRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                PlacementError::Occupied,
                PlacementError::UnknownKind,
                PlacementError::InsufficientCoins {
                    required: 10,
                    available: 2
                },
            ]
        );
        assert_eq!(query::coins(&world), 2);
    }

    #[test]
    fn selling_refunds_half_and_frees_the_cell() {
        let mut world = World::new(straight_path_config());
        let cell = CellCoord::new(1, 4);
        let tower = place(&mut world, TowerKind::Basic, cell);
        assert_eq!(query::sell_price(&world, tower), Some(5));

        let mut events = Vec::new();
        apply(&mut world, Command::SellTower { tower }, &mut events);
        apply(&mut world, Command::SellTower { tower }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::CoinsChanged { coins: 95 },
                Event::TowerSold {
                    tower,
                    cell,
                    refund: 5
                },
                Event::TowerSaleRejected {
                    tower,
                    reason: SellError::MissingTower
                },
            ]
        );
        assert!(!query::is_cell_occupied(&world, cell));
        let _ = place(&mut world, TowerKind::Basic, cell);
    }

    #[test]
    fn upgrade_options_apply_once_and_may_convert_the_tower() {
        let mut world = World::new(straight_path_config());
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(0, 2));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplyUpgradeOption { tower, option: 0 },
            &mut events,
        );
        apply(
            &mut world,
            Command::ApplyUpgradeOption { tower, option: 0 },
            &mut events,
        );
        apply(
            &mut world,
            Command::ApplyUpgradeOption { tower, option: 7 },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::CoinsChanged { coins: 82 },
                Event::UpgradeOptionApplied {
                    tower,
                    option: 0,
                    kind: TowerKind::Basic
                },
                Event::TowerUpgradeRejected {
                    tower,
                    reason: UpgradeError::OptionAlreadyApplied(0)
                },
                Event::TowerUpgradeRejected {
                    tower,
                    reason: UpgradeError::OptionOutOfRange(7)
                },
            ]
        );
        assert_eq!(
            query::tower_view(&world).get(tower).map(|t| t.power),
            Some(2)
        );

        events.clear();
        apply(
            &mut world,
            Command::ApplyUpgradeOption { tower, option: 1 },
            &mut events,
        );
        assert_eq!(
            events.last(),
            Some(&Event::UpgradeOptionApplied {
                tower,
                option: 1,
                kind: TowerKind::Cannon
            })
        );
        let snapshot = *query::tower_view(&world).get(tower).expect("tower survives");
        assert_eq!(snapshot.kind, TowerKind::Cannon);
        assert_eq!(snapshot.cell, CellCoord::new(0, 2));
        assert_eq!(snapshot.level, 0);
    }

    #[test]
    fn option_with_unknown_replacement_is_rejected_before_charging() {
        let mut config = straight_path_config();
        config.towers = vec![TowerArchetype {
            projectile: Some(ProjectileKind::Arrow),
            options: vec![UpgradeOption {
                name: "Bolt thrower".to_owned(),
                cost: 1,
                replace_with: Some(TowerKind::Sniper),
                ..UpgradeOption::default()
            }],
            ..TowerArchetype::default()
        }];
        let mut world = World::new(config);
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(0, 2));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplyUpgradeOption { tower, option: 0 },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::TowerUpgradeRejected {
                tower,
                reason: UpgradeError::UnknownKind
            }]
        );
        assert_eq!(query::coins(&world), 90);
    }

    #[test]
    fn options_beyond_the_tracked_slots_are_rejected() {
        let mut config = straight_path_config();
        let doubling = UpgradeOption {
            name: "Heavier bolts".to_owned(),
            cost: 1,
            power_multiplier: 2.0,
            ..UpgradeOption::default()
        };
        config.towers = vec![TowerArchetype {
            projectile: Some(ProjectileKind::Arrow),
            options: vec![doubling; MAX_UPGRADE_OPTIONS + 1],
            ..TowerArchetype::default()
        }];
        let mut world = World::new(config);
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(0, 2));
        let option = MAX_UPGRADE_OPTIONS;

        let mut events = Vec::new();
        for _ in 0..3 {
            apply(
                &mut world,
                Command::ApplyUpgradeOption { tower, option },
                &mut events,
            );
        }

        let rejection = Event::TowerUpgradeRejected {
            tower,
            reason: UpgradeError::OptionOutOfRange(option),
        };
        assert_eq!(events, vec![rejection; 3]);
        assert_eq!(query::coins(&world), 90);
        assert_eq!(
            query::tower_view(&world).get(tower).map(|t| t.power),
            Some(1)
        );
    }

    #[test]
    fn configured_pools_are_prewarmed_at_match_start() {
        let mut config = straight_path_config();
        config.enemies = vec![
            EnemyArchetype {
                prewarm: 2,
                ..EnemyArchetype::default()
            },
            EnemyArchetype {
                kind: EnemyKind::Runner,
                pooled: false,
                prewarm: 4,
                ..EnemyArchetype::default()
            },
        ];
        config.projectiles = vec![ProjectileArchetype {
            prewarm: 3,
            ..ProjectileArchetype::default()
        }];
        let mut world = World::new(config);
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Grunt), 2);
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Runner), 0);
        assert_eq!(query::pooled_projectiles(&world, ProjectileKind::Arrow), 3);

        let enemy = spawn(&mut world, EnemyKind::Grunt);
        assert_eq!(query::pooled_enemies(&world, EnemyKind::Grunt), 1);
        let view = query::enemy_view(&world);
        let snapshot = view.get(enemy).expect("prewarmed enemy is active");
        assert_eq!(snapshot.position, Vec2::new(0.0, 0.5));
        assert_eq!(snapshot.path_index, 1);
    }

    #[test]
    fn spending_is_atomic() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(&mut world, Command::SpendCoins { amount: 6 }, &mut events);
        apply(&mut world, Command::AddCoins { amount: 4 }, &mut events);
        apply(&mut world, Command::SpendCoins { amount: 6 }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::CoinSpendRejected {
                    reason: CoinError::Insufficient {
                        required: 6,
                        available: 5
                    }
                },
                Event::CoinsChanged { coins: 9 },
                Event::CoinsChanged { coins: 3 },
            ]
        );
    }

    #[test]
    fn unarmed_tower_targets_but_never_fires() {
        let mut config = straight_path_config();
        config.towers = vec![TowerArchetype {
            range: 3.0,
            projectile: None,
            ..TowerArchetype::default()
        }];
        config.projectiles = vec![ProjectileArchetype::default()];
        let mut world = World::new(config);
        let tower = place(&mut world, TowerKind::Basic, CellCoord::new(0, 1));
        let enemy = spawn(&mut world, EnemyKind::Grunt);

        let events = tick(&mut world, HALF_SECOND);
        assert!(events.contains(&Event::TargetAcquired { tower, enemy }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::ProjectileFired { .. })));
        let cooldown = query::tower_view(&world)
            .get(tower)
            .map(|snapshot| snapshot.cooldown)
            .expect("tower is placed");
        assert!(cooldown <= 0.0);
    }

    #[test]
    fn enemy_on_a_short_path_stays_put() {
        let mut world = World::new(straight_path_config());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigurePath {
                waypoints: vec![Vec2::new(3.0, 3.0)],
            },
            &mut events,
        );
        let enemy = spawn(&mut world, EnemyKind::Grunt);
        let _ = tick(&mut world, ONE_SECOND);

        let view = query::enemy_view(&world);
        let snapshot = view.get(enemy).expect("stranded enemy stays registered");
        assert_eq!(snapshot.position, Vec2::new(3.0, 3.0));
    }
}
