//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use rampart_core::{
    CellCoord, EnemyId, ProjectileKind, TowerArchetype, TowerId, TowerKind, TowerSnapshot,
    UpgradeOption, Vec2, MAX_UPGRADE_OPTIONS,
};

/// Fraction of the purchase cost refunded when a tower is sold.
const SELL_REFUND_RATIO: f32 = 0.5;

/// Tolerance absorbed before rounding up, so `10 * 1.7` costs 17 rather than 18.
const ROUNDING_TOLERANCE: f32 = 1e-4;

/// Runtime state of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerKind,
    pub(crate) cell: CellCoord,
    pub(crate) position: Vec2,
    pub(crate) purchase_cost: u32,
    pub(crate) power: u32,
    pub(crate) range: f32,
    pub(crate) shoot_delay: f32,
    pub(crate) projectile_speed: f32,
    pub(crate) splash_radius: f32,
    pub(crate) projectile: Option<ProjectileKind>,
    pub(crate) level: u32,
    pub(crate) max_level: u32,
    pub(crate) cooldown: f32,
    pub(crate) target: Option<EnemyId>,
    applied_options: [bool; MAX_UPGRADE_OPTIONS],
}

impl TowerState {
    /// Builds a freshly placed tower centred in `cell`.
    pub(crate) fn new(
        id: TowerId,
        cell: CellCoord,
        cell_size: f32,
        archetype: &TowerArchetype,
    ) -> Self {
        let mut tower = Self {
            id,
            kind: archetype.kind,
            cell,
            position: cell.center(cell_size),
            purchase_cost: 0,
            power: 0,
            range: 0.0,
            shoot_delay: 0.0,
            projectile_speed: 0.0,
            splash_radius: 0.0,
            projectile: None,
            level: 0,
            max_level: 0,
            cooldown: 0.0,
            target: None,
            applied_options: [false; MAX_UPGRADE_OPTIONS],
        };
        tower.reset_to(archetype);
        tower
    }

    /// Swaps the tower's archetype in place, keeping identity, cell, target and cooldown.
    pub(crate) fn reset_to(&mut self, archetype: &TowerArchetype) {
        self.kind = archetype.kind;
        self.purchase_cost = archetype.purchase_cost;
        self.power = archetype.power;
        self.range = archetype.range;
        self.shoot_delay = archetype.shoot_delay;
        self.projectile_speed = archetype.projectile_speed;
        self.splash_radius = archetype.splash_radius;
        self.projectile = archetype.projectile;
        self.level = 0;
        self.max_level = archetype.max_level;
        self.applied_options = [false; MAX_UPGRADE_OPTIONS];
    }

    /// Cost of the next level upgrade, or `None` once the tower is maxed out.
    pub(crate) fn upgrade_cost(&self, archetype: &TowerArchetype) -> Option<u32> {
        if self.level >= self.max_level {
            return None;
        }
        let exponent = i32::try_from(self.level).unwrap_or(i32::MAX);
        Some(ceil_to_u32(
            archetype.purchase_cost as f32 * archetype.cost_multiplier.powi(exponent),
        ))
    }

    /// Applies one classic level upgrade. Coins must already have been spent.
    pub(crate) fn apply_level_upgrade(&mut self, archetype: &TowerArchetype, min_shoot_delay: f32) {
        self.scale_stats(
            archetype.power_multiplier,
            archetype.range_multiplier,
            archetype.delay_multiplier,
            min_shoot_delay,
        );
        self.level += 1;
    }

    pub(crate) fn option_applied(&self, index: usize) -> bool {
        self.applied_options.get(index).copied().unwrap_or(false)
    }

    /// Applies the stat changes of a one-time option and marks it as used.
    pub(crate) fn apply_option(
        &mut self,
        index: usize,
        option: &UpgradeOption,
        min_shoot_delay: f32,
    ) {
        self.scale_stats(
            option.power_multiplier,
            option.range_multiplier,
            option.delay_multiplier,
            min_shoot_delay,
        );
        if let Some(radius) = option.splash_radius {
            self.splash_radius = radius.max(0.0);
        }
        if let Some(mark) = self.applied_options.get_mut(index) {
            *mark = true;
        }
    }

    /// Coins refunded when the tower is sold.
    pub(crate) fn sell_price(&self) -> u32 {
        ceil_to_u32(self.purchase_cost as f32 * SELL_REFUND_RATIO)
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            position: self.position,
            power: self.power,
            range: self.range,
            shoot_delay: self.shoot_delay,
            cooldown: self.cooldown,
            level: self.level,
            max_level: self.max_level,
            target: self.target,
        }
    }

    fn scale_stats(&mut self, power: f32, range: f32, delay: f32, min_shoot_delay: f32) {
        self.power = ceil_to_u32(self.power as f32 * power);
        self.range *= range;
        self.shoot_delay = (self.shoot_delay * delay).max(min_shoot_delay);
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a new tower built by `build` under a freshly allocated identifier.
    pub(crate) fn insert(&mut self, build: impl FnOnce(TowerId) -> TowerState) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(id, build(id));
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }
}

/// Rounds `value` up to the next whole number, ignoring float noise just above an integer.
pub(crate) fn ceil_to_u32(value: f32) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let rounded = (value - ROUNDING_TOLERANCE).ceil();
    if rounded >= u32::MAX as f32 {
        u32::MAX
    } else {
        rounded as u32
    }
}
