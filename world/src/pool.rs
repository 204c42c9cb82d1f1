//! Generational object pool that recycles deactivated instances per archetype.

use std::collections::BTreeMap;

use rampart_core::{SlotKey, Vec2};

/// Behaviour required from values stored inside an [`ObjectPool`].
pub trait Poolable {
    /// Prepares the instance for a fresh activation at `position`.
    fn activate(&mut self, position: Vec2);

    /// Clears per-activation state before the instance returns to the pool.
    fn deactivate(&mut self);
}

#[derive(Debug)]
enum SlotState<T> {
    Active(T),
    Pooled(T),
    Vacant,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// Slot arena that hands out generational keys and keeps a free list per key.
///
/// A slot is either active, parked on exactly one free list, or vacant, so an
/// instance can never be checked out twice. Releasing or destroying a slot
/// bumps its generation, which invalidates every key issued for the previous
/// activation.
#[derive(Debug)]
pub struct ObjectPool<K, T> {
    slots: Vec<Slot<T>>,
    free: BTreeMap<K, Vec<u32>>,
    vacant: Vec<u32>,
}

impl<K: Ord + Copy, T: Poolable> Default for ObjectPool<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Copy, T: Poolable> ObjectPool<K, T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: BTreeMap::new(),
            vacant: Vec::new(),
        }
    }

    /// Checks out an instance for `key`, reusing a parked one when available.
    ///
    /// `make` is only invoked when no parked instance exists for `key`.
    pub fn acquire(&mut self, key: K, position: Vec2, make: impl FnOnce() -> T) -> SlotKey {
        if let Some(index) = self.free.get_mut(&key).and_then(Vec::pop) {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
                if let SlotState::Pooled(mut value) = state {
                    value.activate(position);
                    slot.state = SlotState::Active(value);
                    return SlotKey::new(index, slot.generation);
                }
                slot.state = state;
            }
        }

        let mut value = make();
        value.activate(position);

        if let Some(index) = self.vacant.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.state = SlotState::Active(value);
                return SlotKey::new(index, slot.generation);
            }
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Active(value),
        });
        SlotKey::new(index, 0)
    }

    /// Parks `count` freshly made instances on the free list of `key`.
    pub fn prewarm(&mut self, key: K, count: usize, mut make: impl FnMut() -> T) {
        let free = self.free.entry(key).or_default();
        for _ in 0..count {
            let mut value = make();
            value.deactivate();
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                state: SlotState::Pooled(value),
            });
            free.push(index);
        }
    }

    /// Deactivates the instance behind `key` and parks it on the free list of `pool_key`.
    ///
    /// Returns `false` when `key` does not address a live instance.
    pub fn release(&mut self, pool_key: K, key: SlotKey) -> bool {
        let Some(slot) = self.live_slot_mut(key) else {
            return false;
        };

        let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
        let SlotState::Active(mut value) = state else {
            slot.state = state;
            return false;
        };

        value.deactivate();
        slot.state = SlotState::Pooled(value);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.entry(pool_key).or_default().push(key.index());
        true
    }

    /// Removes the instance behind `key` without keeping it for reuse.
    pub fn destroy(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.live_slot_mut(key)?;
        let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
        let SlotState::Active(value) = state else {
            slot.state = state;
            return None;
        };

        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(key.index());
        Some(value)
    }

    /// Reports whether `key` addresses a currently active instance.
    #[must_use]
    pub fn is_live(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Borrows the active instance addressed by `key`.
    #[must_use]
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        match &slot.state {
            SlotState::Active(value) => Some(value),
            SlotState::Pooled(_) | SlotState::Vacant => None,
        }
    }

    /// Mutably borrows the active instance addressed by `key`.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        match &mut self.live_slot_mut(key)?.state {
            SlotState::Active(value) => Some(value),
            SlotState::Pooled(_) | SlotState::Vacant => None,
        }
    }

    /// Iterates over active instances in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.state {
                SlotState::Active(value) => Some((
                    SlotKey::new(u32::try_from(index).unwrap_or(u32::MAX), slot.generation),
                    value,
                )),
                SlotState::Pooled(_) | SlotState::Vacant => None,
            })
    }

    /// Number of parked instances waiting on the free list of `key`.
    #[must_use]
    pub fn free_count(&self, key: K) -> usize {
        self.free.get(&key).map_or(0, Vec::len)
    }

    fn live_slot_mut(&mut self, key: SlotKey) -> Option<&mut Slot<T>> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        matches!(slot.state, SlotState::Active(_)).then_some(slot)
    }
}
