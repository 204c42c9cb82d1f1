#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Radius, nearest-neighbour and point-overlap queries over positioned entities.
//!
//! Queries never reorder their input: candidates are visited in slice order,
//! so callers that build the slice from a roster get roster-order tie-breaks.

use rampart_core::{Faction, Vec2};

/// Positioned entity visible to spatial queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialEntry<Id> {
    /// Identifier reported back by queries.
    pub id: Id,
    /// World-space position of the entity.
    pub position: Vec2,
    /// Allegiance used to filter queries.
    pub faction: Faction,
}

/// Borrowed query surface over a slice of entries.
#[derive(Clone, Copy, Debug)]
pub struct SpatialQuery<'a, Id> {
    entries: &'a [SpatialEntry<Id>],
}

impl<'a, Id: Copy + 'a> SpatialQuery<'a, Id> {
    /// Wraps the provided entries for querying.
    #[must_use]
    pub fn new(entries: &'a [SpatialEntry<Id>]) -> Self {
        Self { entries }
    }

    /// Yields every entity of `faction` whose distance to `center` is at most `radius`.
    pub fn within_radius(
        &self,
        center: Vec2,
        radius: f32,
        faction: Faction,
    ) -> impl Iterator<Item = Id> + 'a {
        let radius_sq = radius * radius;
        self.entries
            .iter()
            .filter(move |entry| {
                entry.faction == faction && entry.position.distance_squared(center) <= radius_sq
            })
            .map(|entry| entry.id)
    }

    /// Finds the entity of `faction` closest to `center` and strictly closer than `range`.
    ///
    /// Equidistant candidates resolve to the one encountered first.
    #[must_use]
    pub fn nearest_within(&self, center: Vec2, range: f32, faction: Faction) -> Option<(Id, f32)> {
        let mut best: Option<(Id, f32)> = None;
        for entry in self.entries {
            if entry.faction != faction {
                continue;
            }

            let distance = entry.position.distance(center);
            if distance >= range {
                continue;
            }

            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((entry.id, distance)),
            }
        }
        best
    }

    /// Returns the first entity of `faction` whose body of `radius` covers `point`.
    #[must_use]
    pub fn first_overlapping(&self, point: Vec2, radius: f32, faction: Faction) -> Option<Id> {
        let radius_sq = radius * radius;
        self.entries
            .iter()
            .find(|entry| {
                entry.faction == faction && entry.position.distance_squared(point) <= radius_sq
            })
            .map(|entry| entry.id)
    }
}
