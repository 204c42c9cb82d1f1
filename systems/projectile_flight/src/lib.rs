#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that steers homing projectiles toward their targets.

use rampart_core::{EnemyView, Faction, FlightOutcome, ProjectileSnapshot, Vec2};
use rampart_system_spatial_query::{SpatialEntry, SpatialQuery};

/// Projectile flight system that resolves one movement step per projectile.
#[derive(Debug, Default)]
pub struct ProjectileFlight;

impl ProjectileFlight {
    /// Creates a new projectile flight system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Advances every projectile by `dt` seconds and reports how each step resolved.
    ///
    /// Projectiles whose target is no longer in the enemy view report
    /// [`FlightOutcome::TargetLost`]. The output buffer is cleared first and
    /// receives exactly one outcome per projectile, in input order.
    pub fn handle(
        &mut self,
        dt: f32,
        projectiles: &[ProjectileSnapshot],
        enemies: &EnemyView,
        out: &mut Vec<FlightOutcome>,
    ) {
        out.clear();
        out.reserve(projectiles.len());

        for projectile in projectiles {
            let target = projectile
                .target
                .and_then(|enemy| enemies.get(enemy))
                .filter(|snapshot| !snapshot.health.is_dead());

            let Some(target) = target else {
                out.push(FlightOutcome::TargetLost {
                    projectile: projectile.id,
                });
                continue;
            };

            let (position, heading) = step_towards(
                projectile.position,
                target.position,
                projectile.speed * dt,
                projectile.heading,
            );

            // Contact only counts against the projectile's own target.
            let body = [SpatialEntry {
                id: target.id,
                position: target.position,
                faction: Faction::Invader,
            }];
            let contact = SpatialQuery::new(&body).first_overlapping(
                position,
                projectile.impact_radius,
                Faction::Invader,
            );

            if let Some(target) = contact {
                out.push(FlightOutcome::Impact {
                    projectile: projectile.id,
                    target,
                    position,
                });
            } else {
                out.push(FlightOutcome::Advanced {
                    projectile: projectile.id,
                    position,
                    heading,
                });
            }
        }
    }
}

/// Moves `from` toward `to` by at most `max_step`, never overshooting.
///
/// Returns the new position and the heading of travel; the previous heading
/// is kept when the two points coincide.
fn step_towards(from: Vec2, to: Vec2, max_step: f32, heading: f32) -> (Vec2, f32) {
    let delta = to - from;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return (to, heading);
    }

    let heading = delta.y.atan2(delta.x);
    if distance <= max_step {
        (to, heading)
    } else {
        (from + delta / distance * max_step, heading)
    }
}
