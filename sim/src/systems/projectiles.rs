//! Projectile system - resolves ranged shots in a single pass.
//!
//! A projectile is traced from where it was fired along its direction. The
//! first cell holding a sizeable, damageable body or a wall ends the trace.
//! Bodies are hit on a percentage roll, improved when that exact cell was
//! aimed at. Projectiles never survive the pass that resolves them.

use crate::components::*;
use crate::config::SimConfig;
use crate::line::trace_ray;
use crate::signals::{MoveAnimation, SimEvent, SimEvents, SimRng};
use crate::spatial::SpatialIndex;
use crate::systems::util::has_fill;
use bevy_ecs::prelude::*;
use rand::Rng;

/// Image of the bolt left lying after it strikes.
pub const SPENT_BOLT_IMAGE: &str = "spent-bolt";
/// Image used for the bolt in flight.
pub const BOLT_IMAGE: &str = "bolt";
const SPENT_BOLT_Z_ORDER: i32 = 2;

/// Where a trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Impact {
    Wall(Position),
    Hit(Position),
    Miss(Position),
}

/// System that traces, resolves and removes every fired projectile.
///
/// ## Data Access
/// - Reads: SimConfig, SpatialIndex, Physical, Velocity, Aimed
/// - Writes: Health, SpatialIndex, SimEvents, marker entities
#[allow(clippy::too_many_arguments)]
pub fn projectile_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    mut index: ResMut<SpatialIndex>,
    mut events: ResMut<SimEvents>,
    physicals: Query<&Physical>,
    mut healths: Query<&mut Health>,
    projectiles: Query<(Entity, &Position, &Velocity, Option<&Aimed>)>,
) {
    for (entity, origin, velocity, aimed) in projectiles.iter() {
        let mut impact = None;

        let ray = trace_ray(
            (origin.x, origin.y),
            velocity.dx,
            velocity.dy,
            f64::from(config.projectile_range),
        );
        for (x, y) in ray {
            let cell = Position::tile(x, y);
            if cell == origin.on_layer(OCCUPANT_LAYER) {
                continue;
            }

            let body = index.at(&cell).iter().copied().find(|e| {
                healths.contains(*e)
                    && physicals
                        .get(*e)
                        .is_ok_and(|p| p.size >= Size::Medium && !p.is_fill())
            });

            if let Some(body) = body {
                let aim_bonus = match aimed {
                    Some(a) if a.target == cell => config.projectile_aim_bonus,
                    _ => 0,
                };
                let chance = config.projectile_base_chance + aim_bonus;
                if rng.0.gen_range(1..=100) <= chance {
                    if let Ok(mut health) = healths.get_mut(body) {
                        health.damage(config.projectile_damage);
                        tracing::debug!(projectile = ?entity, ?body, remaining = health.current, "projectile hit");
                    }
                    impact = Some(Impact::Hit(cell));
                } else {
                    tracing::debug!(projectile = ?entity, ?body, chance, "projectile missed");
                    impact = Some(Impact::Miss(cell));
                }
                break;
            }

            if has_fill(&index, &physicals, &cell) {
                impact = Some(Impact::Wall(cell));
                break;
            }
        }

        match impact {
            Some(Impact::Wall(at)) | Some(Impact::Hit(at)) => {
                events.push(SimEvent::MoveAnimation(MoveAnimation {
                    entity: None,
                    source: *origin,
                    destination: at,
                    duration_ms: config.move_animation_ms,
                    image: BOLT_IMAGE.to_string(),
                    hide_existing: false,
                }));
                let drop = drop_candidates(&at, velocity)
                    .into_iter()
                    .find(|p| !has_fill(&index, &physicals, p));
                if let Some(drop) = drop {
                    let marker = commands
                        .spawn((drop, Renderable::new(SPENT_BOLT_IMAGE, SPENT_BOLT_Z_ORDER)))
                        .id();
                    index.insert(marker, drop);
                    events.push(SimEvent::EntityCreated(marker));
                }
            }
            Some(Impact::Miss(_)) => {}
            None => tracing::debug!(projectile = ?entity, "projectile struck nothing"),
        }

        commands.entity(entity).despawn();
        index.remove(entity);
        events.push(SimEvent::EntityRemoved(entity));
    }
}

/// Cells next to an impact, back toward the shooter, major axis first.
fn drop_candidates(at: &Position, velocity: &Velocity) -> [Position; 3] {
    let back = |d: f64| {
        if d > 0.0 {
            -1
        } else if d < 0.0 {
            1
        } else {
            0
        }
    };
    let (ux, uy) = (back(velocity.dx), back(velocity.dy));
    let along_x = at.offset(ux, 0);
    let along_y = at.offset(0, uy);
    let corner = at.offset(ux, uy);
    if velocity.dx.abs() >= velocity.dy.abs() {
        [along_x, along_y, corner]
    } else {
        [along_y, along_x, corner]
    }
}
