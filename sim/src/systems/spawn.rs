//! Spawner system - nests periodically produce new actors.
//!
//! Each spawner accrues points from the wall clock and spends them in
//! `spawn_rate` chunks, so a long idle gap yields several attempts in one
//! pass. The chance per attempt drops as the live AI population grows.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::signals::{PipelineFault, SimEvent, SimEvents, SimRng};
use crate::spatial::SpatialIndex;
use crate::systems::util::{is_crowded, wall_tick, WallClock};
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::HashSet;

/// System that runs every spawner against the wall clock.
///
/// ## Data Access
/// - Reads: SimConfig, WallClock, Physical, AIControlled (population)
/// - Writes: Spawner (last spawn tick), SpatialIndex, SimEvents, new entities
#[allow(clippy::too_many_arguments)]
pub fn spawner_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    wall: Option<Res<WallClock>>,
    clocks: Query<&Clock>,
    mut rng: ResMut<SimRng>,
    mut index: ResMut<SpatialIndex>,
    mut events: ResMut<SimEvents>,
    mut fault: ResMut<PipelineFault>,
    physicals: Query<&Physical>,
    population: Query<(), With<AIControlled>>,
    mut spawners: Query<(Entity, &Position, &mut Spawner)>,
) {
    let Some(now) = wall_tick(wall.as_deref(), &clocks) else {
        return;
    };

    let mut live_ai = population.iter().count() as f64;
    let divisor = f64::from(config.spawner_population_divisor);
    // Tiles taken by spawns this pass; their components land after the system.
    let mut claimed: HashSet<Position> = HashSet::new();

    for (entity, pos, mut spawner) in spawners.iter_mut() {
        if spawner.spawn_rate == 0 {
            fault.raise(SimError::invalid(format!(
                "spawner {entity:?} has a zero spawn rate"
            )));
            continue;
        }

        let mut points = now.saturating_sub(spawner.last_spawn_tick);
        while points >= spawner.spawn_rate {
            points -= spawner.spawn_rate;

            let chance = f64::from(spawner.spawn_chance) - live_ai / divisor;
            let roll = f64::from(rng.0.gen_range(0u32..100));
            if roll > chance {
                continue;
            }

            let open: Vec<Position> = pos
                .neighbours()
                .into_iter()
                .filter(|p| !claimed.contains(p) && !is_crowded(&index, &physicals, p))
                .collect();
            if open.is_empty() {
                tracing::debug!(spawner = ?entity, "all spawn positions blocked");
                continue;
            }

            let at = open[rng.0.gen_range(0..open.len())];
            let template = &spawner.template;
            let spawned = commands
                .spawn((
                    at,
                    template.renderable.clone(),
                    template.health,
                    template.physical,
                    template.combat,
                    AIControlled::new(now, config.spawned_ai_action_cost),
                ))
                .id();
            index.insert(spawned, at);
            claimed.insert(at);
            events.push(SimEvent::EntityCreated(spawned));
            live_ai += 1.0;
            tracing::debug!(spawner = ?entity, ?spawned, at = %at, population = live_ai, "spawned");
        }

        spawner.last_spawn_tick = now - points;
    }
}
