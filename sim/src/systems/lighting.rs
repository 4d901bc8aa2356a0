//! Lighting system - propagates light from sources into per-tile levels.
//!
//! Light spreads through a shadowcast of fixed radius around each emitter.
//! A tile receives `color * visibility * (1 - r / range)` per channel. After
//! the first pass, lit tiles that have not emitted yet may bounce a share of
//! what they received (`reflectivity`) if it is bright enough.

use crate::components::*;
use crate::config::SimConfig;
use crate::shadowcast;
use crate::spatial::SpatialIndex;
use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

type Cell = (i32, i32);

/// Light propagation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightModel {
    pub range: u32,
    pub passes: u32,
    pub reflectivity: f64,
    pub emission_threshold: u32,
}

impl LightModel {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            range: config.light_range,
            passes: config.light_passes,
            reflectivity: config.light_reflectivity,
            emission_threshold: config.light_emission_threshold,
        }
    }

    /// Accumulated light per cell for the given emitters.
    pub fn compute<P>(&self, lights: &BTreeMap<Cell, Rgb>, light_passes: P) -> BTreeMap<Cell, Rgb>
    where
        P: Fn(i32, i32) -> bool,
    {
        let mut emitting = lights.clone();
        let mut lit: BTreeMap<Cell, Rgb> = BTreeMap::new();
        let mut done: HashSet<Cell> = HashSet::new();
        let mut fov_cache: HashMap<Cell, Vec<(Cell, f64)>> = HashMap::new();

        for pass in 0..self.passes {
            for (&cell, color) in &emitting {
                let fov = fov_cache
                    .entry(cell)
                    .or_insert_with(|| self.form_factors(cell, &light_passes));
                for &(target, form_factor) in fov.iter() {
                    let acc = lit.entry(target).or_insert([0; 3]);
                    for (channel, value) in acc.iter_mut().enumerate() {
                        *value += (f64::from(color[channel]) * form_factor).round() as u32;
                    }
                }
                done.insert(cell);
            }

            if pass + 1 == self.passes {
                break;
            }
            emitting = self.emitters(&lit, &done);
        }
        lit
    }

    fn form_factors<P>(&self, (x, y): Cell, light_passes: &P) -> Vec<(Cell, f64)>
    where
        P: Fn(i32, i32) -> bool,
    {
        let range = f64::from(self.range);
        let mut out = Vec::new();
        shadowcast::compute(x, y, self.range, light_passes, |cx, cy, r, visibility| {
            let form_factor = visibility * (1.0 - f64::from(r) / range);
            if form_factor > 0.0 {
                out.push(((cx, cy), form_factor));
            }
        });
        out
    }

    /// Lit cells that bounce light on the next pass.
    fn emitters(&self, lit: &BTreeMap<Cell, Rgb>, done: &HashSet<Cell>) -> BTreeMap<Cell, Rgb> {
        let mut result = BTreeMap::new();
        if self.reflectivity <= 0.0 {
            return result;
        }
        for (cell, color) in lit {
            if done.contains(cell) {
                continue;
            }
            let emission = color.map(|c| (f64::from(c) * self.reflectivity).round() as u32);
            let intensity: u32 = emission.iter().sum();
            if intensity > self.emission_threshold {
                result.insert(*cell, emission);
            }
        }
        result
    }
}

/// System that recomputes light levels from every light source.
///
/// ## Data Access
/// - Reads: SimConfig, Position, Physical, LightSource
/// - Writes: LightLevel (creating level entities on newly lit tiles), SpatialIndex
pub fn lighting_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    mut index: ResMut<SpatialIndex>,
    tiles: Query<(&Position, &Physical)>,
    sources: Query<(&Position, &LightSource)>,
    mut levels: Query<&mut LightLevel>,
) {
    // Known columns are open unless something fills layer 0; unknown ones are opaque.
    let mut open: HashMap<Cell, bool> = HashMap::new();
    for (pos, physical) in tiles.iter() {
        let cell = (pos.x, pos.y);
        open.entry(cell).or_insert(true);
        if pos.z == OCCUPANT_LAYER && physical.is_fill() {
            open.insert(cell, false);
        }
    }

    let mut lights: BTreeMap<Cell, Rgb> = BTreeMap::new();
    for (pos, source) in sources.iter() {
        lights.insert((pos.x, pos.y), source.strength.color());
    }
    if lights.is_empty() {
        return;
    }

    let model = LightModel::from_config(&config);
    let lit = model.compute(&lights, |x, y| open.get(&(x, y)).copied().unwrap_or(false));

    let mut created = 0usize;
    for ((x, y), color) in lit {
        let tile = Position::tile(x, y);
        let existing = index.at(&tile).iter().copied().find(|e| levels.contains(*e));
        match existing.and_then(|e| levels.get_mut(e).ok()) {
            Some(mut level) => level.color = color,
            None => {
                let entity = commands.spawn((tile, LightLevel { color })).id();
                index.insert(entity, tile);
                created += 1;
            }
        }
    }

    if created > 0 {
        tracing::debug!(created, "light levels created");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_room(world: &mut World, half: i32) {
        for x in -half..=half {
            for y in -half..=half {
                world.spawn(FloorBundle::new(x, y));
            }
        }
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((crate::spatial::spatial_index_update_system, lighting_system).chain());
        schedule.run(world);
    }

    fn level_at(world: &mut World, x: i32, y: i32) -> Option<Rgb> {
        let mut query = world.query::<(&Position, &LightLevel)>();
        query
            .iter(world)
            .find(|(p, _)| **p == Position::tile(x, y))
            .map(|(_, l)| l.color)
    }

    #[test]
    fn test_light_falls_off_with_distance() {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialIndex::new());
        open_room(&mut world, 6);
        world.spawn(LampBundle::new(Position::tile(0, 0)));

        run(&mut world);

        assert_eq!(level_at(&mut world, 0, 0), Some([255; 3]));
        // r = 1 receives three quarters.
        assert_eq!(level_at(&mut world, 1, 0), Some([191; 3]));
        // r = 4 is past the edge of the range.
        assert_eq!(level_at(&mut world, 4, 0), None);
    }

    #[test]
    fn test_walls_block_light() {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialIndex::new());
        open_room(&mut world, 6);
        world.spawn(WallBundle::new(1, 0));
        world.spawn(LampBundle::new(Position::tile(0, 0)));

        run(&mut world);

        assert!(level_at(&mut world, 1, 0).is_some());
        assert_eq!(level_at(&mut world, 2, 0), None);
        assert!(level_at(&mut world, -2, 0).is_some());
    }

    #[test]
    fn test_rerun_updates_in_place() {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialIndex::new());
        open_room(&mut world, 6);
        world.spawn(LampBundle::new(Position::tile(0, 0)));

        run(&mut world);
        let first = world.query::<&LightLevel>().iter(&world).count();
        run(&mut world);
        let second = world.query::<&LightLevel>().iter(&world).count();

        assert_eq!(first, second);
    }

    #[test]
    fn test_bounce_adds_light() {
        let lights: BTreeMap<Cell, Rgb> = [((0, 0), [255; 3])].into_iter().collect();
        let flat = LightModel {
            range: 4,
            passes: 2,
            reflectivity: 0.0,
            emission_threshold: 100,
        };
        let bouncy = LightModel {
            reflectivity: 0.5,
            ..flat
        };

        let without = flat.compute(&lights, |_, _| true);
        let with = bouncy.compute(&lights, |_, _| true);

        // Bounced light reaches past the direct radius.
        assert!(with.len() > without.len());
        assert!(with[&(0, 0)][0] > without[&(0, 0)][0]);
        assert!(without.iter().all(|(cell, c)| with[cell][0] >= c[0]));
    }
}
