//! Field-of-view system - rebuilds what each sighted entity knows.
//!
//! Every pass, all previously known tiles decay to `Remembered`, then a
//! shadowcast from the viewer marks the lit tiles it reaches as `Current`.
//! Tiles that are visible but unlit are not seen.

use crate::components::*;
use crate::shadowcast;
use crate::spatial::SpatialIndex;
use crate::systems::util::has_fill;
use bevy_ecs::prelude::*;

/// System that recomputes `Knowledge` for every entity with `Sight`.
///
/// ## Data Access
/// - Reads: SpatialIndex, Physical, LightLevel, Position, Sight
/// - Writes: Knowledge (replaced wholesale, inserted if missing)
pub fn fov_system(
    mut commands: Commands,
    index: Res<SpatialIndex>,
    physicals: Query<&Physical>,
    lit: Query<(), With<LightLevel>>,
    mut viewers: Query<(Entity, &Position, &Sight, Option<&mut Knowledge>)>,
) {
    let opaque = |x: i32, y: i32| has_fill(&index, &physicals, &Position::tile(x, y));
    let is_lit = |pos: &Position| index.at(pos).iter().any(|e| lit.contains(*e));

    for (entity, pos, sight, knowledge) in viewers.iter_mut() {
        let mut positions = knowledge
            .as_ref()
            .map(|k| k.positions.clone())
            .unwrap_or_default();
        for state in positions.values_mut() {
            *state = KnownState::Remembered;
        }

        shadowcast::compute(pos.x, pos.y, sight.range, |x, y| !opaque(x, y), |x, y, _, _| {
            let tile = Position::tile(x, y);
            if is_lit(&tile) {
                positions.insert(tile, KnownState::Current);
            }
        });

        match knowledge {
            Some(mut known) => known.positions = positions,
            None => {
                commands.entity(entity).insert(Knowledge { positions });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::spatial_index_update_system;

    fn lit_room(world: &mut World, walls: &[(i32, i32)]) {
        for x in -5..=5 {
            for y in -5..=5 {
                world.spawn(FloorBundle::new(x, y));
                world.spawn((Position::tile(x, y), LightLevel { color: [255; 3] }));
            }
        }
        for &(x, y) in walls {
            world.spawn(WallBundle::new(x, y));
        }
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((spatial_index_update_system, fov_system).chain());
        schedule.run(world);
    }

    fn knowledge_of(world: &World, viewer: Entity) -> Knowledge {
        world.get::<Knowledge>(viewer).cloned().unwrap_or_default()
    }

    #[test]
    fn test_wall_occludes() {
        let mut world = World::new();
        world.insert_resource(SpatialIndex::new());
        lit_room(&mut world, &[(1, 0)]);
        let viewer = world
            .spawn((Position::tile(0, 0), Sight { range: 5 }))
            .id();

        run(&mut world);

        let known = knowledge_of(&world, viewer);
        assert!(known.is_current(&Position::tile(0, 0)));
        assert!(known.is_current(&Position::tile(1, 0)));
        assert!(!known.knows(&Position::tile(2, 0)));
        assert!(!known.knows(&Position::tile(3, 0)));
        assert!(known.is_current(&Position::tile(-3, 0)));
    }

    #[test]
    fn test_unlit_tiles_are_not_seen() {
        let mut world = World::new();
        world.insert_resource(SpatialIndex::new());
        for x in 0..4 {
            world.spawn(FloorBundle::new(x, 0));
        }
        world.spawn((Position::tile(0, 0), LightLevel { color: [255; 3] }));
        let viewer = world
            .spawn((Position::tile(0, 0), Sight { range: 5 }))
            .id();

        run(&mut world);

        let known = knowledge_of(&world, viewer);
        assert!(known.is_current(&Position::tile(0, 0)));
        assert!(!known.knows(&Position::tile(1, 0)));
    }

    #[test]
    fn test_out_of_view_decays_to_remembered() {
        let mut world = World::new();
        world.insert_resource(SpatialIndex::new());
        lit_room(&mut world, &[]);
        let viewer = world
            .spawn((Position::tile(0, 0), Sight { range: 2 }))
            .id();

        run(&mut world);
        assert!(knowledge_of(&world, viewer).is_current(&Position::tile(-2, 0)));

        world.entity_mut(viewer).insert(Position::tile(3, 0));
        run(&mut world);

        let known = knowledge_of(&world, viewer);
        assert_eq!(
            known.state_at(&Position::tile(-2, 0)),
            Some(KnownState::Remembered)
        );
        assert!(known.is_current(&Position::tile(5, 0)));
    }
}
