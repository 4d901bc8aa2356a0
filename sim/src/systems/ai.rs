//! AI controller - picks a step for every actor with enough action points.
//!
//! Actors walk down the player's distance field. When not already next to
//! the player, an actor sometimes wanders to a random open neighbour
//! instead. Tiles chosen by one actor are reserved against the others for
//! the rest of the pass.

use crate::components::*;
use crate::config::SimConfig;
use crate::signals::{MoveIntents, SimRng};
use crate::spatial::SpatialIndex;
use crate::systems::util::{has_fill, wall_tick, WallClock};
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::HashSet;

/// A chosen step and its distance from the player, if known.
type Step = (Position, Option<u32>);

/// System that issues move intents for computer-controlled actors.
///
/// ## Data Access
/// - Reads: SimConfig, WallClock, DijkstraMap (player), SpatialIndex, Physical
/// - Writes: MoveIntents, AIControlled (action accounting), SimRng
#[allow(clippy::too_many_arguments)]
pub fn ai_controller_system(
    config: Res<SimConfig>,
    wall: Option<Res<WallClock>>,
    clocks: Query<&Clock>,
    mut rng: ResMut<SimRng>,
    mut intents: ResMut<MoveIntents>,
    index: Res<SpatialIndex>,
    physicals: Query<&Physical>,
    players: Query<&DijkstraMap, With<Player>>,
    mut actors: Query<(Entity, &Position, &mut AIControlled)>,
) {
    let Some(now) = wall_tick(wall.as_deref(), &clocks) else {
        return;
    };
    let Some(field) = players.iter().next() else {
        return;
    };

    let mut occupied: HashSet<Position> = actors.iter().map(|(_, p, _)| *p).collect();

    for (entity, pos, mut ai) in actors.iter_mut() {
        if !ai.can_act(now) {
            continue;
        }

        let blocked = |p: &Position| has_fill(&index, &physicals, p);
        let choice = select_step(
            pos,
            field,
            &occupied,
            blocked,
            &mut rng.0,
            config.ai_random_move_chance,
        );

        if let Some((target, distance)) = choice {
            // Attacking the player does not claim the player's tile.
            if distance != Some(0) {
                occupied.remove(pos);
                occupied.insert(target);
            }
            intents.push(entity, target);
        }

        // Spend exactly one action's worth so leftover points carry over.
        ai.last_action_tick += ai.action_cost;
    }
}

/// Choose a neighbouring tile to step onto.
///
/// Greedy when next to the player or when the wander roll fails, random
/// otherwise. Both choices skip filled tiles and tiles other actors hold.
pub fn select_step<R: Rng>(
    pos: &Position,
    field: &DijkstraMap,
    occupied: &HashSet<Position>,
    blocked: impl Fn(&Position) -> bool,
    rng: &mut R,
    wander_chance: u32,
) -> Option<Step> {
    let candidates: Vec<Position> = pos
        .neighbours()
        .into_iter()
        .filter(|n| !blocked(n) && !occupied.contains(n))
        .collect();

    let beside_player = pos
        .neighbours()
        .iter()
        .any(|n| field.distance(n) == Some(0));

    if beside_player || rng.gen_range(0..100) >= wander_chance {
        closest_step(pos, field, &candidates)
    } else if candidates.is_empty() {
        None
    } else {
        let pick = candidates[rng.gen_range(0..candidates.len())];
        Some((pick, field.distance(&pick)))
    }
}

/// Lowest-distance candidate; ties go to a later cardinal neighbour.
fn closest_step(pos: &Position, field: &DijkstraMap, candidates: &[Position]) -> Option<Step> {
    let mut best: Option<(Position, u32)> = None;
    for n in candidates {
        let Some(d) = field.distance(n) else {
            continue;
        };
        best = match best {
            None => Some((*n, d)),
            Some((_, bd)) if d < bd => Some((*n, d)),
            Some((_, bd)) if d == bd && pos.is_cardinal_to(n) => Some((*n, d)),
            keep => keep,
        };
    }
    best.map(|(p, d)| (p, Some(d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SimRng;
    use crate::spatial::spatial_index_update_system;
    use crate::systems::dijkstra::dijkstra_system;

    fn field_from(pairs: &[((i32, i32), u32)]) -> DijkstraMap {
        DijkstraMap {
            locus: None,
            distances: pairs
                .iter()
                .map(|&((x, y), d)| (Position::tile(x, y), d))
                .collect(),
        }
    }

    #[test]
    fn test_greedy_prefers_cardinal_on_tie() {
        let field = field_from(&[((1, 1), 3), ((1, 0), 3), ((0, 1), 4)]);
        let mut rng = SimRng::seeded(1);
        // Wander chance 0 forces the greedy branch.
        let step = select_step(
            &Position::tile(0, 0),
            &field,
            &HashSet::new(),
            |_| false,
            &mut rng.0,
            0,
        );
        assert_eq!(step, Some((Position::tile(1, 0), Some(3))));
    }

    #[test]
    fn test_adjacent_actor_always_attacks() {
        let field = field_from(&[((1, 0), 0), ((1, 1), 1)]);
        let mut rng = SimRng::seeded(3);
        for _ in 0..50 {
            // Even a certain wander roll is ignored next to the player.
            let step = select_step(
                &Position::tile(0, 0),
                &field,
                &HashSet::new(),
                |_| false,
                &mut rng.0,
                100,
            );
            assert_eq!(step, Some((Position::tile(1, 0), Some(0))));
        }
    }

    #[test]
    fn test_occupied_and_blocked_tiles_skipped() {
        let field = field_from(&[((1, 0), 1), ((1, 1), 2), ((0, 1), 3)]);
        let occupied: HashSet<Position> = [Position::tile(1, 0)].into_iter().collect();
        let mut rng = SimRng::seeded(5);
        let step = select_step(
            &Position::tile(0, 0),
            &field,
            &occupied,
            |p| *p == Position::tile(1, 1),
            &mut rng.0,
            0,
        );
        assert_eq!(step, Some((Position::tile(0, 1), Some(3))));
    }

    /// Every neighbour of the origin is 5 away except (1, 0), which is 1.
    fn fixed_descent() -> DijkstraMap {
        let mut field = field_from(&[((1, 0), 1)]);
        for n in Position::tile(0, 0).neighbours() {
            field.distances.entry(n).or_insert(5);
        }
        field
    }

    #[test]
    fn test_wander_rate_away_from_player() {
        let field = fixed_descent();
        let mut rng = SimRng::seeded(17);
        let trials = 20_000;
        let mut wandered = 0;
        for _ in 0..trials {
            let (step, _) = select_step(
                &Position::tile(0, 0),
                &field,
                &HashSet::new(),
                |_| false,
                &mut rng.0,
                25,
            )
            .unwrap();
            if step != Position::tile(1, 0) {
                wandered += 1;
            }
        }
        // A quarter of the rolls wander, and 7 of 8 wanders leave the descent.
        let rate = f64::from(wandered) / f64::from(trials);
        assert!((rate - 0.25 * 7.0 / 8.0).abs() <= 0.015, "rate was {rate}");
    }

    #[test]
    fn test_wandering_respects_blocked_and_occupied() {
        let field = fixed_descent();
        let wall = Position::tile(-1, -1);
        let held = Position::tile(0, 1);
        let occupied: HashSet<Position> = [held].into_iter().collect();
        let mut rng = SimRng::seeded(23);
        let trials = 20_000;
        let mut wandered = 0;
        for _ in 0..trials {
            let (step, _) = select_step(
                &Position::tile(0, 0),
                &field,
                &occupied,
                |p| *p == wall,
                &mut rng.0,
                25,
            )
            .unwrap();
            assert_ne!(step, wall);
            assert_ne!(step, held);
            if step != Position::tile(1, 0) {
                wandered += 1;
            }
        }
        // Six open neighbours remain, five of them off the descent.
        let rate = f64::from(wandered) / f64::from(trials);
        assert!((rate - 0.25 * 5.0 / 6.0).abs() <= 0.015, "rate was {rate}");
    }

    fn arena() -> World {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimRng::seeded(9));
        world.insert_resource(MoveIntents::default());
        world.insert_resource(SpatialIndex::new());
        for x in 0..6 {
            for y in 0..6 {
                world.spawn(FloorBundle::new(x, y));
            }
        }
        let clock = world.spawn(Clock::new("wall", 0)).id();
        world.insert_resource(WallClock(clock));
        world.spawn(PlayerBundle::new(Position::tile(0, 0)));
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (spatial_index_update_system, dijkstra_system, ai_controller_system).chain(),
        );
        schedule.run(world);
    }

    fn set_tick(world: &mut World, tick: u64) {
        let clock = world.resource::<WallClock>().0;
        world.get_mut::<Clock>(clock).unwrap().current_tick = tick;
    }

    #[test]
    fn test_waits_for_action_points() {
        let mut world = arena();
        let enemy = world.spawn(EnemyBundle::new(Position::tile(1, 1))).id();
        set_tick(&mut world, 100);

        run(&mut world);

        assert!(world.resource::<MoveIntents>().is_empty());
        assert_eq!(world.get::<AIControlled>(enemy).unwrap().last_action_tick, 0);
    }

    #[test]
    fn test_acting_keeps_leftover_points() {
        let mut world = arena();
        let enemy = world.spawn(EnemyBundle::new(Position::tile(1, 1))).id();
        set_tick(&mut world, 200);

        run(&mut world);

        assert_eq!(
            world.resource::<MoveIntents>().target_of(enemy),
            Some(Position::tile(0, 0))
        );
        assert_eq!(world.get::<AIControlled>(enemy).unwrap().last_action_tick, 150);
    }

    #[test]
    fn test_actors_never_share_a_target() {
        let mut world = arena();
        let a = world.spawn(EnemyBundle::new(Position::tile(4, 3))).id();
        let b = world.spawn(EnemyBundle::new(Position::tile(4, 5))).id();
        set_tick(&mut world, 150);

        run(&mut world);

        let intents = world.resource::<MoveIntents>();
        let ta = intents.target_of(a).unwrap();
        let tb = intents.target_of(b).unwrap();
        assert_ne!(ta, tb);
    }
}
