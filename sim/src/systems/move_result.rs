//! Move-result handler - turns completed steps into animation requests.

use crate::components::*;
use crate::config::SimConfig;
use crate::signals::{MoveAnimation, MoveResults, SimEvent, SimEvents};
use bevy_ecs::prelude::*;

/// System that requests step animations for moves the player can see.
///
/// A result animates when the mover is renderable and its destination is in
/// the player's knowledge. Results are always consumed.
pub fn move_result_system(
    config: Res<SimConfig>,
    mut results: ResMut<MoveResults>,
    mut events: ResMut<SimEvents>,
    players: Query<&Knowledge, With<Player>>,
    renderables: Query<&Renderable>,
) {
    let drained = results.drain();
    let Some(knowledge) = players.iter().next() else {
        return;
    };

    for result in drained {
        if !knowledge.knows(&result.destination) {
            continue;
        }
        let Ok(renderable) = renderables.get(result.entity) else {
            continue;
        };
        events.push(SimEvent::MoveAnimation(MoveAnimation {
            entity: Some(result.entity),
            source: result.source,
            destination: result.destination,
            duration_ms: config.move_animation_ms,
            image: renderable.image.clone(),
            hide_existing: true,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::MoveResult;

    fn setup() -> World {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(MoveResults::default());
        world.insert_resource(SimEvents::default());
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(move_result_system);
        schedule.run(world);
    }

    #[test]
    fn test_visible_move_animates() {
        let mut world = setup();
        let mut knowledge = Knowledge::default();
        knowledge
            .positions
            .insert(Position::tile(2, 0), KnownState::Remembered);
        world.spawn((Player, knowledge));
        let enemy = world.spawn(EnemyBundle::new(Position::tile(2, 0))).id();
        world.resource_mut::<MoveResults>().push(MoveResult {
            entity: enemy,
            source: Position::tile(1, 0),
            destination: Position::tile(2, 0),
        });

        run(&mut world);

        let events = world.resource_mut::<SimEvents>().drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SimEvent::MoveAnimation(anim) => {
                assert_eq!(anim.entity, Some(enemy));
                assert_eq!(anim.duration_ms, 70);
                assert_eq!(anim.image, "undead");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(world.resource::<MoveResults>().is_empty());
    }

    #[test]
    fn test_unknown_destination_is_dropped() {
        let mut world = setup();
        world.spawn((Player, Knowledge::default()));
        let enemy = world.spawn(EnemyBundle::new(Position::tile(5, 5))).id();
        world.resource_mut::<MoveResults>().push(MoveResult {
            entity: enemy,
            source: Position::tile(4, 5),
            destination: Position::tile(5, 5),
        });

        run(&mut world);

        assert!(world.resource::<SimEvents>().is_empty());
        assert!(world.resource::<MoveResults>().is_empty());
    }
}
