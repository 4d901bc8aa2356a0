//! Time flow system - advances every clock by the queued increments.

use crate::components::Clock;
use crate::signals::PendingTime;
use bevy_ecs::prelude::*;

/// System that applies each pending increment to every clock, then clears them.
pub fn time_flow_system(mut pending: ResMut<PendingTime>, mut clocks: Query<&mut Clock>) {
    for ticks in pending.drain() {
        for mut clock in clocks.iter_mut() {
            clock.current_tick += ticks;
        }
        tracing::trace!(ticks, "time advanced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increments_apply_to_all_clocks() {
        let mut world = World::new();
        world.insert_resource(PendingTime::default());
        let wall = world.spawn(Clock::new("wall", 0)).id();
        let other = world.spawn(Clock::new("ritual", 40)).id();
        world.resource_mut::<PendingTime>().push(100);
        world.resource_mut::<PendingTime>().push(25);

        let mut schedule = Schedule::default();
        schedule.add_systems(time_flow_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Clock>(wall).unwrap().current_tick, 125);
        assert_eq!(world.get::<Clock>(other).unwrap().current_tick, 165);
        assert!(world.resource::<PendingTime>().is_empty());

        // Nothing queued: clocks stand still.
        schedule.run(&mut world);
        assert_eq!(world.get::<Clock>(wall).unwrap().current_tick, 125);
    }
}
