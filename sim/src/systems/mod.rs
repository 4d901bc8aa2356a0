//! ECS Systems for the Dread Halls simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Pipeline Order
//!
//! One pass runs every system once, strictly in this order, each seeing the
//! changes made by the ones before it:
//!
//! 1. `lighting_system` - per-tile light levels
//! 2. `spawner_system` - nests produce new actors
//! 3. `ai_controller_system` - actors pick their next step
//! 4. `combat_system` - steps into defenders become attacks
//! 5. `dismantle_system` - steps into destructibles become demolition
//! 6. `movement_system` - remaining steps are applied
//! 7. `move_result_system` - visible steps become animations
//! 8. `fov_system` - viewers rebuild their knowledge
//! 9. `dijkstra_system` - the player distance field follows the player
//! 10. `projectile_system` - ranged shots resolve
//! 11. `reaper_system` - the dead are removed
//! 12. `time_flow_system` - clocks advance
//! 13. `game_ender_system` - end conditions are checked
//!
//! The spatial index is rebuilt before step 1.

pub mod ai;
pub mod combat;
pub mod dijkstra;
pub mod dismantle;
pub mod fov;
pub mod game_ender;
pub mod lighting;
pub mod move_result;
pub mod movement;
pub mod projectiles;
pub mod reaper;
pub mod spawn;
pub mod time_flow;
pub mod util;

pub use ai::*;
pub use combat::*;
pub use dijkstra::*;
pub use dismantle::*;
pub use fov::*;
pub use game_ender::*;
pub use lighting::*;
pub use move_result::*;
pub use movement::*;
pub use projectiles::*;
pub use reaper::*;
pub use spawn::*;
pub use time_flow::*;
pub use util::*;

use crate::spatial::spatial_index_update_system;
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

/// Schedule running one full pipeline pass.
pub fn turn_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            spatial_index_update_system,
            lighting_system,
            spawner_system,
            ai_controller_system,
            combat_system,
            dismantle_system,
            movement_system,
            move_result_system,
            fov_system,
            dijkstra_system,
            projectile_system,
            reaper_system,
            time_flow_system,
            game_ender_system,
        )
            .chain(),
    );
    schedule
}

/// Schedule that derives light, knowledge and the distance field for a
/// freshly built level without advancing anything.
pub fn setup_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            spatial_index_update_system,
            lighting_system,
            fov_system,
            dijkstra_system,
        )
            .chain(),
    );
    schedule
}
