//! Movement system - applies the move intents that are still plain steps.

use crate::components::*;
use crate::signals::{MoveIntents, MoveResult, MoveResults};
use crate::spatial::SpatialIndex;
use crate::systems::util::is_walkable;
use bevy_ecs::prelude::*;

/// System that moves entities onto their intended tile.
///
/// A step succeeds when the tile below the target is filled (a floor) and
/// nothing fills the target itself. Every intent is consumed here, applied
/// or not. Stepping onto the current tile is a successful no-op and reports
/// no result.
pub fn movement_system(
    mut intents: ResMut<MoveIntents>,
    mut results: ResMut<MoveResults>,
    mut index: ResMut<SpatialIndex>,
    physicals: Query<&Physical>,
    mut movers: Query<&mut Position>,
) {
    for intent in intents.drain() {
        let Ok(mut pos) = movers.get_mut(intent.entity) else {
            continue;
        };
        if *pos == intent.target {
            continue;
        }

        if !is_walkable(&index, &physicals, &intent.target) {
            tracing::debug!(entity = ?intent.entity, target = %intent.target, "move blocked");
            continue;
        }

        let source = *pos;
        *pos = intent.target;
        index.insert(intent.entity, intent.target);
        results.push(MoveResult {
            entity: intent.entity,
            source,
            destination: intent.target,
        });
    }
}
