//! Game ender - watches end-game conditions.

use crate::components::*;
use crate::components::Condition;
use crate::error::{SimError, SimResult};
use crate::signals::{GameStatus, PipelineFault, SimEvent, SimEvents};
use bevy_ecs::prelude::*;

/// System that fires the one-shot game-over notification.
///
/// Malformed conditions are recorded as pipeline faults and skipped.
pub fn game_ender_system(
    mut status: ResMut<GameStatus>,
    mut events: ResMut<SimEvents>,
    mut fault: ResMut<PipelineFault>,
    enders: Query<(Entity, &Conditional, Option<&Position>, Option<&ParentLink>), With<EndGame>>,
    positions: Query<&Position>,
) {
    if status.over {
        return;
    }

    for (entity, conditional, own, parent) in enders.iter() {
        match evaluate(entity, &conditional.condition, own, parent, &positions) {
            Ok(true) => {
                status.over = true;
                events.push(SimEvent::GameOver);
                tracing::info!(trigger = ?entity, "game over");
                return;
            }
            Ok(false) => {}
            Err(err) => fault.raise(err),
        }
    }
}

/// Whether `condition`, owned by `owner`, currently holds.
pub fn evaluate(
    owner: Entity,
    condition: &Condition,
    own: Option<&Position>,
    parent: Option<&ParentLink>,
    positions: &Query<&Position>,
) -> SimResult<bool> {
    match *condition {
        Condition::Proximity {
            range,
            specific_entity,
        } => {
            let specific = specific_entity.ok_or_else(|| {
                SimError::invalid(format!(
                    "proximity condition on {owner:?} has no specific entity"
                ))
            })?;

            let anchor = match (own, parent) {
                (Some(pos), _) => *pos,
                (None, Some(link)) => *positions.get(link.parent).map_err(|_| {
                    SimError::missing(format!(
                        "parent {:?} of condition {owner:?} has no position",
                        link.parent
                    ))
                })?,
                (None, None) => {
                    return Err(SimError::missing(format!(
                        "condition {owner:?} has neither a position nor a parent"
                    )))
                }
            };

            let Ok(target) = positions.get(specific) else {
                tracing::debug!(?owner, ?specific, "proximity target has no position");
                return Ok(false);
            };
            Ok(anchor.distance_to(target) <= range)
        }
    }
}
