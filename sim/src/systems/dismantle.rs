//! Dismantle system - walking into a destructible object hacks at it.

use crate::components::*;
use crate::signals::MoveIntents;
use crate::spatial::SpatialIndex;
use bevy_ecs::prelude::*;

/// System that converts move intents aimed at destructibles into damage.
///
/// AI-controlled movers never dismantle. Movers without a `Combat` block have
/// nothing to hit with and keep their intent.
pub fn dismantle_system(
    mut intents: ResMut<MoveIntents>,
    index: Res<SpatialIndex>,
    movers: Query<(Option<&Combat>, Has<AIControlled>)>,
    mut targets: Query<&mut Health, With<Destructible>>,
) {
    for intent in intents.snapshot() {
        let Ok((combat, is_ai)) = movers.get(intent.entity) else {
            continue;
        };
        if is_ai {
            continue;
        }
        let Some(combat) = combat else {
            continue;
        };

        let Some(target) = index
            .at(&intent.target)
            .iter()
            .rev()
            .copied()
            .find(|e| targets.contains(*e))
        else {
            continue;
        };

        if let Ok(mut health) = targets.get_mut(target) {
            health.damage(combat.damage);
            tracing::debug!(
                dismantler = ?intent.entity,
                ?target,
                damage = combat.damage,
                remaining = health.current,
                "dismantling"
            );
        }
        intents.consume(intent.entity);
    }
}
