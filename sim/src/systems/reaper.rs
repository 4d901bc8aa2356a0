//! Reaper system - removes the dead and everything they own.

use crate::components::*;
use crate::signals::{SimEvent, SimEvents};
use crate::spatial::SpatialIndex;
use bevy_ecs::entity::Entities;
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// System that despawns entities whose health dropped below zero.
///
/// Health of exactly zero survives the pass. Removal cascades through
/// `CompositeLink` children, depth first, children before their owner.
/// Ids that are already gone are skipped.
pub fn reaper_system(
    mut commands: Commands,
    mut index: ResMut<SpatialIndex>,
    mut events: ResMut<SimEvents>,
    entities: &Entities,
    healths: Query<(Entity, &Health)>,
    links: Query<&CompositeLink>,
) {
    let mut removed: HashSet<Entity> = HashSet::new();

    for (entity, health) in healths.iter() {
        if !health.is_dead() {
            continue;
        }
        let mut doomed = Vec::new();
        collect_cascade(entity, &links, entities, &mut removed, &mut doomed);

        for victim in doomed {
            if let Some(mut cmds) = commands.get_entity(victim) {
                cmds.despawn();
            }
            index.remove(victim);
            events.push(SimEvent::EntityRemoved(victim));
        }
        tracing::debug!(?entity, health = health.current, "reaped");
    }
}

/// Post-order walk of the composite graph rooted at `root`.
fn collect_cascade(
    root: Entity,
    links: &Query<&CompositeLink>,
    entities: &Entities,
    visited: &mut HashSet<Entity>,
    out: &mut Vec<Entity>,
) {
    if !entities.contains(root) || !visited.insert(root) {
        return;
    }
    if let Ok(link) = links.get(root) {
        for child in &link.children {
            collect_cascade(*child, links, entities, visited, out);
        }
    }
    out.push(root);
}
