//! Dijkstra system - the player-centred distance field.
//!
//! AI actors walk down this field and level setup uses it to place the exit.
//! The field is only rebuilt when the player has moved since the last build,
//! so terrain changes are picked up on the next player step.

use crate::components::*;
use crate::spatial::SpatialIndex;
use crate::systems::util::is_walkable;
use bevy_ecs::prelude::*;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

type Cell = (i32, i32);

/// Shortest step counts from `source` over the 8-connected `walkable` cells.
///
/// The source is always included at distance 0. Cells that cannot be
/// reached are absent.
pub fn distance_field(walkable: &HashSet<Cell>, source: Cell) -> HashMap<Cell, u32> {
    let mut dist: HashMap<Cell, u32> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    dist.insert(source, 0);
    frontier.push(Reverse((0u32, source)));

    while let Some(Reverse((cost, (x, y)))) = frontier.pop() {
        if dist.get(&(x, y)).is_some_and(|&best| cost > best) {
            continue;
        }
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let next = (x + dx, y + dy);
                if !walkable.contains(&next) {
                    continue;
                }
                let new_cost = cost + 1;
                if dist.get(&next).map_or(true, |&known| new_cost < known) {
                    dist.insert(next, new_cost);
                    frontier.push(Reverse((new_cost, next)));
                }
            }
        }
    }
    dist
}

/// System that rebuilds the player's `DijkstraMap` when the player moves.
///
/// ## Data Access
/// - Reads: SpatialIndex, Position, Physical
/// - Writes: DijkstraMap on the player (inserted if missing)
pub fn dijkstra_system(
    mut commands: Commands,
    index: Res<SpatialIndex>,
    physicals: Query<&Physical>,
    tiles: Query<&Position, With<Physical>>,
    mut players: Query<(Entity, &Position, Option<&mut DijkstraMap>), With<Player>>,
) {
    for (entity, pos, field) in players.iter_mut() {
        let locus = pos.on_layer(OCCUPANT_LAYER);
        if field.as_ref().is_some_and(|f| f.locus == Some(locus)) {
            continue;
        }

        let mut walkable: HashSet<Cell> = HashSet::new();
        for tile in tiles.iter() {
            let cell = (tile.x, tile.y);
            if walkable.contains(&cell) {
                continue;
            }
            if is_walkable(&index, &physicals, &Position::tile(tile.x, tile.y)) {
                walkable.insert(cell);
            }
        }

        let distances: HashMap<Position, u32> = distance_field(&walkable, (locus.x, locus.y))
            .into_iter()
            .map(|((x, y), d)| (Position::tile(x, y), d))
            .collect();
        tracing::debug!(locus = %locus, reachable = distances.len(), "distance field rebuilt");

        let rebuilt = DijkstraMap {
            locus: Some(locus),
            distances,
        };
        match field {
            Some(mut existing) => *existing = rebuilt,
            None => {
                commands.entity(entity).insert(rebuilt);
            }
        }
    }
}
