//! Exact-tile spatial index.
//!
//! Every entity carrying a `Position` is discoverable by looking up that
//! tile. The index is rebuilt at the start of each pipeline pass and kept
//! current within the pass by the systems that create, move or remove
//! positioned entities.

use crate::components::Position;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Tile-keyed entity lookup.
#[derive(Resource, Debug, Default)]
pub struct SpatialIndex {
    /// Map from tile to the entities standing on it.
    tiles: HashMap<Position, Vec<Entity>>,
    /// Reverse lookup: entity to tile.
    entity_tiles: HashMap<Entity, Position>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all entries (start of each pass, before rebuilding).
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.entity_tiles.clear();
    }

    /// Insert an entity at a tile, relocating it if it was indexed elsewhere.
    pub fn insert(&mut self, entity: Entity, pos: Position) {
        if let Some(&old) = self.entity_tiles.get(&entity) {
            if old == pos {
                return;
            }
            self.detach(entity, old);
        }
        self.tiles.entry(pos).or_default().push(entity);
        self.entity_tiles.insert(entity, pos);
    }

    /// Remove an entity. Unknown entities are ignored.
    pub fn remove(&mut self, entity: Entity) {
        if let Some(pos) = self.entity_tiles.remove(&entity) {
            self.detach(entity, pos);
        }
    }

    fn detach(&mut self, entity: Entity, pos: Position) {
        if let Some(entries) = self.tiles.get_mut(&pos) {
            entries.retain(|e| *e != entity);
            if entries.is_empty() {
                self.tiles.remove(&pos);
            }
        }
    }

    /// Entities on exactly this tile, in insertion order.
    pub fn at(&self, pos: &Position) -> &[Entity] {
        self.tiles.get(pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position_of(&self, entity: Entity) -> Option<Position> {
        self.entity_tiles.get(&entity).copied()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entity_tiles.contains_key(&entity)
    }

    /// Get total entity count.
    pub fn total_count(&self) -> usize {
        self.entity_tiles.len()
    }

    /// Number of occupied tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// All occupied tiles (for debugging/visualization).
    pub fn tiles(&self) -> impl Iterator<Item = (&Position, &Vec<Entity>)> {
        self.tiles.iter()
    }
}

/// System that rebuilds the spatial index from every positioned entity.
pub fn spatial_index_update_system(
    mut index: ResMut<SpatialIndex>,
    query: Query<(Entity, &Position)>,
) {
    index.clear();

    for (entity, pos) in query.iter() {
        index.insert(entity, *pos);
    }
}
