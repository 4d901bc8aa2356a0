//! Tile predicates shared by the gameplay systems.

use crate::components::{Clock, Physical, Position, Size};
use crate::spatial::SpatialIndex;
use bevy_ecs::prelude::*;

/// Resource naming the clock entity that drives action points.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock(pub Entity);

/// Current tick of the wall clock, if it exists.
pub fn wall_tick(wall: Option<&WallClock>, clocks: &Query<&Clock>) -> Option<u64> {
    let wall = wall?;
    clocks.get(wall.0).ok().map(|c| c.current_tick)
}

/// Whether any indexed entity on `pos` matches `pred` on its `Physical`.
pub fn any_physical(
    index: &SpatialIndex,
    physicals: &Query<&Physical>,
    pos: &Position,
    pred: impl Fn(&Physical) -> bool,
) -> bool {
    index
        .at(pos)
        .iter()
        .any(|e| physicals.get(*e).map(&pred).unwrap_or(false))
}

/// A FILL entity sits on exactly this tile.
pub fn has_fill(index: &SpatialIndex, physicals: &Query<&Physical>, pos: &Position) -> bool {
    any_physical(index, physicals, pos, Physical::is_fill)
}

/// Floor below and nothing filling the tile itself.
pub fn is_walkable(index: &SpatialIndex, physicals: &Query<&Physical>, pos: &Position) -> bool {
    has_fill(index, physicals, &pos.below()) && !has_fill(index, physicals, pos)
}

/// Something of MEDIUM size or larger already stands here.
pub fn is_crowded(index: &SpatialIndex, physicals: &Query<&Physical>, pos: &Position) -> bool {
    any_physical(index, physicals, pos, |p| p.size >= Size::Medium)
}
