//! Snapshot types.
//!
//! The `Snapshot` struct provides a serializable, read-only view of the
//! simulation state for the presentation layer.

use crate::components::*;
use crate::intent::InputMode;
use crate::systems::WallClock;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Something the presentation layer should draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub image: String,
    pub z_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub health: i32,
    pub health_max: i32,
}

/// Light level on a single tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSnapshot {
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
}

/// A tile the player has seen, now or earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownTileSnapshot {
    pub x: i32,
    pub y: i32,
    pub current: bool,
}

/// Complete simulation state snapshot for the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Wall clock tick.
    pub tick: u64,
    /// Pipeline passes run so far.
    pub passes: u64,
    pub game_over: bool,
    pub mode: InputMode,
    pub player: Option<PlayerSnapshot>,
    /// Drawables in ascending z-order.
    pub renderables: Vec<EntitySnapshot>,
    pub lights: Vec<LightSnapshot>,
    pub known: Vec<KnownTileSnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(
        world: &mut World,
        player: Option<Entity>,
        mode: InputMode,
        passes: u64,
        game_over: bool,
    ) -> Self {
        let renderables = sorted_renderables(world)
            .into_iter()
            .map(|(entity, pos, r)| EntitySnapshot {
                id: entity.to_bits(),
                x: pos.x,
                y: pos.y,
                z: pos.z,
                image: r.image,
                z_order: r.z_order,
            })
            .collect();

        let mut light_query = world.query::<(&Position, &LightLevel)>();
        let mut lights: Vec<LightSnapshot> = light_query
            .iter(world)
            .map(|(pos, level)| LightSnapshot {
                x: pos.x,
                y: pos.y,
                color: level.color,
            })
            .collect();
        lights.sort_by_key(|l| (l.x, l.y));

        let player_entity = player.filter(|e| world.entities().contains(*e));
        let player = player_entity.and_then(|e| {
            let pos = world.get::<Position>(e)?;
            let health = world.get::<Health>(e)?;
            Some(PlayerSnapshot {
                id: e.to_bits(),
                x: pos.x,
                y: pos.y,
                health: health.current,
                health_max: health.max,
            })
        });

        let mut known: Vec<KnownTileSnapshot> = player_entity
            .and_then(|e| world.get::<Knowledge>(e))
            .map(|k| {
                k.positions
                    .iter()
                    .map(|(pos, state)| KnownTileSnapshot {
                        x: pos.x,
                        y: pos.y,
                        current: *state == KnownState::Current,
                    })
                    .collect()
            })
            .unwrap_or_default();
        known.sort_by_key(|t| (t.x, t.y));

        Self {
            tick: wall_clock_tick(world),
            passes,
            game_over,
            mode,
            player,
            renderables,
            lights,
            known,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Every positioned drawable, ordered by z-order (stable on position).
pub fn sorted_renderables(world: &mut World) -> Vec<(Entity, Position, Renderable)> {
    let mut query = world.query::<(Entity, &Position, &Renderable)>();
    let mut out: Vec<(Entity, Position, Renderable)> = query
        .iter(world)
        .map(|(e, p, r)| (e, *p, r.clone()))
        .collect();
    out.sort_by(|a, b| a.2.z_order.cmp(&b.2.z_order).then(a.1.cmp(&b.1)));
    out
}

/// Current tick of the wall clock, 0 before a level exists.
pub fn wall_clock_tick(world: &World) -> u64 {
    world
        .get_resource::<WallClock>()
        .and_then(|wall| world.get::<Clock>(wall.0))
        .map_or(0, |clock| clock.current_tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderables_sorted_by_z_order() {
        let mut world = World::new();
        world.spawn(PlayerBundle::new(Position::tile(1, 1)));
        world.spawn(FloorBundle::new(1, 1));
        world.spawn(WallBundle::new(0, 0));

        let images: Vec<String> = sorted_renderables(&mut world)
            .into_iter()
            .map(|(_, _, r)| r.image)
            .collect();
        assert_eq!(images, vec!["floor", "wall", "player"]);
    }

    #[test]
    fn test_snapshot_json() {
        let mut world = World::new();
        let player = world.spawn(PlayerBundle::new(Position::tile(2, 3))).id();
        let clock = world.spawn(Clock::new("wallclock", 300)).id();
        world.insert_resource(WallClock(clock));

        let snapshot = Snapshot::from_world(&mut world, Some(player), InputMode::PlayerControl, 6, false);
        assert_eq!(snapshot.tick, 300);
        assert_eq!(snapshot.player.as_ref().map(|p| (p.x, p.y)), Some((2, 3)));

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("renderables"));
        assert!(json.contains("PlayerControl"));
    }

    #[test]
    fn test_snapshot_without_player() {
        let mut world = World::new();
        let gone = world.spawn_empty().id();
        world.despawn(gone);

        let snapshot = Snapshot::from_world(&mut world, Some(gone), InputMode::default(), 0, true);
        assert!(snapshot.player.is_none());
        assert!(snapshot.known.is_empty());
        assert_eq!(snapshot.tick, 0);
    }
}
