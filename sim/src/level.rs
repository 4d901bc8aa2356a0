//! Level ingestion.
//!
//! A dungeon generator outside the core hands over a grid of wall/floor
//! cells plus room rectangles. `build_level` turns that into entities, places
//! the cast, derives light, knowledge and the player's distance field, and
//! finally puts the exit portal as far from the player as the map allows.

use crate::components::*;
use crate::components::Condition;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::signals::{SimEvent, SimEvents, SimRng};
use crate::spatial::SpatialIndex;
use crate::systems::{setup_schedule, WallClock};
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Name of the clock every actor is timed against.
pub const WALL_CLOCK_NAME: &str = "wallclock";

const PORTAL_IMAGE: &str = "portal";
const PORTAL_Z_ORDER: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Floor,
}

/// Axis-aligned room, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Room {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Centre tile, halves rounded up.
    pub fn centre(&self) -> Position {
        Position::tile(
            (self.left + self.right + 1).div_euclid(2),
            (self.top + self.bottom + 1).div_euclid(2),
        )
    }

    /// Occupant-layer tiles, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = Position> + '_ {
        (self.left..=self.right)
            .flat_map(move |x| (self.top..=self.bottom).map(move |y| Position::tile(x, y)))
    }
}

/// Generator output consumed once at level start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub width: i32,
    pub height: i32,
    /// Row-major, `width * height` long.
    pub cells: Vec<Cell>,
    pub rooms: Vec<Room>,
}

impl LevelLayout {
    /// Build a layout from text rows, `#` for wall and `.` for floor.
    pub fn from_ascii(rows: &[&str], rooms: Vec<Room>) -> SimResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut cells = Vec::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(SimError::invalid(format!(
                    "row {y} is {} wide, expected {width}",
                    row.chars().count()
                )));
            }
            for ch in row.chars() {
                cells.push(match ch {
                    '#' => Cell::Wall,
                    '.' => Cell::Floor,
                    other => {
                        return Err(SimError::invalid(format!(
                            "unknown map glyph {other:?} in row {y}"
                        )))
                    }
                });
            }
        }

        let layout = Self {
            width: i32::try_from(width)
                .map_err(|_| SimError::invalid("map too wide"))?,
            height: i32::try_from(height)
                .map_err(|_| SimError::invalid("map too tall"))?,
            cells,
            rooms,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(SimError::invalid("level has no cells"));
        }
        let expected = self.width as usize * self.height as usize;
        if self.cells.len() != expected {
            return Err(SimError::invalid(format!(
                "level has {} cells, {}x{} needs {expected}",
                self.cells.len(),
                self.width,
                self.height
            )));
        }
        if self.rooms.len() < 2 {
            return Err(SimError::invalid(format!(
                "level needs at least 2 rooms, got {}",
                self.rooms.len()
            )));
        }
        for room in &self.rooms {
            let inside = 0 <= room.left
                && room.left <= room.right
                && room.right < self.width
                && 0 <= room.top
                && room.top <= room.bottom
                && room.bottom < self.height;
            if !inside {
                return Err(SimError::invalid(format!(
                    "room {room:?} lies outside the {}x{} grid",
                    self.width, self.height
                )));
            }
        }
        Ok(())
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get((y * self.width + x) as usize).copied()
    }

    fn iter_cells(&self) -> impl Iterator<Item = (i32, i32, Cell)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (i as i32 % width, i as i32 / width, *c))
    }
}

/// Entities the simulation keeps track of after the level is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelHandles {
    pub player: Entity,
    pub wall_clock: Entity,
    pub portal: Entity,
}

/// Populate `world` from `layout`.
///
/// Requires the simulation resources (config, RNG, spatial index, event log)
/// to be present already.
pub fn build_level(world: &mut World, layout: &LevelLayout) -> SimResult<LevelHandles> {
    layout.validate()?;
    for (present, name) in [
        (world.contains_resource::<SimConfig>(), "SimConfig"),
        (world.contains_resource::<SimRng>(), "SimRng"),
        (world.contains_resource::<SpatialIndex>(), "SpatialIndex"),
        (world.contains_resource::<SimEvents>(), "SimEvents"),
    ] {
        if !present {
            return Err(SimError::missing(format!("{name} resource is not installed")));
        }
    }

    let mut created = Vec::new();

    for (x, y, cell) in layout.iter_cells() {
        created.push(world.spawn(FloorBundle::new(x, y)).id());
        if cell == Cell::Wall {
            created.push(world.spawn(WallBundle::new(x, y)).id());
        }
    }

    let (player, rest) = world.resource_scope(|world, mut rng: Mut<SimRng>| {
        place_cast(world, layout, &mut rng.0, &mut created)
    });

    let wall_clock = world.spawn(Clock::new(WALL_CLOCK_NAME, 0)).id();
    world.insert_resource(WallClock(wall_clock));
    tracing::debug!(?player, rooms_left = rest, "cast placed");

    setup_schedule().run(world);

    let portal = place_portal(world, player, &mut created)?;

    let mut events = world.resource_mut::<SimEvents>();
    for entity in &created {
        events.push(SimEvent::EntityCreated(*entity));
    }

    tracing::info!(
        width = layout.width,
        height = layout.height,
        rooms = layout.rooms.len(),
        entities = created.len(),
        "level built"
    );

    Ok(LevelHandles {
        player,
        wall_clock,
        portal,
    })
}

/// Player, lamps, spawners and the first enemies. Returns the player and
/// the number of rooms left unclaimed.
fn place_cast<R: Rng>(
    world: &mut World,
    layout: &LevelLayout,
    rng: &mut R,
    created: &mut Vec<Entity>,
) -> (Entity, usize) {
    let mut rooms = layout.rooms.clone();

    let player_room = rooms.remove(rng.gen_range(0..rooms.len()));
    let player_pos = player_room.centre();
    let player = world.spawn(PlayerBundle::new(player_pos)).id();
    created.push(player);

    created.push(world.spawn(LampBundle::new(player_pos.offset(-1, 0))).id());
    for room in &rooms {
        created.push(world.spawn(LampBundle::new(room.centre())).id());
    }

    let nests = rooms.len().saturating_sub(2);
    for _ in 0..nests {
        let room = rooms[rng.gen_range(0..rooms.len())];
        let free: Vec<Position> = room.tiles().filter(|p| is_free(world, p)).collect();
        if free.is_empty() {
            tracing::warn!(?room, "no free tile for a spawner");
            continue;
        }
        let at = free[rng.gen_range(0..free.len())];
        created.push(world.spawn(SpawnerBundle::new(at)).id());
    }

    let enemy_room = rooms.remove(rng.gen_range(0..rooms.len()));
    let centre = enemy_room.centre();
    for pos in [centre, centre.offset(1, 0)] {
        created.push(world.spawn(EnemyBundle::new(pos)).id());
    }

    (player, rooms.len())
}

/// No medium or larger occupant on the tile.
fn is_free(world: &mut World, pos: &Position) -> bool {
    let mut query = world.query::<(&Position, &Physical)>();
    !query
        .iter(world)
        .any(|(p, phys)| p == pos && phys.size >= Size::Medium)
}

fn place_portal(world: &mut World, player: Entity, created: &mut Vec<Entity>) -> SimResult<Entity> {
    let map = world
        .get::<DijkstraMap>(player)
        .ok_or_else(|| SimError::missing("player has no distance field after setup"))?;

    let mut ordered: Vec<(Position, u32)> = map.distances.iter().map(|(p, d)| (*p, *d)).collect();
    ordered.sort_by(|(pa, da), (pb, db)| db.cmp(da).then(pa.cmp(pb)));

    let spot = {
        let mut physicals = world.query::<&Physical>();
        let index = world.resource::<SpatialIndex>();
        ordered.into_iter().map(|(p, _)| p).find(|p| {
            index.at(p).iter().all(|e| {
                physicals
                    .get(world, *e)
                    .map_or(true, |phys| phys.size < Size::Medium)
            })
        })
    };
    let spot = spot.ok_or_else(|| SimError::missing("no reachable free tile for the portal"))?;

    let portal = world
        .spawn((
            spot,
            Renderable::new(PORTAL_IMAGE, PORTAL_Z_ORDER),
            Physical::new(Size::Large, Dynamism::Static),
        ))
        .id();
    let trigger = world
        .spawn((
            EndGame,
            Conditional {
                condition: Condition::Proximity {
                    range: 0.0,
                    specific_entity: Some(player),
                },
            },
            ParentLink { parent: portal },
        ))
        .id();
    world.entity_mut(portal).insert(CompositeLink {
        children: vec![trigger],
    });
    world.resource_mut::<SpatialIndex>().insert(portal, spot);

    created.push(portal);
    created.push(trigger);
    tracing::debug!(?portal, at = %spot, "portal placed");
    Ok(portal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::init_resources;

    const MAP: [&str; 7] = [
        "###########",
        "#...#.....#",
        "#...#.....#",
        "#.........#",
        "#...#.....#",
        "#...#.....#",
        "###########",
    ];

    fn rooms() -> Vec<Room> {
        vec![Room::new(1, 1, 3, 5), Room::new(5, 1, 9, 5)]
    }

    fn world_with(seed: u64) -> World {
        let mut world = World::new();
        init_resources(
            &mut world,
            SimConfig {
                seed,
                ..Default::default()
            },
        );
        world
    }

    #[test]
    fn test_room_centre_rounds_up() {
        assert_eq!(Room::new(1, 1, 3, 5).centre(), Position::tile(2, 3));
        assert_eq!(Room::new(5, 1, 8, 4).centre(), Position::tile(7, 3));
        assert_eq!(Room::new(0, 0, 1, 1).tiles().count(), 4);
    }

    #[test]
    fn test_layout_validation() {
        assert!(LevelLayout::from_ascii(&MAP, rooms()).is_ok());
        assert!(matches!(
            LevelLayout::from_ascii(&MAP, vec![Room::new(1, 1, 3, 5)]),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(LevelLayout::from_ascii(&MAP, vec![Room::new(1, 1, 3, 5), Room::new(5, 1, 11, 5)]).is_err());
        assert!(LevelLayout::from_ascii(&["##", "#"], rooms()).is_err());
        assert!(LevelLayout::from_ascii(&["#x"], rooms()).is_err());

        let mut layout = LevelLayout::from_ascii(&MAP, rooms()).unwrap();
        layout.cells.pop();
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_build_places_cast() {
        let layout = LevelLayout::from_ascii(&MAP, rooms()).unwrap();
        let mut world = world_with(3);

        let handles = build_level(&mut world, &layout).unwrap();

        let player_pos = *world.get::<Position>(handles.player).unwrap();
        assert!(rooms().iter().any(|r| r.centre() == player_pos));
        assert!(world.get::<Knowledge>(handles.player).is_some());
        assert!(world.get::<DijkstraMap>(handles.player).is_some());

        // Two rooms leave no spawners and both enemies in the other room.
        let enemies: Vec<Position> = world
            .query_filtered::<&Position, With<AIControlled>>()
            .iter(&world)
            .copied()
            .collect();
        assert_eq!(enemies.len(), 2);
        assert_eq!(world.query::<&Spawner>().iter(&world).count(), 0);

        let floors = world
            .query::<&Position>()
            .iter(&world)
            .filter(|p| p.z == FLOOR_LAYER)
            .count();
        assert_eq!(floors, 77);

        assert_eq!(world.resource::<WallClock>().0, handles.wall_clock);
        assert_eq!(world.get::<Clock>(handles.wall_clock).unwrap().current_tick, 0);
        assert!(!world.resource::<SimEvents>().is_empty());
    }

    #[test]
    fn test_portal_is_farthest_free_tile() {
        let layout = LevelLayout::from_ascii(&MAP, rooms()).unwrap();
        let mut world = world_with(11);

        let handles = build_level(&mut world, &layout).unwrap();

        let portal_pos = *world.get::<Position>(handles.portal).unwrap();
        let map = world.get::<DijkstraMap>(handles.player).unwrap();
        let portal_distance = map.distance(&portal_pos).unwrap();
        assert!(map.distances.values().all(|d| *d <= portal_distance));

        let link = world.get::<CompositeLink>(handles.portal).unwrap();
        assert_eq!(link.children.len(), 1);
        let trigger = link.children[0];
        assert!(world.get::<EndGame>(trigger).is_some());
        assert_eq!(world.get::<ParentLink>(trigger).unwrap().parent, handles.portal);
    }

    #[test]
    fn test_spawners_follow_room_count() {
        let map = [
            "#################",
            "#...#...#...#...#",
            "#...............#",
            "#...#...#...#...#",
            "#################",
        ];
        let rooms = vec![
            Room::new(1, 1, 3, 3),
            Room::new(5, 1, 7, 3),
            Room::new(9, 1, 11, 3),
            Room::new(13, 1, 15, 3),
        ];
        let layout = LevelLayout::from_ascii(&map, rooms.clone()).unwrap();
        let mut world = world_with(5);

        build_level(&mut world, &layout).unwrap();

        let nests: Vec<Position> = world
            .query_filtered::<&Position, With<Spawner>>()
            .iter(&world)
            .copied()
            .collect();
        // Four rooms: the player takes one and two are held back.
        assert_eq!(nests.len(), 1);
        assert!(rooms.iter().any(|r| r.tiles().any(|t| t == nests[0])));
        // Player, the lamp beside it and one lamp per other room.
        assert_eq!(world.query::<&LightSource>().iter(&world).count(), 5);
    }

    #[test]
    fn test_same_seed_same_level() {
        let layout = LevelLayout::from_ascii(&MAP, rooms()).unwrap();
        let place = |seed| {
            let mut world = world_with(seed);
            let handles = build_level(&mut world, &layout).unwrap();
            (
                *world.get::<Position>(handles.player).unwrap(),
                *world.get::<Position>(handles.portal).unwrap(),
            )
        };
        assert_eq!(place(9), place(9));
    }

    #[test]
    fn test_requires_resources() {
        let layout = LevelLayout::from_ascii(&MAP, rooms()).unwrap();
        let mut world = World::new();
        assert!(matches!(
            build_level(&mut world, &layout),
            Err(SimError::MissingPrerequisite(_))
        ));
    }
}
