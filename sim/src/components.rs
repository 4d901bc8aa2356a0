//! ECS Components for the Dread Halls simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Layer holding floor tiles.
pub const FLOOR_LAYER: i32 = -1;
/// Layer holding walls, actors and items.
pub const OCCUPANT_LAYER: i32 = 0;

/// Tile coordinate. `z` selects the layer (-1 floor, 0 occupants).
///
/// Equality and hashing are structural, so two positions with the same
/// coordinates are interchangeable keys in every position-keyed map.
/// A move replaces the component wholesale.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Position on the occupant layer.
    pub const fn tile(x: i32, y: i32) -> Self {
        Self::new(x, y, OCCUPANT_LAYER)
    }

    /// Canonical key used by the spatial index.
    #[inline]
    pub fn key(&self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }

    /// The tile one layer below.
    pub fn below(&self) -> Self {
        Self::new(self.x, self.y, self.z - 1)
    }

    /// Same column, moved onto another layer.
    pub fn on_layer(&self, z: i32) -> Self {
        Self::new(self.x, self.y, z)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z)
    }

    /// Euclidean distance in the x/y plane.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// The eight surrounding tiles on the same layer, column by column.
    pub fn neighbours(&self) -> [Position; 8] {
        let mut around = [*self; 8];
        let mut i = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                around[i] = self.offset(dx, dy);
                i += 1;
            }
        }
        around
    }

    /// Whether `other` differs from this tile along a single axis only.
    pub fn is_cardinal_to(&self, other: &Position) -> bool {
        self.x == other.x || self.y == other.y
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Physical footprint, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Size {
    Small,
    Medium,
    Large,
    /// Fills its tile: blocks movement, sight and projectiles on its layer.
    Fill,
}

/// Whether a physical thing ever moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dynamism {
    Static,
    Dynamic,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Physical {
    pub size: Size,
    pub dynamism: Dynamism,
}

impl Physical {
    pub const fn new(size: Size, dynamism: Dynamism) -> Self {
        Self { size, dynamism }
    }

    #[inline]
    pub fn is_fill(&self) -> bool {
        self.size == Size::Fill
    }
}

/// Sprite reference for the presentation layer.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderable {
    pub image: String,
    pub z_order: i32,
}

impl Renderable {
    pub fn new(image: impl Into<String>, z_order: i32) -> Self {
        Self {
            image: image.into(),
            z_order,
        }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Hit points. `current` may dip below zero until the reaper runs.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn damage(&mut self, amount: i32) {
        self.current -= amount;
    }

    /// Dead entities are swept by the reaper; zero is still alive.
    pub fn is_dead(&self) -> bool {
        self.current < 0
    }
}

/// Melee stat block.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combat {
    pub skill: i32,
    pub damage: i32,
    pub armor: i32,
}

impl Combat {
    pub const fn new(skill: i32, damage: i32, armor: i32) -> Self {
        Self { skill, damage, armor }
    }
}

/// Marker for things that can be hacked apart by walking into them.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Destructible;

// ============================================================================
// PERCEPTION COMPONENTS
// ============================================================================

/// Vision radius in tiles.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sight {
    pub range: u32,
}

/// What a viewer knows about a tile. Unknown tiles are simply absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownState {
    /// Inside the viewer's field of view this pass.
    Current,
    /// Seen before, not currently in view.
    Remembered,
}

/// Per-viewer memory of the map, rebuilt every FOV pass.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Knowledge {
    pub positions: HashMap<Position, KnownState>,
}

impl Knowledge {
    pub fn state_at(&self, pos: &Position) -> Option<KnownState> {
        self.positions.get(pos).copied()
    }

    pub fn is_current(&self, pos: &Position) -> bool {
        self.state_at(pos) == Some(KnownState::Current)
    }

    pub fn knows(&self, pos: &Position) -> bool {
        self.positions.contains_key(pos)
    }
}

/// Shortest-path distances to `locus` over walkable tiles.
///
/// Unreachable tiles have no entry.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct DijkstraMap {
    pub locus: Option<Position>,
    pub distances: HashMap<Position, u32>,
}

impl DijkstraMap {
    pub fn distance(&self, pos: &Position) -> Option<u32> {
        self.distances.get(pos).copied()
    }
}

// ============================================================================
// LIGHT COMPONENTS
// ============================================================================

/// Per-channel light intensity.
pub type Rgb = [u32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightStrength {
    Low,
    Medium,
    High,
}

impl LightStrength {
    pub fn color(&self) -> Rgb {
        match self {
            LightStrength::Low => [100, 100, 100],
            LightStrength::Medium => [180, 180, 180],
            LightStrength::High => [255, 255, 255],
        }
    }
}

/// Emitter of light.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSource {
    pub strength: LightStrength,
}

/// Aggregate light that reached a tile during the last lighting pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightLevel {
    pub color: Rgb,
}

// ============================================================================
// AI / TIME COMPONENTS
// ============================================================================

/// Marker for the entity driven by player intents.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Action-point accounting for a computer-controlled actor.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIControlled {
    pub last_action_tick: u64,
    pub action_cost: u64,
}

impl AIControlled {
    pub const fn new(last_action_tick: u64, action_cost: u64) -> Self {
        Self {
            last_action_tick,
            action_cost,
        }
    }

    /// Ticks accrued since the last action.
    #[inline]
    pub fn action_points(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_action_tick)
    }

    #[inline]
    pub fn can_act(&self, now: u64) -> bool {
        self.action_points(now) >= self.action_cost
    }
}

/// Named tick counter.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub name: String,
    pub current_tick: u64,
}

impl Clock {
    pub fn new(name: impl Into<String>, current_tick: u64) -> Self {
        Self {
            name: name.into(),
            current_tick,
        }
    }
}

// ============================================================================
// SPAWNING
// ============================================================================

/// Components stamped onto every entity a spawner creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnTemplate {
    pub renderable: Renderable,
    pub health: Health,
    pub physical: Physical,
    pub combat: Combat,
}

/// Periodic probabilistic entity factory.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Spawner {
    pub template: SpawnTemplate,
    /// Ticks consumed per spawn attempt.
    pub spawn_rate: u64,
    pub last_spawn_tick: u64,
    /// Percent chance per attempt before population damping.
    pub spawn_chance: u32,
}

// ============================================================================
// COMPOSITION
// ============================================================================

/// Back-reference from a satellite to the composite that owns it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: Entity,
}

/// Satellites owned by a composite. Removing the composite removes them.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeLink {
    pub children: Vec<Entity>,
}

// ============================================================================
// PROJECTILES
// ============================================================================

/// Unit direction of a projectile fired this turn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
}

impl Velocity {
    /// Unit vector pointing from `from` to `to`, or `None` if they coincide.
    pub fn towards(from: &Position, to: &Position) -> Option<Self> {
        let dx = f64::from(to.x - from.x);
        let dy = f64::from(to.y - from.y);
        let mag = (dx * dx + dy * dy).sqrt();
        if mag < f64::EPSILON {
            None
        } else {
            Some(Self {
                dx: dx / mag,
                dy: dy / mag,
            })
        }
    }
}

/// The cell a projectile was deliberately aimed at.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aimed {
    pub target: Position,
}

// ============================================================================
// END CONDITIONS
// ============================================================================

/// Marker for entities whose condition ends the game.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct EndGame;

/// Predicate kinds a `Conditional` can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Satisfied when the owner is within `range` of `specific_entity`.
    Proximity {
        range: f64,
        specific_entity: Option<Entity>,
    },
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Conditional {
    pub condition: Condition,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Floor tile.
#[derive(Bundle)]
pub struct FloorBundle {
    pub position: Position,
    pub renderable: Renderable,
    pub physical: Physical,
}

impl FloorBundle {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            position: Position::new(x, y, FLOOR_LAYER),
            renderable: Renderable::new("floor", 0),
            physical: Physical::new(Size::Fill, Dynamism::Static),
        }
    }
}

/// Wall tile.
#[derive(Bundle)]
pub struct WallBundle {
    pub position: Position,
    pub renderable: Renderable,
    pub physical: Physical,
}

impl WallBundle {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            position: Position::tile(x, y),
            renderable: Renderable::new("wall", 1),
            physical: Physical::new(Size::Fill, Dynamism::Static),
        }
    }
}

/// The player character.
#[derive(Bundle)]
pub struct PlayerBundle {
    pub player: Player,
    pub position: Position,
    pub renderable: Renderable,
    pub physical: Physical,
    pub sight: Sight,
    pub combat: Combat,
    pub health: Health,
    pub light: LightSource,
}

impl PlayerBundle {
    pub fn new(position: Position) -> Self {
        Self {
            player: Player,
            position,
            renderable: Renderable::new("player", 11),
            physical: Physical::new(Size::Medium, Dynamism::Dynamic),
            sight: Sight { range: 100 },
            combat: Combat::new(8, 5, 4),
            health: Health::new(100),
            light: LightSource {
                strength: LightStrength::High,
            },
        }
    }
}

/// A hostile computer-controlled actor.
#[derive(Bundle)]
pub struct EnemyBundle {
    pub position: Position,
    pub renderable: Renderable,
    pub health: Health,
    pub physical: Physical,
    pub combat: Combat,
    pub ai: AIControlled,
}

impl EnemyBundle {
    pub fn new(position: Position) -> Self {
        let template = SpawnTemplate::undead();
        Self {
            position,
            renderable: template.renderable,
            health: template.health,
            physical: template.physical,
            combat: template.combat,
            ai: AIControlled::new(0, 150),
        }
    }
}

impl SpawnTemplate {
    /// The stock shambling enemy.
    pub fn undead() -> Self {
        Self {
            renderable: Renderable::new("undead", 10),
            health: Health::new(10),
            physical: Physical::new(Size::Medium, Dynamism::Dynamic),
            combat: Combat::new(6, 4, 0),
        }
    }
}

/// Static lamp post.
#[derive(Bundle)]
pub struct LampBundle {
    pub position: Position,
    pub renderable: Renderable,
    pub light: LightSource,
    pub physical: Physical,
}

impl LampBundle {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            renderable: Renderable::new("lamp", 5),
            light: LightSource {
                strength: LightStrength::High,
            },
            physical: Physical::new(Size::Small, Dynamism::Static),
        }
    }
}

/// Destructible nest that periodically produces enemies.
#[derive(Bundle)]
pub struct SpawnerBundle {
    pub position: Position,
    pub renderable: Renderable,
    pub health: Health,
    pub physical: Physical,
    pub destructible: Destructible,
    pub spawner: Spawner,
}

impl SpawnerBundle {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            renderable: Renderable::new("nest", 2),
            health: Health::new(20),
            physical: Physical::new(Size::Large, Dynamism::Static),
            destructible: Destructible,
            spawner: Spawner {
                template: SpawnTemplate::undead(),
                spawn_rate: 100,
                last_spawn_tick: 0,
                spawn_chance: 7,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_positions_are_value_keys() {
        let mut seen = HashMap::new();
        seen.insert(Position::new(3, 4, 0), "a");
        // A separately constructed but equal position finds the same slot.
        assert_eq!(seen.get(&Position::new(3, 4, 0)), Some(&"a"));
        assert_eq!(seen.get(&Position::new(3, 4, -1)), None);
        assert_eq!(Position::new(3, 4, 0).key(), (3, 4, 0));
    }

    #[test]
    fn test_neighbours_are_the_ring() {
        let centre = Position::tile(5, 5);
        let ring: HashSet<_> = centre.neighbours().into_iter().collect();
        assert_eq!(ring.len(), 8);
        assert!(!ring.contains(&centre));
        assert!(ring.iter().all(|p| (p.x - 5).abs() <= 1 && (p.y - 5).abs() <= 1 && p.z == 0));
    }

    #[test]
    fn test_size_ordering() {
        assert!(Size::Small < Size::Medium);
        assert!(Size::Medium < Size::Large);
        assert!(Size::Large < Size::Fill);
    }

    #[test]
    fn test_health_zero_is_alive() {
        let mut health = Health::new(5);
        health.damage(5);
        assert!(!health.is_dead());
        health.damage(1);
        assert!(health.is_dead());
    }

    #[test]
    fn test_velocity_towards() {
        let v = Velocity::towards(&Position::tile(0, 0), &Position::tile(3, 4)).unwrap();
        assert!((v.dx - 0.6).abs() < 1e-9);
        assert!((v.dy - 0.8).abs() < 1e-9);
        assert!(Velocity::towards(&Position::tile(1, 1), &Position::tile(1, 1)).is_none());
    }

    #[test]
    fn test_action_points() {
        let ai = AIControlled::new(100, 150);
        assert!(!ai.can_act(200));
        assert!(ai.can_act(250));
        assert_eq!(ai.action_points(50), 0);
    }
}
