//! Dread Halls - Simulation Core
//!
//! A deterministic, turn-based ECS simulation of a dungeon crawl: lighting,
//! field of view, melee, ranged shots, spawning nests and the exit portal.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod intent;
pub mod level;
pub mod line;
pub mod shadowcast;
pub mod signals;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::{SimWorld, TurnReport};
pub use components::*;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use intent::{Direction, InputMode, Intent, TargetingPreview};
pub use level::{build_level, Cell, LevelHandles, LevelLayout, Room};
pub use signals::{MoveAnimation, SimEvent};
pub use spatial::SpatialIndex;
pub use systems::*;
pub use world::Snapshot;
