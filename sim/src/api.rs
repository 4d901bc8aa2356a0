//! Public API for the simulation.
//!
//! This module provides the main interface for a presentation layer (or any
//! other client) to interact with the simulation.
//!
//! ## Turns
//!
//! Nothing happens between intents. Each submitted [`Intent`] is interpreted
//! by the current [`InputMode`] and triggers zero, one or two full pipeline
//! passes: resting lets one pass run, while stepping or firing runs a player
//! pass and then an NPC pass. Passes stop early once the game is over.

use crate::components::*;
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::intent::{is_targetable, sight_line, Action, InputMode, Intent, TargetingPreview};
use crate::level::{build_level, LevelHandles, LevelLayout};
use crate::signals::*;
use crate::spatial::SpatialIndex;
use crate::systems::turn_schedule;
use crate::world::{sorted_renderables, wall_clock_tick, Snapshot};
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// Outcome of one submitted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// Pipeline passes actually run.
    pub passes: u32,
    pub game_over: bool,
    pub player_alive: bool,
}

/// Insert every resource the pipeline reads.
pub fn init_resources(world: &mut World, config: SimConfig) {
    world.insert_resource(SimRng::seeded(config.seed));
    world.insert_resource(config);
    world.insert_resource(SpatialIndex::new());
    world.insert_resource(MoveIntents::default());
    world.insert_resource(PendingTime::default());
    world.insert_resource(MoveResults::default());
    world.insert_resource(SimEvents::default());
    world.insert_resource(PipelineFault::default());
    world.insert_resource(GameStatus::default());
}

/// The main simulation world container.
///
/// Holds the ECS world and the pipeline schedule, providing a clean API for:
/// - Building a level from generator output
/// - Submitting player intents
/// - Extracting state snapshots and presentation events
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    mode: InputMode,
    player: Option<Entity>,
    passes: u64,
}

impl SimWorld {
    /// Create a new empty simulation world.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a new simulation world with custom configuration.
    pub fn with_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a world and populate it from `layout`.
    pub fn from_layout(layout: &LevelLayout, config: SimConfig) -> SimResult<Self> {
        let mut sim = Self::with_config(config)?;
        sim.load_level(layout)?;
        Ok(sim)
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();
        init_resources(&mut world, config);
        Self {
            world,
            schedule: turn_schedule(),
            mode: InputMode::default(),
            player: None,
            passes: 0,
        }
    }

    /// Populate the world from generator output. The new player takes over.
    pub fn load_level(&mut self, layout: &LevelLayout) -> SimResult<LevelHandles> {
        let handles = build_level(&mut self.world, layout)?;
        self.player = Some(handles.player);
        self.mode = InputMode::PlayerControl;
        Ok(handles)
    }

    /// Interpret one player intent and run the passes it calls for.
    ///
    /// Intents are ignored once the player is gone or the game is over.
    pub fn submit(&mut self, intent: Intent) -> SimResult<TurnReport> {
        let Some((player, player_pos)) = self.player_position() else {
            tracing::debug!(?intent, "no player, intent ignored");
            return Ok(self.report(0));
        };
        if self.is_game_over() {
            return Ok(self.report(0));
        }

        let filled = match (self.mode, intent) {
            (InputMode::ChooseTarget { .. }, Intent::ConfirmTarget) => self.fill_tiles(),
            _ => HashSet::new(),
        };
        let (mode, action) = self
            .mode
            .handle(intent, player_pos, |t| is_targetable(&player_pos, t, |p| filled.contains(p)));
        self.mode = mode;

        let turn_ticks = self.world.resource::<SimConfig>().turn_ticks;
        let passes = match action {
            Action::None => 0,
            Action::Rest => {
                self.world.resource_mut::<PendingTime>().push(turn_ticks);
                self.run_passes(1)?
            }
            Action::Step { target } => {
                self.world.resource_mut::<MoveIntents>().push(player, target);
                self.world.resource_mut::<PendingTime>().push(turn_ticks);
                self.run_passes(2)?
            }
            Action::Fire { target } => {
                let Some(velocity) = Velocity::towards(&player_pos, &target) else {
                    return Ok(self.report(0));
                };
                let projectile = self
                    .world
                    .spawn((
                        player_pos.on_layer(OCCUPANT_LAYER),
                        velocity,
                        Aimed { target },
                        Physical::new(Size::Small, Dynamism::Static),
                    ))
                    .id();
                self.world
                    .resource_mut::<SimEvents>()
                    .push(SimEvent::EntityCreated(projectile));
                self.world.resource_mut::<PendingTime>().push(turn_ticks);
                tracing::debug!(?projectile, target = %target, "projectile fired");
                self.run_passes(2)?
            }
        };

        Ok(self.report(passes))
    }

    /// Run up to `count` passes, stopping once the game is over.
    fn run_passes(&mut self, count: u32) -> SimResult<u32> {
        let mut ran = 0;
        for _ in 0..count {
            if self.is_game_over() {
                break;
            }
            self.run_pass()?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Run every system once, in pipeline order.
    pub fn run_pass(&mut self) -> SimResult<()> {
        self.schedule.run(&mut self.world);
        self.passes += 1;
        match self.world.resource_mut::<PipelineFault>().take() {
            Some(err) => {
                tracing::warn!(error = %err, pass = self.passes, "pipeline fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn report(&self, passes: u32) -> TurnReport {
        TurnReport {
            passes,
            game_over: self.is_game_over(),
            player_alive: self.player_position().is_some(),
        }
    }

    fn player_position(&self) -> Option<(Entity, Position)> {
        let player = self.player?;
        let pos = self.world.get::<Position>(player)?;
        Some((player, *pos))
    }

    /// Occupant-layer tiles holding something that fills them.
    fn fill_tiles(&mut self) -> HashSet<Position> {
        let mut query = self.world.query::<(&Position, &Physical)>();
        query
            .iter(&self.world)
            .filter(|(p, phys)| p.z == OCCUPANT_LAYER && phys.is_fill())
            .map(|(p, _)| *p)
            .collect()
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        let game_over = self.is_game_over();
        Snapshot::from_world(&mut self.world, self.player, self.mode, self.passes, game_over)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Take every presentation event raised since the last call.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<SimEvents>().drain()
    }

    /// Positioned drawables in ascending z-order.
    pub fn renderables(&mut self) -> Vec<(Entity, Position, Renderable)> {
        sorted_renderables(&mut self.world)
    }

    /// What the player currently knows, for visibility tinting.
    pub fn player_knowledge(&self) -> Option<&Knowledge> {
        self.world.get::<Knowledge>(self.player?)
    }

    /// Light arriving on the tile under `pos`, if any.
    pub fn light_at(&mut self, pos: &Position) -> Option<Rgb> {
        let mut query = self.world.query::<(&Position, &LightLevel)>();
        query
            .iter(&self.world)
            .find(|(p, _)| p.x == pos.x && p.y == pos.y)
            .map(|(_, level)| level.color)
    }

    /// Cursor, sight line and validity while choosing a target.
    pub fn targeting_preview(&mut self) -> Option<TargetingPreview> {
        let InputMode::ChooseTarget { target } = self.mode else {
            return None;
        };
        let (_, from) = self.player_position()?;
        let filled = self.fill_tiles();
        let path = sight_line(&from, &target).into_iter().skip(1).collect();
        Some(TargetingPreview {
            cursor: target,
            path,
            valid: is_targetable(&from, &target, |p| filled.contains(p)),
        })
    }

    /// Get the current wall clock tick.
    pub fn current_tick(&self) -> u64 {
        wall_clock_tick(&self.world)
    }

    /// Pipeline passes run since creation.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_game_over(&self) -> bool {
        self.world.resource::<GameStatus>().over
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
