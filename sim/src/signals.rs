//! Per-pass mailboxes and the outbound event log.
//!
//! Producers enqueue into these resources and the designated consumer
//! drains them within the same pipeline pass, so nothing is reprocessed on
//! the next pass:
//!
//! - `MoveIntents`: intent API / AI controller -> combat, dismantle, movement
//! - `PendingTime`: intent API -> time flow
//! - `MoveResults`: movement -> move-result handler
//! - `SimEvents`: any system -> presentation layer (drained by the caller)

use crate::components::Position;
use crate::error::SimError;
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A request for `entity` to step onto `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveIntent {
    pub entity: Entity,
    pub target: Position,
}

/// Pending move intents, at most one per entity.
#[derive(Resource, Debug, Default)]
pub struct MoveIntents {
    intents: Vec<MoveIntent>,
}

impl MoveIntents {
    /// Queue an intent, replacing any earlier one for the same entity.
    pub fn push(&mut self, entity: Entity, target: Position) {
        if let Some(existing) = self.intents.iter_mut().find(|i| i.entity == entity) {
            existing.target = target;
        } else {
            self.intents.push(MoveIntent { entity, target });
        }
    }

    pub fn target_of(&self, entity: Entity) -> Option<Position> {
        self.intents
            .iter()
            .find(|i| i.entity == entity)
            .map(|i| i.target)
    }

    /// Intents in submission order.
    pub fn snapshot(&self) -> Vec<MoveIntent> {
        self.intents.clone()
    }

    /// Remove the intent for `entity`.
    pub fn consume(&mut self, entity: Entity) {
        self.intents.retain(|i| i.entity != entity);
    }

    pub fn drain(&mut self) -> Vec<MoveIntent> {
        std::mem::take(&mut self.intents)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

/// Tick increments waiting for the time flow system.
#[derive(Resource, Debug, Default)]
pub struct PendingTime {
    increments: Vec<u64>,
}

impl PendingTime {
    pub fn push(&mut self, ticks: u64) {
        self.increments.push(ticks);
    }

    pub fn drain(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.increments)
    }

    pub fn is_empty(&self) -> bool {
        self.increments.is_empty()
    }
}

/// A completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    pub entity: Entity,
    pub source: Position,
    pub destination: Position,
}

#[derive(Resource, Debug, Default)]
pub struct MoveResults {
    results: Vec<MoveResult>,
}

impl MoveResults {
    pub fn push(&mut self, result: MoveResult) {
        self.results.push(result);
    }

    pub fn drain(&mut self) -> Vec<MoveResult> {
        std::mem::take(&mut self.results)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Transient movement playback request.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnimation {
    /// The moving entity; `None` for effects with no backing entity.
    pub entity: Option<Entity>,
    pub source: Position,
    pub destination: Position,
    pub duration_ms: u32,
    pub image: String,
    /// Hide the entity's resting sprite while the animation plays.
    pub hide_existing: bool,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    EntityCreated(Entity),
    EntityRemoved(Entity),
    MoveAnimation(MoveAnimation),
    GameOver,
}

/// Outbound event log, drained by whoever drives the simulation.
#[derive(Resource, Debug, Default)]
pub struct SimEvents {
    events: Vec<SimEvent>,
}

impl SimEvents {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// First fatal error raised inside a pipeline pass.
#[derive(Resource, Debug, Default)]
pub struct PipelineFault(pub Option<SimError>);

impl PipelineFault {
    /// Record `err` unless an earlier fault is already pending.
    pub fn raise(&mut self, err: SimError) {
        if self.0.is_none() {
            tracing::warn!(error = %err, "pipeline fault");
            self.0 = Some(err);
        }
    }

    pub fn take(&mut self) -> Option<SimError> {
        self.0.take()
    }
}

/// Set once the game-over notification has fired.
#[derive(Resource, Debug, Default)]
pub struct GameStatus {
    pub over: bool,
}

/// Shared deterministic random source.
#[derive(Resource, Debug)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::seeded(42)
    }
}
