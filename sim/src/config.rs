//! Simulation tuning.
//!
//! `SimConfig` lives in the world as a resource so every system reads the same
//! numbers. Defaults reproduce the stock game balance.

use crate::error::{SimError, SimResult};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for simulation rules and balance.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the shared random number generator.
    pub seed: u64,
    /// Ticks added to every clock per player turn.
    pub turn_ticks: u64,
    /// Duration handed to the presentation layer for step animations.
    pub move_animation_ms: u32,
    /// Radius of light propagation in tiles.
    pub light_range: u32,
    /// Number of emission passes (1 = direct light only).
    pub light_passes: u32,
    /// Fraction of received light a lit tile re-emits on bounce passes.
    pub light_reflectivity: f64,
    /// Minimum summed channel intensity for a tile to re-emit.
    pub light_emission_threshold: u32,
    /// Percent chance an AI not adjacent to the player wanders randomly.
    pub ai_random_move_chance: u32,
    /// Action cost given to AIs created by spawners.
    pub spawned_ai_action_cost: u64,
    /// Maximum tiles a projectile travels.
    pub projectile_range: u32,
    /// Percent chance a projectile strikes a target in its path.
    pub projectile_base_chance: u32,
    /// Extra percent when the target cell was explicitly aimed at.
    pub projectile_aim_bonus: u32,
    /// Flat damage dealt by a projectile hit.
    pub projectile_damage: i32,
    /// Live AI count divided by this is subtracted from spawn chance.
    pub spawner_population_divisor: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            turn_ticks: 100,
            move_animation_ms: 70,
            light_range: 4,
            light_passes: 2,
            light_reflectivity: 0.0,
            light_emission_threshold: 100,
            ai_random_move_chance: 25,
            spawned_ai_action_cost: 150,
            projectile_range: 20,
            projectile_base_chance: 25,
            projectile_aim_bonus: 50,
            projectile_damage: 5,
            spawner_population_divisor: 3,
        }
    }
}

impl SimConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SimError::invalid(format!("config is not valid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the systems cannot work with.
    pub fn validate(&self) -> SimResult<()> {
        if self.turn_ticks == 0 {
            return Err(SimError::invalid("turn_ticks must be positive"));
        }
        if self.light_range == 0 {
            return Err(SimError::invalid("light_range must be positive"));
        }
        if self.light_passes == 0 {
            return Err(SimError::invalid("light_passes must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.light_reflectivity) {
            return Err(SimError::invalid(format!(
                "light_reflectivity {} outside 0..=1",
                self.light_reflectivity
            )));
        }
        if self.projectile_range == 0 {
            return Err(SimError::invalid("projectile_range must be positive"));
        }
        if self.spawner_population_divisor == 0 {
            return Err(SimError::invalid("spawner_population_divisor must be positive"));
        }
        for (name, pct) in [
            ("ai_random_move_chance", self.ai_random_move_chance),
            ("projectile_base_chance", self.projectile_base_chance),
            ("projectile_aim_bonus", self.projectile_aim_bonus),
        ] {
            if pct > 100 {
                return Err(SimError::invalid(format!("{name} is a percentage, got {pct}")));
            }
        }
        Ok(())
    }
}
