//! Error types for the simulation core.
//!
//! Only content and configuration problems are errors. Ordinary gameplay
//! failures (a blocked move, a missed swing, a spawner with no room) are
//! silent no-ops inside the systems and never surface here.

use thiserror::Error;

/// Fatal problems raised to the caller of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Content or tuning data the simulation cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Something an operation depends on is absent from the world.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),
}

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingPrerequisite(msg.into())
    }
}
