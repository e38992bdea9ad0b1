//! Table configuration.
//!
//! A table is configured once at creation:
//! - `seed`: binds the game to one shuffle sequence
//! - `claim_timeout`: upper bound on every wait for an answer
//! - `round_limit`: rounds (prevailing winds) played before the game ends
//! - `with_bonus_tiles`: 144-tile set with flowers and seasons
//! - `dead_wall_size`: tiles reserved for kong and bonus replacements
//! - `persist_retries`: attempts to record a finished hand
//!
//! Invalid values are rejected by [`TableConfig::validate`] before a table
//! starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Rejected configuration value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("claim timeout must be positive")]
    ZeroClaimTimeout,

    #[error("round limit must be between 1 and 4, got {0}")]
    RoundLimit(u8),

    #[error("dead wall size {0} must be even and at most 32")]
    DeadWallSize(usize),

    #[error("persistence needs at least one attempt")]
    NoPersistAttempts,
}

/// Complete table configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub seed: u64,

    /// How long any participant may take to answer.
    pub claim_timeout: Duration,

    pub round_limit: u8,

    pub with_bonus_tiles: bool,

    pub dead_wall_size: usize,

    pub persist_retries: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            claim_timeout: Duration::from_secs(10),
            round_limit: 4,
            with_bonus_tiles: true,
            dead_wall_size: 16,
            persist_retries: 3,
        }
    }
}

impl TableConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_round_limit(mut self, rounds: u8) -> Self {
        self.round_limit = rounds;
        self
    }

    /// Play with the 136-tile set.
    #[must_use]
    pub fn without_bonus_tiles(mut self) -> Self {
        self.with_bonus_tiles = false;
        self
    }

    #[must_use]
    pub fn with_dead_wall_size(mut self, size: usize) -> Self {
        self.dead_wall_size = size;
        self
    }

    #[must_use]
    pub fn with_persist_retries(mut self, retries: u32) -> Self {
        self.persist_retries = retries;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.claim_timeout.is_zero() {
            return Err(ConfigError::ZeroClaimTimeout);
        }
        if !(1..=4).contains(&self.round_limit) {
            return Err(ConfigError::RoundLimit(self.round_limit));
        }
        if self.dead_wall_size % 2 != 0 || self.dead_wall_size > 32 {
            return Err(ConfigError::DeadWallSize(self.dead_wall_size));
        }
        if self.persist_retries == 0 {
            return Err(ConfigError::NoPersistAttempts);
        }
        Ok(())
    }
}
