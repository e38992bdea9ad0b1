//! Recording finished hands.
//!
//! The table reserves a game id once and records every finished hand
//! before dealing the next one. Recording is idempotent: the same record
//! stored twice counts once, while a different record for an already
//! stored hand is refused.

use std::sync::atomic::{AtomicU64, AtomicU32, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{Seat, SeatMap};
use crate::rules::RulesetHash;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "game {}", self.0)
    }
}

/// Everything needed to audit and replay one hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRecord {
    pub game: GameId,
    pub hand: u32,
    pub ruleset: RulesetHash,
    pub seed: u64,
    pub wall_digest: String,
    pub winner: Option<Seat>,
    pub scores: SeatMap<i64>,
    pub payments: SeatMap<i64>,
    /// Balances after the payments.
    pub balances: SeatMap<i64>,
    pub move_count: usize,
}

/// Result of a successful `record_hand`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Stored,
    AlreadyStored,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("{game} hand {hand} is already stored with different content")]
    Conflict { game: GameId, hand: u32 },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Whether trying again may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, PersistenceError::Unavailable(_))
    }
}

/// Storage for games and hands.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn reserve_game_id(&self) -> Result<GameId, PersistenceError>;

    async fn record_hand(&self, record: HandRecord) -> Result<Ack, PersistenceError>;
}

/// Keeps everything in memory.
///
/// `with_failures(n)` makes the first `n` writes fail as unavailable.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    next_id: AtomicU64,
    failures_left: AtomicU32,
    hands: Mutex<FxHashMap<(GameId, u32), HandRecord>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_failures(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    /// Stored hands of a game, by hand number.
    pub async fn records(&self, game: GameId) -> Vec<HandRecord> {
        let hands = self.hands.lock().await;
        let mut records: Vec<HandRecord> = hands.values().filter(|r| r.game == game).cloned().collect();
        records.sort_by_key(|r| r.hand);
        records
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn reserve_game_id(&self) -> Result<GameId, PersistenceError> {
        Ok(GameId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn record_hand(&self, record: HandRecord) -> Result<Ack, PersistenceError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PersistenceError::Unavailable("injected failure".into()));
        }

        let mut hands = self.hands.lock().await;
        let key = (record.game, record.hand);
        match hands.get(&key) {
            Some(existing) if *existing == record => Ok(Ack::AlreadyStored),
            Some(_) => Err(PersistenceError::Conflict {
                game: record.game,
                hand: record.hand,
            }),
            None => {
                debug!(game = %record.game, hand = record.hand, "hand recorded");
                hands.insert(key, record);
                Ok(Ack::Stored)
            }
        }
    }
}
