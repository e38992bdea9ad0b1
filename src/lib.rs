//! # mahjong-table
//!
//! Table server core for four-seat Mah Jongg: turn and claim coordination
//! between asynchronous participants, and rule-driven hand scoring.
//!
//! ## Design Principles
//!
//! 1. **Rules Are Data**: Scoring rules are tagged predicate trees grouped
//!    into a [`Ruleset`], identified by a content hash. Nothing in the
//!    engine knows a specific rule.
//!
//! 2. **One Owner Per Table**: The [`TableCoordinator`] exclusively owns the
//!    wall and game state of its table. Seats only see messages.
//!
//! 3. **Every Wait Is Bounded**: Answers are collected concurrently and
//!    every slot falls back to a default when the claim timeout expires.
//!
//! 4. **Reproducible**: A game is fully determined by its seed, ruleset and
//!    seating. Each wall records a SHA-256 digest of its shuffle.
//!
//! ## Modules
//!
//! - `core`: Seats, players, game state, RNG, configuration
//! - `tiles`: Tiles, melds, hands and the wall
//! - `rules`: Patterns, rulesets, hand encoding and the rule engine
//! - `rulesets`: Predefined rulesets
//! - `protocol`: Messages, transports, answer collection, claim arbitration
//! - `table`: Coordinator, scoring, persistence and the table registry

pub mod core;
pub mod tiles;
pub mod rules;
pub mod rulesets;
pub mod protocol;
pub mod table;

// Re-export commonly used types
pub use crate::core::{GameRng, GameState, Player, Seat, SeatMap, TableConfig};

pub use crate::tiles::{Hand, Meld, MeldKind, Tile, TileSource, Wall, WallEmpty, Wind};

pub use crate::rules::{
    EncodedHand, EvaluationContext, EvaluationResult, Rule, RuleEngine, RuleError, Ruleset, RulesetHash,
    RulesetRegistry,
};

pub use crate::protocol::{
    Aggregation, Answer, ClaimArbiter, ClaimKind, Message, ProtocolViolation, Remote, RobotRemote,
};

pub use crate::table::{
    HandOutcome, InMemoryPersistence, Persistence, SeatSetup, TableCoordinator, TableError, TablePhase,
    TableRegistry,
};
