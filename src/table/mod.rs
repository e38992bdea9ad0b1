//! One table from creation to game over.
//!
//! - `coordinator`: the per-table state machine
//! - `scoring`: payments, rotation and claim-time manual rules
//! - `persistence`: recording finished hands
//! - `registry`: the open tables of a server

pub mod coordinator;
pub mod scoring;
pub mod persistence;
pub mod registry;

pub use coordinator::{GameSummary, HandOutcome, SeatSetup, TableCoordinator, TableError, TablePhase};
pub use scoring::{manual_rules, payments, should_rotate, WinCircumstances};
pub use persistence::{Ack, GameId, HandRecord, InMemoryPersistence, Persistence, PersistenceError};
pub use registry::{RegistryError, TableId, TableInfo, TableRegistry};
