//! Core table types: seats, players, game state, RNG, configuration.

pub mod player;
pub mod rng;
pub mod config;
pub mod state;

pub use player::{Player, Seat, SeatError, SeatMap, SEAT_COUNT};
pub use rng::GameRng;
pub use config::{ConfigError, TableConfig};
pub use state::{GameState, MoveRecord};
