//! Tile model: tiles, melds, hands and the wall.

pub mod tile;
pub mod meld;
pub mod hand;
pub mod wall;

pub use tile::{parse_tiles, Dragon, Suit, Tile, TileParseError, Wind};
pub use meld::{KongOrigin, Meld, MeldError, MeldKind};
pub use hand::{Hand, HandError, TileSource};
pub use wall::{Wall, WallEmpty};
