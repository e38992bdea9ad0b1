//! The wall: live tiles plus the dead-end reserve.
//!
//! Normal draws take from the live wall and never touch the reserve. Kong
//! and bonus replacements take from the dead end, falling back to the live
//! wall once the reserve is gone. An empty live wall ends the hand.
//!
//! Every shuffle records a SHA-256 digest of the resulting order so a
//! finished hand can be audited against its seed.

use crate::core::GameRng;
use super::tile::Tile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// No tile left for the requested draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no tile left in the wall")]
pub struct WallEmpty;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    /// Drawn from the back.
    live: Vec<Tile>,
    dead: Vec<Tile>,
    total: usize,
    digest: String,
}

impl Wall {
    /// Generate and shuffle the full tile set.
    pub fn shuffled(rng: &mut GameRng, with_bonus: bool, dead_size: usize) -> Self {
        let mut tiles = Tile::full_set(with_bonus);
        rng.shuffle(&mut tiles);
        Self::from_tiles(tiles, dead_size)
    }

    /// Build a wall in a fixed order: `tiles[0]` is drawn first and the
    /// last `dead_size` tiles form the dead end.
    pub fn from_tiles(mut tiles: Vec<Tile>, dead_size: usize) -> Self {
        let digest = digest_of(&tiles);
        let total = tiles.len();
        let dead = tiles.split_off(total.saturating_sub(dead_size));
        tiles.reverse();
        Self {
            live: tiles,
            dead,
            total,
            digest,
        }
    }

    /// Remove one tile from the live wall, or from the dead end.
    pub fn deal_to(&mut self, dead_end: bool) -> Result<Tile, WallEmpty> {
        if dead_end {
            if let Some(tile) = self.dead.pop() {
                return Ok(tile);
            }
        }
        self.live.pop().ok_or(WallEmpty)
    }

    #[must_use]
    pub fn remaining_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn dead_count(&self) -> usize {
        self.dead.len()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.live.is_empty()
    }

    /// Hex SHA-256 of the tile order at shuffle time.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Tiles still in the wall, live and dead.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.live.iter().chain(self.dead.iter()).copied()
    }
}

fn digest_of(tiles: &[Tile]) -> String {
    let mut hasher = Sha256::new();
    for tile in tiles {
        hasher.update(tile.exposed_name().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffled_counts() {
        let mut rng = GameRng::new(1);
        let wall = Wall::shuffled(&mut rng, true, 16);
        assert_eq!(wall.total_count(), 144);
        assert_eq!(wall.dead_count(), 16);
        assert_eq!(wall.remaining_count(), 128);
        assert_eq!(wall.digest().len(), 64);
    }

    #[test]
    fn test_seed_reproducible() {
        let a = Wall::shuffled(&mut GameRng::new(5), false, 16);
        let b = Wall::shuffled(&mut GameRng::new(5), false, 16);
        let c = Wall::shuffled(&mut GameRng::new(6), false, 16);
        assert_eq!(a, b);
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn test_draw_order() {
        let tiles = vec![Tile::bamboo(1), Tile::bamboo(2), Tile::bamboo(3), Tile::bamboo(4)];
        let mut wall = Wall::from_tiles(tiles, 1);
        assert_eq!(wall.deal_to(false), Ok(Tile::bamboo(1)));
        assert_eq!(wall.deal_to(true), Ok(Tile::bamboo(4)));
        assert_eq!(wall.deal_to(false), Ok(Tile::bamboo(2)));
    }

    #[test]
    fn test_normal_draw_never_uses_reserve() {
        let tiles = vec![Tile::bamboo(1), Tile::bamboo(2), Tile::bamboo(3)];
        let mut wall = Wall::from_tiles(tiles, 2);
        assert!(wall.deal_to(false).is_ok());
        assert_eq!(wall.deal_to(false), Err(WallEmpty));
        assert!(wall.is_exhausted());
        assert_eq!(wall.dead_count(), 2);
    }

    #[test]
    fn test_dead_end_falls_back_to_live() {
        let tiles = vec![Tile::bamboo(1), Tile::bamboo(2), Tile::bamboo(3)];
        let mut wall = Wall::from_tiles(tiles, 1);
        assert_eq!(wall.deal_to(true), Ok(Tile::bamboo(3)));
        assert_eq!(wall.deal_to(true), Ok(Tile::bamboo(1)));
        assert_eq!(wall.deal_to(true), Ok(Tile::bamboo(2)));
        assert_eq!(wall.deal_to(true), Err(WallEmpty));
    }
}
