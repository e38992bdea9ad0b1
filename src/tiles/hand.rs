//! A player's hand: concealed tiles, fixed melds and bonus tiles.
//!
//! Live tiles satisfy `concealed + 3 × melds = 13`, or 14 between drawing
//! or claiming a tile and discarding one. Kongs count as three.

use super::meld::{KongOrigin, Meld, MeldError, MeldKind};
use super::tile::Tile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the most recent tile came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileSource {
    Wall,
    DeadWall,
    Discard,
    RobbedKong,
}

impl TileSource {
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            TileSource::Wall => 'w',
            TileSource::DeadWall => 'd',
            TileSource::Discard => 'z',
            TileSource::RobbedKong => 'k',
        }
    }

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'w' => Some(TileSource::Wall),
            'd' => Some(TileSource::DeadWall),
            'z' => Some(TileSource::Discard),
            'k' => Some(TileSource::RobbedKong),
            _ => None,
        }
    }

    /// Drawn by the player rather than taken from another player.
    #[must_use]
    pub const fn is_self_drawn(self) -> bool {
        matches!(self, TileSource::Wall | TileSource::DeadWall)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HandError {
    #[error("concealed tiles do not contain {0}")]
    MissingTiles(String),

    #[error("claimed tile {tile} is not part of {meld}")]
    ClaimedTileNotInMeld { tile: Tile, meld: String },

    #[error("a {0} cannot be claimed")]
    NotClaimable(MeldKind),

    #[error("neither four concealed {0} nor an exposed pung of {0} plus one")]
    NoKong(Tile),

    #[error(transparent)]
    Meld(#[from] MeldError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    concealed: Vec<Tile>,
    melds: Vec<Meld>,
    bonus: Vec<Tile>,
    last_tile: Option<Tile>,
    last_source: Option<TileSource>,
}

impl Hand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hand directly, e.g. for scoring a position.
    #[must_use]
    pub fn from_parts(mut concealed: Vec<Tile>, melds: Vec<Meld>, bonus: Vec<Tile>) -> Self {
        concealed.sort_unstable();
        Self {
            concealed,
            melds,
            bonus,
            last_tile: None,
            last_source: None,
        }
    }

    #[must_use]
    pub fn concealed(&self) -> &[Tile] {
        &self.concealed
    }

    #[must_use]
    pub fn melds(&self) -> &[Meld] {
        &self.melds
    }

    #[must_use]
    pub fn bonus(&self) -> &[Tile] {
        &self.bonus
    }

    #[must_use]
    pub fn last_tile(&self) -> Option<Tile> {
        self.last_tile
    }

    #[must_use]
    pub fn last_source(&self) -> Option<TileSource> {
        self.last_source
    }

    pub fn set_last(&mut self, tile: Tile, source: TileSource) {
        self.last_tile = Some(tile);
        self.last_source = Some(source);
    }

    /// `concealed + 3 × melds`.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.concealed.len() + 3 * self.melds.len()
    }

    /// Every physical tile held, bonus tiles and kong fourths included.
    pub fn all_tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.concealed
            .iter()
            .copied()
            .chain(self.melds.iter().flat_map(|m| m.tiles().iter().copied()))
            .chain(self.bonus.iter().copied())
    }

    /// Take a tile into the hand. Bonus tiles go aside.
    pub fn add(&mut self, tile: Tile, source: TileSource) {
        if tile.is_bonus() {
            self.bonus.push(tile);
            self.bonus.sort_unstable();
            return;
        }
        let at = self.concealed.partition_point(|t| *t <= tile);
        self.concealed.insert(at, tile);
        self.set_last(tile, source);
    }

    /// Whether `tiles` (as a multiset) are all concealed in this hand.
    #[must_use]
    pub fn has_concealed(&self, tiles: &[Tile]) -> bool {
        let mut pool = self.concealed.clone();
        tiles.iter().all(|tile| match pool.iter().position(|t| t == tile) {
            Some(i) => {
                pool.swap_remove(i);
                true
            }
            None => false,
        })
    }

    #[must_use]
    pub fn count_concealed(&self, tile: Tile) -> usize {
        self.concealed.iter().filter(|t| **t == tile).count()
    }

    fn take_concealed(&mut self, tiles: &[Tile]) -> Result<(), HandError> {
        if !self.has_concealed(tiles) {
            return Err(HandError::MissingTiles(
                tiles.iter().map(|t| t.exposed_name()).collect(),
            ));
        }
        for tile in tiles {
            if let Some(i) = self.concealed.iter().position(|t| t == tile) {
                self.concealed.remove(i);
            }
        }
        Ok(())
    }

    /// Discard one concealed tile.
    pub fn discard(&mut self, tile: Tile) -> Result<(), HandError> {
        self.take_concealed(&[tile])
    }

    /// Expose a meld completed by a claimed discard.
    ///
    /// `meld_tiles` includes `claimed`; the other tiles must be concealed.
    pub fn claim_meld(&mut self, claimed: Tile, meld_tiles: &[Tile]) -> Result<Meld, HandError> {
        let meld = Meld::from_tiles(meld_tiles, false)?;
        if !meld.contains(claimed) {
            return Err(HandError::ClaimedTileNotInMeld {
                tile: claimed,
                meld: meld.to_string(),
            });
        }
        if meld.kind() == MeldKind::Pair {
            return Err(HandError::NotClaimable(MeldKind::Pair));
        }
        let mut own: Vec<Tile> = meld_tiles.to_vec();
        if let Some(i) = own.iter().position(|t| *t == claimed) {
            own.remove(i);
        }
        self.take_concealed(&own)?;
        self.melds.push(meld.clone());
        self.set_last(claimed, TileSource::Discard);
        Ok(meld)
    }

    /// Declare a kong of `tile`: four concealed, or an exposed pung plus one.
    pub fn declare_kong(&mut self, tile: Tile) -> Result<Meld, HandError> {
        if self.count_concealed(tile) >= 4 {
            self.take_concealed(&[tile; 4])?;
            let kong = Meld::kong(tile, KongOrigin::Concealed);
            self.melds.push(kong.clone());
            return Ok(kong);
        }
        let pung = self
            .melds
            .iter()
            .position(|m| m.kind() == MeldKind::Pung && !m.is_concealed() && m.first() == tile);
        match pung {
            Some(i) if self.count_concealed(tile) >= 1 => {
                self.take_concealed(&[tile])?;
                let kong = Meld::kong(tile, KongOrigin::ExtendedPung);
                self.melds[i] = kong.clone();
                Ok(kong)
            }
            _ => Err(HandError::NoKong(tile)),
        }
    }

    /// Undo an extended kong whose fourth tile was robbed.
    pub fn surrender_robbed_tile(&mut self, tile: Tile) -> bool {
        let kong = self.melds.iter().position(|m| {
            m.kind() == MeldKind::Kong && m.kong_origin() == Some(KongOrigin::ExtendedPung) && m.first() == tile
        });
        match kong {
            Some(i) => {
                self.melds[i] = Meld::pung(tile, false);
                true
            }
            None => false,
        }
    }

    /// Tiles of which four are concealed or that extend an exposed pung.
    #[must_use]
    pub fn kong_candidates(&self) -> Vec<Tile> {
        let mut candidates: Vec<Tile> = self
            .concealed
            .iter()
            .copied()
            .filter(|t| self.count_concealed(*t) == 4)
            .chain(
                self.melds
                    .iter()
                    .filter(|m| m.kind() == MeldKind::Pung && !m.is_concealed())
                    .map(Meld::first)
                    .filter(|t| self.concealed.contains(t)),
            )
            .collect();
        candidates.dedup();
        candidates
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for meld in &self.melds {
            write!(f, "{meld} ")?;
        }
        for tile in &self.concealed {
            write!(f, "{}", tile.concealed_name())?;
        }
        for tile in &self.bonus {
            write!(f, " {tile}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{parse_tiles, Wind};

    fn hand(text: &str) -> Hand {
        Hand::from_parts(parse_tiles(text).unwrap(), Vec::new(), Vec::new())
    }

    #[test]
    fn test_add_bonus_goes_aside() {
        let mut h = hand("b1b2b3");
        h.add(Tile::flower(Wind::East), TileSource::Wall);
        assert_eq!(h.concealed().len(), 3);
        assert_eq!(h.bonus(), &[Tile::flower(Wind::East)]);
        assert_eq!(h.last_tile(), None);

        h.add(Tile::circle(1), TileSource::Wall);
        assert_eq!(h.concealed()[3], Tile::circle(1));
        assert_eq!(h.last_tile(), Some(Tile::circle(1)));
        assert_eq!(h.all_tiles().count(), 5);
    }

    #[test]
    fn test_claim_pung() {
        let mut h = hand("s5s5c1c2c3");
        let meld = h.claim_meld(Tile::circle(5), &[Tile::circle(5); 3]).unwrap();
        assert_eq!(meld.kind(), MeldKind::Pung);
        assert!(!meld.is_concealed());
        assert_eq!(h.concealed().len(), 3);
        assert_eq!(h.last_source(), Some(TileSource::Discard));
        assert_eq!(h.live_count(), 6);
    }

    #[test]
    fn test_claim_requires_claimed_tile_in_meld() {
        let mut h = hand("s5s5s5");
        let err = h.claim_meld(Tile::circle(6), &[Tile::circle(5); 3]).unwrap_err();
        assert!(matches!(err, HandError::ClaimedTileNotInMeld { .. }));
    }

    #[test]
    fn test_claim_requires_concealed_backing() {
        let mut h = hand("s5c1c1");
        let err = h.claim_meld(Tile::circle(5), &[Tile::circle(5); 3]).unwrap_err();
        assert!(matches!(err, HandError::MissingTiles(_)));
        // Nothing was removed
        assert_eq!(h.concealed().len(), 3);
    }

    #[test]
    fn test_declare_concealed_kong() {
        let mut h = hand("b9b9b9b9c1");
        assert_eq!(h.kong_candidates(), vec![Tile::bamboo(9)]);
        let kong = h.declare_kong(Tile::bamboo(9)).unwrap();
        assert_eq!(kong.kong_origin(), Some(KongOrigin::Concealed));
        assert!(kong.is_concealed());
        assert_eq!(h.concealed(), &[Tile::character(1)]);
    }

    #[test]
    fn test_extend_pung_and_rob() {
        let mut h = Hand::from_parts(
            parse_tiles("b9c1").unwrap(),
            vec![Meld::pung(Tile::bamboo(9), false)],
            Vec::new(),
        );
        let kong = h.declare_kong(Tile::bamboo(9)).unwrap();
        assert_eq!(kong.kong_origin(), Some(KongOrigin::ExtendedPung));
        assert_eq!(h.all_tiles().count(), 5);

        assert!(h.surrender_robbed_tile(Tile::bamboo(9)));
        assert_eq!(h.melds()[0].kind(), MeldKind::Pung);
        assert_eq!(h.all_tiles().count(), 4);
    }

    #[test]
    fn test_invalid_kong() {
        let mut h = hand("b9b9b9c1");
        assert_eq!(h.declare_kong(Tile::bamboo(9)), Err(HandError::NoKong(Tile::bamboo(9))));
    }

    #[test]
    fn test_discard_missing_tile() {
        let mut h = hand("b1");
        assert!(h.discard(Tile::bamboo(2)).is_err());
        assert!(h.discard(Tile::bamboo(1)).is_ok());
        assert!(h.concealed().is_empty());
    }
}
